//! End-to-end tests for the build/push/deploy commands over scripted
//! process and HTTP collaborators.

mod common;

use std::path::Path;
use std::sync::Arc;

use common::{ok_output, response, FakeFetcher, FakeRunner};
use shipyard_core::commands::{self, PipelineContext};
use tempfile::TempDir;

const UNKNOWN_BODY: &str = r#"{"errors":[{"code":"MANIFEST_UNKNOWN","message":"manifest unknown"}]}"#;
const PUBLISHED_BODY: &str = r#"{"schemaVersion":1,"fsLayers":[{"blobSum":"sha256:aa"}],"signatures":[{"protected":"eyJ"}]}"#;

fn write(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

/// Workspace with a single service `api` at revision `v1`, one root
/// container.
fn single_service_workspace() -> TempDir {
    let temp = TempDir::new().unwrap();
    write(&temp.path().join("api/service.yaml"), "name: api\n");
    write(&temp.path().join("api/Dockerfile"), "FROM scratch\n");
    temp
}

/// Runner scripted for the whole pipeline: git revisions, the local image
/// store, and docker/kubectl invocations.
fn pipeline_runner(local_image_id: &'static str) -> Arc<FakeRunner> {
    Arc::new(FakeRunner::new(move |spec| {
        let args = spec.transport_args();
        Ok(match (spec.program(), args.first().map(String::as_str)) {
            ("git", Some("rev-parse")) => ok_output("v1\n"),
            ("docker", Some("images")) => ok_output(local_image_id),
            ("./deployment", _) => ok_output("kind: Deployment\n"),
            ("kubectl", Some("apply")) if args.contains(&"-o".to_string()) => {
                ok_output("deployment/api\n")
            }
            _ => ok_output(""),
        })
    }))
}

fn unpublished_fetcher() -> Arc<FakeFetcher> {
    Arc::new(FakeFetcher::new(|_url, _headers| {
        Ok(response(404, UNKNOWN_BODY))
    }))
}

fn published_fetcher() -> Arc<FakeFetcher> {
    Arc::new(FakeFetcher::new(|_url, _headers| {
        Ok(response(200, PUBLISHED_BODY))
    }))
}

fn context(temp: &TempDir, runner: Arc<FakeRunner>, fetcher: Arc<FakeFetcher>) -> PipelineContext {
    PipelineContext::with_collaborators(temp.path().to_path_buf(), runner, fetcher)
        .with_basic_auth(Some("admin".to_string()), Some("swordfish".to_string()))
}

#[tokio::test]
async fn build_rebuilds_unpublished_images() {
    let temp = single_service_workspace();
    let runner = pipeline_runner("");
    let ctx = context(&temp, runner.clone(), unpublished_fetcher());

    let built = commands::build(&ctx, "registry.test", "acme").await.unwrap();
    assert_eq!(built, 1);

    let calls = runner.rendered_calls();
    assert!(calls
        .iter()
        .any(|c| c == "docker build . -t registry.test/acme/api:v1"));
}

#[tokio::test]
async fn build_skips_published_images_absent_locally() {
    let temp = single_service_workspace();
    let runner = pipeline_runner("");
    let ctx = context(&temp, runner.clone(), published_fetcher());

    let built = commands::build(&ctx, "registry.test", "acme").await.unwrap();
    assert_eq!(built, 0);
    assert!(runner
        .rendered_calls()
        .iter()
        .all(|c| !c.starts_with("docker build")));
}

#[tokio::test]
async fn push_publishes_built_images_after_one_login() {
    let temp = single_service_workspace();
    let runner = pipeline_runner("abc123\n");
    let ctx = context(&temp, runner.clone(), unpublished_fetcher());

    let pushed = commands::push(&ctx, "registry.test", "acme").await.unwrap();
    assert_eq!(pushed, 1);

    let calls = runner.rendered_calls();
    let login_index = calls
        .iter()
        .position(|c| c.starts_with("docker login"))
        .expect("login before push");
    let push_index = calls
        .iter()
        .position(|c| c.starts_with("docker push"))
        .expect("push issued");
    assert!(login_index < push_index);
    assert!(calls[push_index].contains("registry.test/acme/api:v1"));

    // The login command renders with the password redacted.
    assert!(calls[login_index].contains("<redacted>"));
    assert!(calls.iter().all(|c| !c.contains("swordfish")));
}

#[tokio::test]
async fn push_with_no_candidates_never_logs_in() {
    let temp = single_service_workspace();
    let runner = pipeline_runner("");
    let ctx = context(&temp, runner.clone(), unpublished_fetcher());

    let pushed = commands::push(&ctx, "registry.test", "acme").await.unwrap();
    assert_eq!(pushed, 0);
    assert!(runner
        .rendered_calls()
        .iter()
        .all(|c| !c.starts_with("docker login")));
}

#[tokio::test]
async fn deploy_renders_metadata_and_applies() {
    let temp = single_service_workspace();
    let runner = pipeline_runner("");
    let ctx = context(&temp, runner.clone(), unpublished_fetcher());

    let report = commands::deploy(&ctx, "registry.test", "acme", false)
        .await
        .unwrap();
    assert_eq!(report.applied, 1);

    // The renderer left the resolved metadata next to the service marker.
    let metadata = std::fs::read_to_string(temp.path().join("api/metadata.yaml")).unwrap();
    assert!(metadata.contains("name: api"));
    assert!(metadata.contains("version: v1"));
    assert!(metadata.contains("registry.test/acme/api:v1"));

    let calls = runner.rendered_calls();
    assert!(calls.iter().any(|c| c == "./deployment metadata.yaml"));
    assert!(calls.iter().any(|c| c == "kubectl apply -f -"));
}

#[tokio::test]
async fn deploy_dry_run_propagates_to_kubectl() {
    let temp = single_service_workspace();
    let runner = pipeline_runner("");
    let ctx = context(&temp, runner.clone(), unpublished_fetcher());

    commands::deploy(&ctx, "registry.test", "acme", true)
        .await
        .unwrap();
    assert!(runner
        .rendered_calls()
        .iter()
        .any(|c| c == "kubectl apply -f - --dry-run=client"));
}
