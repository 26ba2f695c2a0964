//! `push`: publish images that are built locally but absent remotely.

use std::sync::Arc;

use tracing::info;

use crate::commands::{service_containers, PipelineContext};
use crate::error::PipelineError;
use crate::executor::{fan_out, Outcome};
use crate::process::CommandSpec;
use crate::registry::RegistryStateResolver;
use crate::scan::scan;
use crate::secret::Credential;
use crate::types::ImageReference;

/// Scan the workspace, select push candidates (built and not yet
/// published) and push them concurrently after a single registry login.
/// Returns the number of images pushed.
pub async fn push(ctx: &PipelineContext, registry: &str, repo: &str) -> anyhow::Result<usize> {
    let (_prototypes, services) = scan(&ctx.workdir, ctx.runner.as_ref()).await?;
    let resolver = Arc::new(RegistryStateResolver::new(
        Arc::clone(&ctx.fetcher),
        Arc::clone(&ctx.runner),
        ctx.credential.clone(),
    ));

    let registry_name = registry.to_string();
    let repo = repo.to_string();
    let candidates = fan_out(
        service_containers(&services),
        ctx.max_concurrency,
        |(service, container)| {
            let resolver = Arc::clone(&resolver);
            let registry = registry_name.clone();
            let repo = repo.clone();
            async move {
                let name = service.container_image_name(&container);
                let image = ImageReference::new(registry, repo, name, service.version.clone());
                if resolver.is_push_candidate(&image).await? {
                    Ok(Outcome::Keep(image))
                } else {
                    Ok(Outcome::Skip)
                }
            }
        },
    )
    .await?;

    if candidates.is_empty() {
        info!("nothing to push");
        return Ok(0);
    }

    login(ctx, registry).await?;

    let count = candidates.len();
    info!(count, "pushing images");
    fan_out(candidates, ctx.max_concurrency, |image| {
        let runner = Arc::clone(&ctx.runner);
        async move {
            runner
                .run_checked(&CommandSpec::new("docker").arg("push").arg(image.to_string()))
                .await?;
            Ok(Outcome::Keep(()))
        }
    })
    .await?;
    Ok(count)
}

async fn login(ctx: &PipelineContext, registry: &str) -> anyhow::Result<()> {
    let (user, password) = match &ctx.credential {
        Some(Credential::Basic { user, password }) => (user.clone(), password.clone()),
        _ => {
            return Err(PipelineError::User(
                "push requires registry user and password".to_string(),
            )
            .into())
        }
    };
    ctx.runner
        .run_checked(
            &CommandSpec::new("docker")
                .args(["login", "-u"])
                .arg(user)
                .arg("-p")
                .secret_arg(password)
                .arg(registry),
        )
        .await?;
    Ok(())
}
