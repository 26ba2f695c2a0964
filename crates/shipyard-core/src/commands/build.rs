//! `build`: rebuild every image selected by the build policy.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::commands::{service_containers, PipelineContext};
use crate::executor::{fan_out, Outcome};
use crate::process::CommandSpec;
use crate::registry::RegistryStateResolver;
use crate::scan::scan;
use crate::types::ImageReference;

/// Scan the workspace, select stale images and rebuild them concurrently.
/// Returns the number of images built.
pub async fn build(ctx: &PipelineContext, registry: &str, repo: &str) -> anyhow::Result<usize> {
    let (_prototypes, services) = scan(&ctx.workdir, ctx.runner.as_ref()).await?;
    let resolver = Arc::new(RegistryStateResolver::new(
        Arc::clone(&ctx.fetcher),
        Arc::clone(&ctx.runner),
        ctx.credential.clone(),
    ));

    let registry = registry.to_string();
    let repo = repo.to_string();
    let selected = fan_out(
        service_containers(&services),
        ctx.max_concurrency,
        |(service, container)| {
            let resolver = Arc::clone(&resolver);
            let registry = registry.clone();
            let repo = repo.clone();
            async move {
                let name = service.container_image_name(&container);
                let image = ImageReference::new(registry, repo, name, service.version.clone());
                if resolver.needs_build(&image).await? {
                    Ok(Outcome::Keep((service, container, image)))
                } else {
                    Ok(Outcome::Skip)
                }
            }
        },
    )
    .await?;

    let count = selected.len();
    info!(count, "building images");
    fan_out(
        selected,
        ctx.max_concurrency,
        |(service, container, image)| {
            let runner = Arc::clone(&ctx.runner);
            async move {
                let context_dir = service
                    .root
                    .join(container.parent().unwrap_or_else(|| Path::new("")));
                runner
                    .run_checked(
                        &CommandSpec::new("docker")
                            .args(["build", ".", "-t"])
                            .arg(image.to_string())
                            .current_dir(context_dir),
                    )
                    .await?;
                Ok(Outcome::Keep(()))
            }
        },
    )
    .await?;
    Ok(count)
}
