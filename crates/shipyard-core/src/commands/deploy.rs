//! `deploy`: conflict-checked application of every service's manifest.

use std::sync::Arc;

use crate::commands::PipelineContext;
use crate::deploy::{DeployCoordinator, DeployReport, KubectlCluster, ScriptRenderer};
use crate::scan::scan;

pub async fn deploy(
    ctx: &PipelineContext,
    registry: &str,
    repo: &str,
    dry_run: bool,
) -> anyhow::Result<DeployReport> {
    let (_prototypes, services) = scan(&ctx.workdir, ctx.runner.as_ref()).await?;
    let coordinator = DeployCoordinator::new(
        Arc::new(ScriptRenderer::new(Arc::clone(&ctx.runner))),
        Arc::new(KubectlCluster::new(Arc::clone(&ctx.runner))),
    );
    coordinator.deploy(&services, registry, repo, dry_run).await
}
