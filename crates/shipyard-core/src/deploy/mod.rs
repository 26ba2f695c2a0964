//! Deploy coordinator.
//!
//! Renders each service's cluster manifest, dry-run-applies it to learn
//! which resource names it would own, and only commits the real applies
//! once every service has been checked and no two services claim the same
//! resource. Conflicts are aggregated, never reported one at a time, and a
//! conflicted run commits nothing.

mod kubectl;
mod renderer;

pub use kubectl::KubectlCluster;
pub use renderer::ScriptRenderer;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{Conflict, PipelineError};
use crate::types::Service;

/// Turns a service definition into a concrete cluster manifest.
#[async_trait]
pub trait ManifestRenderer: Send + Sync {
    async fn render(&self, service: &Service, registry: &str, repo: &str)
        -> anyhow::Result<String>;
}

/// Applies manifests to the cluster.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Report the resource names the manifest declares without mutating
    /// cluster state.
    async fn dry_run_apply(&self, manifest: &str) -> anyhow::Result<Vec<String>>;

    /// Apply the manifest for real, or as a dry run if requested.
    async fn apply(&self, manifest: &str, dry_run: bool) -> anyhow::Result<()>;
}

/// Summary of a committed deploy.
#[derive(Debug)]
pub struct DeployReport {
    /// Number of manifests applied, in generation order.
    pub applied: usize,
    /// Whether the applies were operator-requested dry runs.
    pub dry_run: bool,
}

/// Coordinates conflict-checked deploys across services.
pub struct DeployCoordinator {
    renderer: Arc<dyn ManifestRenderer>,
    cluster: Arc<dyn ClusterClient>,
}

impl DeployCoordinator {
    pub fn new(renderer: Arc<dyn ManifestRenderer>, cluster: Arc<dyn ClusterClient>) -> Self {
        Self { renderer, cluster }
    }

    /// Deploy `services` in order, committing nothing if any two of them
    /// claim the same cluster resource name.
    pub async fn deploy(
        &self,
        services: &[Service],
        registry: &str,
        repo: &str,
        dry_run: bool,
    ) -> anyhow::Result<DeployReport> {
        let mut owners: HashMap<String, usize> = HashMap::new();
        let mut conflicts: Vec<Conflict> = Vec::new();
        let mut manifests: Vec<String> = Vec::new();

        for (index, service) in services.iter().enumerate() {
            let manifest = self.renderer.render(service, registry, repo).await?;
            let resources = self.cluster.dry_run_apply(&manifest).await?;
            debug!(service = %service.name, resources = resources.len(), "dry-run apply");

            for resource in resources {
                match owners.get(&resource) {
                    Some(&first) if first != index => conflicts.push(Conflict {
                        resource,
                        first_owner: services[first].name.clone(),
                        second_owner: service.name.clone(),
                    }),
                    Some(_) => {}
                    None => {
                        owners.insert(resource, index);
                    }
                }
            }
            manifests.push(manifest);
        }

        if !conflicts.is_empty() {
            return Err(PipelineError::Conflicts(conflicts).into());
        }

        for manifest in &manifests {
            self.cluster.apply(manifest, dry_run).await?;
        }
        info!(applied = manifests.len(), dry_run, "deploy committed");
        Ok(DeployReport {
            applied: manifests.len(),
            dry_run,
        })
    }
}
