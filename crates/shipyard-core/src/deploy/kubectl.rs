//! kubectl-backed cluster client.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::ClusterClient;
use crate::process::{CommandRunner, CommandSpec};

/// Applies manifests through the `kubectl` binary, fed over stdin.
pub struct KubectlCluster {
    runner: Arc<dyn CommandRunner>,
}

impl KubectlCluster {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl ClusterClient for KubectlCluster {
    async fn dry_run_apply(&self, manifest: &str) -> anyhow::Result<Vec<String>> {
        let output = self
            .runner
            .run_checked(
                &CommandSpec::new("kubectl")
                    .args(["apply", "--dry-run=client", "-f", "-", "-o", "name"])
                    .stdin(manifest),
            )
            .await?;
        Ok(output
            .stdout
            .split_whitespace()
            .map(str::to_string)
            .collect())
    }

    async fn apply(&self, manifest: &str, dry_run: bool) -> anyhow::Result<()> {
        let mut spec = CommandSpec::new("kubectl").args(["apply", "-f", "-"]);
        if dry_run {
            spec = spec.arg("--dry-run=client");
        }
        let output = self.runner.run_checked(&spec.stdin(manifest)).await?;
        for line in output.stdout.lines() {
            info!(target: "shipyard::deploy", "{}", line);
        }
        Ok(())
    }
}
