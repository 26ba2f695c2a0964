//! Workspace scanner.
//!
//! Walks the workspace tree classifying directories into prototype units,
//! service units and container build contexts. Prototype directories are
//! terminal; a Dockerfile is attributed to the nearest service-marker
//! ancestor, or to no service at all.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use anyhow::Context;
use serde::Deserialize;
use tracing::debug;

use crate::process::{CommandRunner, CommandSpec};
use crate::types::{Prototype, Service};

/// Marker file naming a prototype unit.
pub const PROTOTYPE_MARKER: &str = "proto.yaml";
/// Marker file naming a service unit.
pub const SERVICE_MARKER: &str = "service.yaml";
/// Container build context marker.
pub const CONTAINER_MARKER: &str = "Dockerfile";

/// Directories never descended into.
const EXCLUDED: &[&str] = &[".git"];

/// The subset of marker metadata the scanner needs.
#[derive(Debug, Deserialize)]
struct MarkerMetadata {
    name: String,
}

/// Scan results, accumulated through the recursive descent.
#[derive(Debug, Default)]
struct ScanAccumulator {
    prototypes: Vec<Prototype>,
    services: Vec<Service>,
}

/// Walk `root` and return the discovered prototypes and services.
///
/// Each service's version is the `git rev-parse HEAD` of its root, captured
/// when the marker is first seen and never revisited within the run.
pub async fn scan(
    root: &Path,
    runner: &dyn CommandRunner,
) -> anyhow::Result<(Vec<Prototype>, Vec<Service>)> {
    let mut acc = ScanAccumulator::default();
    descend(root.to_path_buf(), None, &mut acc, runner).await?;
    debug!(
        prototypes = acc.prototypes.len(),
        services = acc.services.len(),
        "workspace scan complete"
    );
    Ok((acc.prototypes, acc.services))
}

fn descend<'a>(
    path: PathBuf,
    current_service: Option<usize>,
    acc: &'a mut ScanAccumulator,
    runner: &'a dyn CommandRunner,
) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
    Box::pin(async move {
        let names = list_entries(&path)?;
        let mut current_service = current_service;

        if names.iter().any(|n| n == PROTOTYPE_MARKER) {
            let metadata = read_marker(&path.join(PROTOTYPE_MARKER))?;
            acc.prototypes.push(Prototype {
                name: metadata.name,
                root: path,
            });
            return Ok(());
        }

        if names.iter().any(|n| n == SERVICE_MARKER) {
            let version = capture_revision(&path, runner).await?;
            let metadata = read_marker(&path.join(SERVICE_MARKER))?;
            acc.services.push(Service {
                name: metadata.name,
                version,
                root: path.clone(),
                containers: Vec::new(),
            });
            current_service = Some(acc.services.len() - 1);
        }

        if names.iter().any(|n| n == CONTAINER_MARKER) {
            if let Some(index) = current_service {
                let service = &mut acc.services[index];
                let dockerfile = path.join(CONTAINER_MARKER);
                let relative = dockerfile
                    .strip_prefix(&service.root)
                    .with_context(|| {
                        format!(
                            "container context {} escapes service root {}",
                            dockerfile.display(),
                            service.root.display()
                        )
                    })?
                    .to_path_buf();
                service.containers.push(relative);
            }
        }

        for name in names {
            if EXCLUDED.contains(&name.as_str()) {
                continue;
            }
            let child = path.join(&name);
            if child.is_dir() {
                descend(child, current_service, acc, runner).await?;
            }
        }
        Ok(())
    })
}

/// Direct entry names of a directory, sorted for reproducible descent order.
fn list_entries(path: &Path) -> anyhow::Result<Vec<String>> {
    let mut names = Vec::new();
    let entries = std::fs::read_dir(path)
        .with_context(|| format!("failed to read directory {}", path.display()))?;
    for entry in entries {
        let entry = entry?;
        names.push(entry.file_name().to_string_lossy().to_string());
    }
    names.sort();
    Ok(names)
}

fn read_marker(path: &Path) -> anyhow::Result<MarkerMetadata> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("invalid marker metadata in {}", path.display()))
}

async fn capture_revision(path: &Path, runner: &dyn CommandRunner) -> anyhow::Result<String> {
    let spec = CommandSpec::new("git")
        .args(["rev-parse", "HEAD"])
        .current_dir(path);
    let output = runner
        .run_checked(&spec)
        .await
        .with_context(|| format!("failed to capture revision of {}", path.display()))?;
    Ok(output.stdout.trim().to_string())
}
