//! Script-backed manifest renderer.
//!
//! Each service ships its own `./deployment` template executable. The
//! renderer writes the service's resolved metadata next to it and captures
//! the executable's stdout as the manifest text.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;

use super::ManifestRenderer;
use crate::process::{CommandRunner, CommandSpec};
use crate::types::{ImageReference, Service};

/// File the renderer hands to the template executable.
const METADATA_FILE: &str = "metadata.yaml";
/// The per-service template executable.
const TEMPLATE_PROGRAM: &str = "./deployment";

/// Resolved inputs the template executable consumes.
#[derive(Debug, Serialize)]
struct ServiceMetadata {
    name: String,
    version: String,
    /// Image reference per container, keyed by image name.
    images: BTreeMap<String, String>,
}

pub struct ScriptRenderer {
    runner: Arc<dyn CommandRunner>,
}

impl ScriptRenderer {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl ManifestRenderer for ScriptRenderer {
    async fn render(
        &self,
        service: &Service,
        registry: &str,
        repo: &str,
    ) -> anyhow::Result<String> {
        let mut images = BTreeMap::new();
        for container in &service.containers {
            let name = service.container_image_name(container);
            let image = ImageReference::new(registry, repo, &name, &service.version);
            images.insert(name, image.to_string());
        }

        let metadata = ServiceMetadata {
            name: service.name.clone(),
            version: service.version.clone(),
            images,
        };
        let metadata_path = service.root.join(METADATA_FILE);
        let rendered = serde_yaml::to_string(&metadata)
            .with_context(|| format!("failed to serialize metadata for {}", service.name))?;
        std::fs::write(&metadata_path, rendered)
            .with_context(|| format!("failed to write {}", metadata_path.display()))?;

        let output = self
            .runner
            .run_checked(
                &CommandSpec::new(TEMPLATE_PROGRAM)
                    .arg(METADATA_FILE)
                    .current_dir(&service.root),
            )
            .await
            .with_context(|| format!("manifest template failed for {}", service.name))?;
        Ok(output.stdout)
    }
}
