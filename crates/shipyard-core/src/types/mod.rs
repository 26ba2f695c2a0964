//! Core data model shared across the scan, sync, registry and deploy layers.

use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;

/// A repository as reported by the hosting provider's listing API.
///
/// Identity is `full_name`; produced by the listing, consumed by sync,
/// never persisted.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RemoteRepo {
    pub full_name: String,
    pub clone_url: String,
}

/// A reusable template unit, located by its `proto.yaml` marker.
///
/// Prototypes are terminal scan nodes: nothing beneath one is attributed
/// to a service.
#[derive(Debug, Clone)]
pub struct Prototype {
    /// Unique name within a scan, from the marker metadata.
    pub name: String,
    /// Directory holding the marker file.
    pub root: PathBuf,
}

/// A deployable service, located by its `service.yaml` marker.
#[derive(Debug, Clone)]
pub struct Service {
    /// Name from the marker metadata.
    pub name: String,
    /// Source-control revision of the service root, captured at scan time
    /// and immutable for the rest of the run.
    pub version: String,
    /// Directory holding the marker file.
    pub root: PathBuf,
    /// Dockerfile paths relative to `root`, in descent order.
    pub containers: Vec<PathBuf>,
}

impl Service {
    /// The image name for a container context: the Dockerfile's directory
    /// name, or the service name for a Dockerfile at the service root.
    pub fn container_image_name(&self, container: &std::path::Path) -> String {
        container
            .parent()
            .and_then(|dir| dir.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.name.clone())
    }
}

/// A fully qualified container image reference.
///
/// Derived from the operator-supplied `(registry, repo)` and a service
/// container's `(name, version)`; constructed once, compared by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageReference {
    pub registry: String,
    pub repo: String,
    pub name: String,
    pub version: String,
}

impl ImageReference {
    pub fn new(
        registry: impl Into<String>,
        repo: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            registry: registry.into(),
            repo: repo.into(),
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}:{}",
            self.registry, self.repo, self.name, self.version
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn image_reference_renders_docker_style() {
        let image = ImageReference::new("registry.example.com", "acme", "api", "abc123");
        assert_eq!(image.to_string(), "registry.example.com/acme/api:abc123");
    }

    #[test]
    fn container_image_name_uses_dockerfile_directory() {
        let svc = Service {
            name: "api".to_string(),
            version: "abc".to_string(),
            root: PathBuf::from("/ws/api"),
            containers: vec![],
        };
        assert_eq!(
            svc.container_image_name(Path::new("worker/Dockerfile")),
            "worker"
        );
        assert_eq!(svc.container_image_name(Path::new("Dockerfile")), "api");
    }
}
