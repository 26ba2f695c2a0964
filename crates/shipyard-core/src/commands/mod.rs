//! Pipeline commands: pull, build, push, deploy.

pub mod context;

mod build;
mod deploy;
mod pull;
mod push;

pub use build::build;
pub use context::PipelineContext;
pub use deploy::deploy;
pub use pull::pull;
pub use push::push;

use std::path::PathBuf;

use crate::types::Service;

/// Flatten services into `(service, container)` work items, preserving scan
/// order then container descent order.
fn service_containers(services: &[Service]) -> Vec<(Service, PathBuf)> {
    let mut items = Vec::new();
    for service in services {
        for container in &service.containers {
            items.push((service.clone(), container.clone()));
        }
    }
    items
}
