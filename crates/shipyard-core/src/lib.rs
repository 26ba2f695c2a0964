//! Shipyard Core Library
//!
//! Provides the decision and coordination logic for the build/push/deploy
//! pipeline: workspace scanning, remote repository sync, registry state
//! resolution and conflict-checked deploys.

pub mod commands;
pub mod config;
pub mod deploy;
pub mod error;
pub mod executor;
pub mod http;
pub mod process;
pub mod registry;
pub mod scan;
pub mod secret;
pub mod sync;
pub mod types;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::ShipyardConfig;

    // Core data model
    pub use crate::types::{ImageReference, Prototype, RemoteRepo, Service};

    // Credentials
    pub use crate::secret::{AuthUrl, Credential, Secret};

    // Executor
    pub use crate::executor::{fan_out, Outcome};

    // Collaborator seams
    pub use crate::deploy::{ClusterClient, ManifestRenderer};
    pub use crate::http::{HttpFetcher, HttpResponse};
    pub use crate::process::{CommandOutput, CommandRunner, CommandSpec};

    // Errors
    pub use crate::error::{Conflict, PipelineError};
}
