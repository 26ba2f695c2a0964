//! Error taxonomy for the pipeline core.

use thiserror::Error;

/// A deploy-time resource ownership conflict: two services' manifests
/// declare the same cluster resource name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// Cluster resource name both services claim.
    pub resource: String,
    /// Service that claimed the resource first (encounter order).
    pub first_owner: String,
    /// Service whose later claim collided.
    pub second_owner: String,
}

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} defined by {} and {}",
            self.resource, self.first_owner, self.second_owner
        )
    }
}

/// Fatal pipeline failures the CLI layer turns into a non-zero exit.
///
/// Transient I/O failures are not part of this taxonomy; they propagate as
/// plain `anyhow` errors from the collaborator seams and are never retried
/// by the core.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Operator input problem (missing required argument, malformed value).
    #[error("{0}")]
    User(String),

    /// Aggregated deploy conflicts; nothing was applied.
    #[error("conflicts: {}", format_conflicts(.0))]
    Conflicts(Vec<Conflict>),

    /// The registry or hosting API answered with a shape the core does not
    /// understand. Never retried; guessing intent risks publishing bad state.
    #[error("unexpected {context} response: {body}")]
    Protocol { context: String, body: String },
}

fn format_conflicts(conflicts: &[Conflict]) -> String {
    conflicts
        .iter()
        .map(Conflict::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_error_lists_every_conflict() {
        let err = PipelineError::Conflicts(vec![
            Conflict {
                resource: "service/api".to_string(),
                first_owner: "billing".to_string(),
                second_owner: "payments".to_string(),
            },
            Conflict {
                resource: "deployment/worker".to_string(),
                first_owner: "queue".to_string(),
                second_owner: "batch".to_string(),
            },
        ]);

        let message = err.to_string();
        assert!(message.contains("service/api defined by billing and payments"));
        assert!(message.contains("deployment/worker defined by queue and batch"));
    }
}
