//! Configuration file loading and resolution.
//!
//! `shipyard.toml` is resolved from an explicit flag, the
//! `SHIPYARD_CONFIG` environment variable, or an upward walk from the
//! working directory. CLI flags override file values; merging happens in
//! the CLI layer.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::error::PipelineError;

pub const CONFIG_FILE: &str = "shipyard.toml";
pub const CONFIG_ENV: &str = "SHIPYARD_CONFIG";

/// Operator configuration, all fields optional at this layer; each
/// subcommand validates what it needs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShipyardConfig {
    /// Hosting-provider organization to sync from.
    pub organization: Option<String>,
    /// Target `registry/repo` for images.
    pub docker_repo: Option<String>,
    /// Hosting-provider API token.
    pub token: Option<String>,
    /// Registry user.
    pub user: Option<String>,
    /// Registry password.
    pub password: Option<String>,
    /// Workspace directory; defaults to the current directory.
    pub workdir: Option<PathBuf>,
    /// Repository name filter pattern.
    pub filter: Option<String>,
}

impl ShipyardConfig {
    /// Load the resolved config file, or defaults when none exists.
    pub fn load_or_default(explicit: Option<&Path>) -> anyhow::Result<Self> {
        match resolve_config_path(explicit) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))
    }
}

/// Locate the config file: explicit flag, then environment, then an upward
/// walk from the current directory.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    let mut dir = std::env::current_dir().ok()?;
    loop {
        let candidate = dir.join(CONFIG_FILE);
        if candidate.exists() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

/// Split an operator-supplied `registry/repo` value.
pub fn split_docker_repo(value: &str) -> anyhow::Result<(String, String)> {
    match value.split_once('/') {
        Some((registry, repo)) if !registry.is_empty() && !repo.is_empty() => {
            Ok((registry.to_string(), repo.to_string()))
        }
        _ => Err(PipelineError::User(format!(
            "docker repo must be of the form registry/repo, got {:?}",
            value
        ))
        .into()),
    }
}
