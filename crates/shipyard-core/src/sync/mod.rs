//! Remote repository synchronization.
//!
//! Enumerates an organization's repositories, filters them by name pattern,
//! verifies each still exists and clones or updates the survivors
//! concurrently. The clone credential travels only inside an [`AuthUrl`],
//! so no log or status line ever carries the raw token.

mod host;

pub use host::{next_page, RepoHost, DEFAULT_API_BASE};

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info};

use crate::error::PipelineError;
use crate::executor::{fan_out, Outcome};
use crate::process::{CommandRunner, CommandSpec};
use crate::secret::AuthUrl;
use crate::types::RemoteRepo;

/// Retain repositories whose full name glob-matches `pattern`.
///
/// A pattern matching nothing is an empty success, not an error; a
/// malformed pattern is a user error.
pub fn filter_repos(repos: Vec<RemoteRepo>, pattern: &str) -> anyhow::Result<Vec<RemoteRepo>> {
    let pattern = glob::Pattern::new(pattern)
        .map_err(|e| PipelineError::User(format!("invalid filter pattern: {}", e)))?;
    Ok(repos
        .into_iter()
        .filter(|repo| pattern.matches(&repo.full_name))
        .collect())
}

/// Synchronizes an organization's repositories into the local workspace.
pub struct RepoSync {
    host: RepoHost,
    runner: Arc<dyn CommandRunner>,
    workdir: PathBuf,
    max_concurrency: Option<usize>,
}

impl RepoSync {
    pub fn new(host: RepoHost, runner: Arc<dyn CommandRunner>, workdir: PathBuf) -> Self {
        Self {
            host,
            runner,
            workdir,
            max_concurrency: None,
        }
    }

    /// Cap how many clone/update operations run at once.
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = Some(limit);
        self
    }

    /// List, filter, verify and sync `org`'s repositories.
    pub async fn pull(&self, org: &str, pattern: &str) -> anyhow::Result<()> {
        let repos = self.host.list_repos(org).await?;
        let filtered = filter_repos(repos, pattern)?;
        if filtered.is_empty() {
            info!(org, pattern, "no repositories matched");
            return Ok(());
        }

        // A listed repository can disappear before we reach it; a 404 on
        // verification skips it rather than failing the run.
        let verified = fan_out(filtered, self.max_concurrency, |repo| {
            let host = self.host.clone();
            async move {
                match host.lookup(&repo.full_name).await? {
                    Some(current) => Ok(Outcome::Keep(current)),
                    None => {
                        debug!(repo = %repo.full_name, "repository vanished, skipping");
                        Ok(Outcome::Skip)
                    }
                }
            }
        })
        .await?;

        info!(count = verified.len(), "syncing repositories");
        fan_out(verified, self.max_concurrency, |repo| {
            let runner = Arc::clone(&self.runner);
            let workdir = self.workdir.clone();
            let token = self.host.token().cloned();
            async move {
                let url = AuthUrl::new(&repo.clone_url, token.as_ref());
                git_pull(runner.as_ref(), &workdir, &repo, url).await?;
                Ok(Outcome::Keep(()))
            }
        })
        .await?;
        Ok(())
    }
}

/// Clone or update a single repository under `workdir/<full_name>`.
async fn git_pull(
    runner: &dyn CommandRunner,
    workdir: &std::path::Path,
    repo: &RemoteRepo,
    url: AuthUrl,
) -> anyhow::Result<()> {
    let repodir = workdir.join(&repo.full_name);
    if !repodir.exists() {
        std::fs::create_dir_all(&repodir)
            .with_context(|| format!("failed to create {}", repodir.display()))?;
        runner
            .run_checked(&CommandSpec::new("git").arg("init").current_dir(&repodir))
            .await?;
    }

    runner
        .run_checked(
            &CommandSpec::new("git")
                .arg("pull")
                .url_arg(url)
                .current_dir(&repodir),
        )
        .await
        .with_context(|| format!("failed to sync {}", repo.full_name))?;
    Ok(())
}
