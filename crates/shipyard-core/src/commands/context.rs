//! Shared context threaded through the pipeline commands.

use std::path::PathBuf;
use std::sync::Arc;

use crate::http::{HttpFetcher, ReqwestFetcher};
use crate::process::{CommandRunner, ShellRunner};
use crate::secret::{Credential, Secret};

/// Collaborators and operator settings for one pipeline run.
///
/// Tests swap in fake runner/fetcher implementations; the CLI builds the
/// real ones.
pub struct PipelineContext {
    pub runner: Arc<dyn CommandRunner>,
    pub fetcher: Arc<dyn HttpFetcher>,
    pub workdir: PathBuf,
    /// Hosting-provider token; also embedded in clone transport URLs.
    pub token: Option<Secret>,
    /// Registry user/password pair.
    pub credential: Option<Credential>,
    /// Fan-out concurrency cap; `None` leaves fan-outs unbounded.
    pub max_concurrency: Option<usize>,
}

impl PipelineContext {
    /// Context with real subprocess and HTTP collaborators.
    pub fn new(workdir: PathBuf) -> anyhow::Result<Self> {
        Ok(Self {
            runner: Arc::new(ShellRunner),
            fetcher: Arc::new(ReqwestFetcher::new()?),
            workdir,
            token: None,
            credential: None,
            max_concurrency: None,
        })
    }

    pub fn with_collaborators(
        workdir: PathBuf,
        runner: Arc<dyn CommandRunner>,
        fetcher: Arc<dyn HttpFetcher>,
    ) -> Self {
        Self {
            runner,
            fetcher,
            workdir,
            token: None,
            credential: None,
            max_concurrency: None,
        }
    }

    pub fn with_token(mut self, token: Option<Secret>) -> Self {
        self.token = token;
        self
    }

    pub fn with_basic_auth(mut self, user: Option<String>, password: Option<String>) -> Self {
        self.credential = match (user, password) {
            (Some(user), Some(password)) => Some(Credential::Basic {
                user,
                password: Secret::new(password),
            }),
            _ => None,
        };
        self
    }

    pub fn with_max_concurrency(mut self, limit: Option<usize>) -> Self {
        self.max_concurrency = limit;
        self
    }
}
