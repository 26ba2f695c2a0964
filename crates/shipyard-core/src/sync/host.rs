//! Repository-hosting API client.
//!
//! Speaks the provider's REST surface: paginated organization listing via
//! the `Link: rel="next"` header chain, and per-repository existence checks.

use std::sync::Arc;

use anyhow::Context;

use crate::error::PipelineError;
use crate::http::{HttpFetcher, HttpResponse};
use crate::secret::Secret;
use crate::types::RemoteRepo;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Client for the repository-hosting API.
#[derive(Clone)]
pub struct RepoHost {
    fetcher: Arc<dyn HttpFetcher>,
    base_url: String,
    token: Option<Secret>,
}

impl RepoHost {
    pub fn new(fetcher: Arc<dyn HttpFetcher>, token: Option<Secret>) -> Self {
        Self {
            fetcher,
            base_url: DEFAULT_API_BASE.to_string(),
            token,
        }
    }

    /// Point the client at a different API root (tests, enterprise hosts).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// List every repository of `org`, following the pagination chain until
    /// no `rel="next"` link remains.
    pub async fn list_repos(&self, org: &str) -> anyhow::Result<Vec<RemoteRepo>> {
        let mut url = format!("{}/orgs/{}/repos", self.base_url, org);
        let mut repos: Vec<RemoteRepo> = Vec::new();

        loop {
            let response = self.get(&url).await?;
            if response.status != 200 {
                return Err(PipelineError::Protocol {
                    context: format!("repository listing for {}", org),
                    body: response.body,
                }
                .into());
            }
            let page: Vec<RemoteRepo> = serde_json::from_str(&response.body)
                .context("repository listing body did not parse")?;
            repos.extend(page);

            match next_page(&response) {
                Some(next) => url = next,
                None => break,
            }
        }
        Ok(repos)
    }

    /// Confirm `full_name` still exists. `None` means the repository is
    /// gone (the listing can race deletions); any status other than 200 or
    /// 404 is a protocol error.
    pub async fn lookup(&self, full_name: &str) -> anyhow::Result<Option<RemoteRepo>> {
        let url = format!("{}/repos/{}", self.base_url, full_name);
        let response = self.get(&url).await?;
        match response.status {
            200 => {
                let repo: RemoteRepo = serde_json::from_str(&response.body)
                    .with_context(|| format!("repository body for {} did not parse", full_name))?;
                Ok(Some(repo))
            }
            404 => Ok(None),
            _ => Err(PipelineError::Protocol {
                context: format!("repository lookup for {}", full_name),
                body: response.body,
            }
            .into()),
        }
    }

    pub fn token(&self) -> Option<&Secret> {
        self.token.as_ref()
    }

    async fn get(&self, url: &str) -> anyhow::Result<HttpResponse> {
        let headers: Vec<(String, String)> = match &self.token {
            Some(token) => vec![(
                "authorization".to_string(),
                format!("token {}", token.expose()),
            )],
            None => Vec::new(),
        };
        self.fetcher.get(url, &headers, None).await
    }
}

/// Extract the `rel="next"` URL from a response's `Link` header, if any.
pub fn next_page(response: &HttpResponse) -> Option<String> {
    let header = response.header("link")?;
    parse_link_header(header)
        .into_iter()
        .find(|(_, rel)| rel == "next")
        .map(|(url, _)| url)
}

/// Parse an HTTP `Link` header into `(url, rel)` pairs.
///
/// Entries look like `<https://host/path?page=2>; rel="next"`; parameters
/// other than `rel` are ignored.
fn parse_link_header(value: &str) -> Vec<(String, String)> {
    let mut links = Vec::new();
    for entry in value.split(',') {
        let mut parts = entry.split(';');
        let target = match parts.next() {
            Some(t) => t.trim(),
            None => continue,
        };
        let url = match target.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
            Some(url) => url.to_string(),
            None => continue,
        };
        for param in parts {
            if let Some((key, raw)) = param.split_once('=') {
                if key.trim() == "rel" {
                    let rel = raw.trim().trim_matches('"').to_string();
                    links.push((url, rel));
                    break;
                }
            }
        }
    }
    links
}
