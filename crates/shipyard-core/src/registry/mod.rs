//! Registry state resolver.
//!
//! Decides, per image, whether it already exists in the local image store
//! and whether its manifest is already published in the remote registry,
//! performing the registry's challenge/response bearer handshake when the
//! anonymous/basic request is refused.

mod challenge;

pub use challenge::{parse_challenge, BearerChallenge};

use std::sync::Arc;

use tracing::debug;

use crate::error::PipelineError;
use crate::http::{HttpFetcher, HttpResponse};
use crate::process::{CommandRunner, CommandSpec};
use crate::secret::Credential;
use crate::types::ImageReference;

/// Registry error code meaning "no manifest under that tag".
const MANIFEST_UNKNOWN: &str = "MANIFEST_UNKNOWN";

/// Resolves local-build and remote-publish state for image references.
pub struct RegistryStateResolver {
    fetcher: Arc<dyn HttpFetcher>,
    runner: Arc<dyn CommandRunner>,
    credential: Option<Credential>,
}

impl RegistryStateResolver {
    pub fn new(
        fetcher: Arc<dyn HttpFetcher>,
        runner: Arc<dyn CommandRunner>,
        credential: Option<Credential>,
    ) -> Self {
        Self {
            fetcher,
            runner,
            credential,
        }
    }

    /// Whether the local image store holds `image`.
    pub async fn is_built(&self, image: &ImageReference) -> anyhow::Result<bool> {
        let output = self
            .runner
            .run_checked(
                &CommandSpec::new("docker")
                    .args(["images", "-q"])
                    .arg(image.to_string()),
            )
            .await?;
        Ok(!output.stdout.trim().is_empty())
    }

    /// Whether the remote registry holds a manifest for `image`'s tag.
    ///
    /// Anonymous/basic request first; on 401 the `WWW-Authenticate`
    /// challenge is answered with a bearer token fetched from its realm and
    /// the request retried. Any response shape beyond the documented
    /// published / manifest-unknown forms fails loudly.
    pub async fn is_published(&self, image: &ImageReference) -> anyhow::Result<bool> {
        let url = format!(
            "https://{}/v2/{}/{}/manifests/{}",
            image.registry, image.repo, image.name, image.version
        );

        let mut response = self.fetcher.get(&url, &[], self.basic_auth()).await?;
        if response.status == 401 {
            response = self.retry_with_bearer(&url, &response).await?;
            self.expect_status(&response, &[200, 404], image)?;
        } else {
            self.expect_status(&response, &[200, 401, 404], image)?;
        }

        let body = response.json().map_err(|_| PipelineError::Protocol {
            context: format!("manifest for {}", image),
            body: response.body.clone(),
        })?;

        if body.get("signatures").is_some() && body.get("fsLayers").is_some() {
            return Ok(true);
        }
        if let Some(first) = body.get("errors").and_then(|e| e.as_array()).and_then(|e| e.first()) {
            if first.get("code").and_then(|c| c.as_str()) == Some(MANIFEST_UNKNOWN) {
                return Ok(false);
            }
        }
        Err(PipelineError::Protocol {
            context: format!("manifest for {}", image),
            body: response.body,
        }
        .into())
    }

    /// Build selection policy: rebuild whenever the image is not yet
    /// published remotely, or whenever it already exists locally. Local
    /// presence does not exempt an unpublished image; the push decision
    /// separately checks "built but not pushed".
    pub async fn needs_build(&self, image: &ImageReference) -> anyhow::Result<bool> {
        Ok(!self.is_published(image).await? || self.is_built(image).await?)
    }

    /// Push selection policy: built locally and not yet published.
    pub async fn is_push_candidate(&self, image: &ImageReference) -> anyhow::Result<bool> {
        Ok(self.is_built(image).await? && !self.is_published(image).await?)
    }

    fn basic_auth(&self) -> Option<(&str, &str)> {
        self.credential.as_ref().and_then(Credential::basic)
    }

    async fn retry_with_bearer(
        &self,
        url: &str,
        refused: &HttpResponse,
    ) -> anyhow::Result<HttpResponse> {
        let header = refused
            .header("www-authenticate")
            .ok_or_else(|| PipelineError::Protocol {
                context: "registry 401 without auth challenge".to_string(),
                body: refused.body.clone(),
            })?;
        let challenge = parse_challenge(header)?;
        debug!(realm = %challenge.realm, "answering registry auth challenge");

        let token_response = self
            .fetcher
            .get(&challenge.token_url(), &[], self.basic_auth())
            .await?;
        let token = token_response
            .json()
            .ok()
            .and_then(|body| {
                body.get("token")
                    .and_then(|t| t.as_str())
                    .map(str::to_string)
            })
            .ok_or_else(|| PipelineError::Protocol {
                context: format!("token endpoint {}", challenge.realm),
                body: token_response.body.clone(),
            })?;

        let headers = vec![("authorization".to_string(), format!("Bearer {}", token))];
        self.fetcher.get(url, &headers, None).await
    }

    fn expect_status(
        &self,
        response: &HttpResponse,
        expected: &[u16],
        image: &ImageReference,
    ) -> anyhow::Result<()> {
        if expected.contains(&response.status) {
            Ok(())
        } else {
            Err(PipelineError::Protocol {
                context: format!("manifest request for {} ({})", image, response.status),
                body: response.body.clone(),
            }
            .into())
        }
    }
}
