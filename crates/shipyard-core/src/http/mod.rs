//! HTTP execution seam.
//!
//! The resolver and sync layers speak to the hosting provider and the image
//! registry through [`HttpFetcher`]; expected-status decisions stay with the
//! callers, the fetcher only moves bytes.

use anyhow::Context;
use async_trait::async_trait;
use tracing::debug;

/// A captured HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Header name/value pairs, names lowercased.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// First header value matching `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn json(&self) -> anyhow::Result<serde_json::Value> {
        serde_json::from_str(&self.body).context("response body is not valid JSON")
    }
}

/// Issues GET requests on behalf of the pipeline core.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
        basic_auth: Option<(&str, &str)>,
    ) -> anyhow::Result<HttpResponse>;
}

/// Real fetcher backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("shipyard/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
        basic_auth: Option<(&str, &str)>,
    ) -> anyhow::Result<HttpResponse> {
        debug!(%url, "GET");

        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        if let Some((user, password)) = basic_auth {
            request = request.basic_auth(user, Some(password));
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;

        let status = response.status().as_u16();
        let response_headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_ascii_lowercase(),
                    String::from_utf8_lossy(value.as_bytes()).to_string(),
                )
            })
            .collect();
        let body = response
            .text()
            .await
            .with_context(|| format!("failed to read response body from {}", url))?;

        Ok(HttpResponse {
            status,
            headers: response_headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let response = HttpResponse {
            status: 200,
            headers: vec![("www-authenticate".to_string(), "Bearer realm=\"r\"".to_string())],
            body: String::new(),
        };
        assert_eq!(
            response.header("Www-Authenticate"),
            Some("Bearer realm=\"r\"")
        );
        assert_eq!(response.header("link"), None);
    }

    #[test]
    fn json_accessor_rejects_non_json() {
        let response = HttpResponse {
            status: 200,
            headers: vec![],
            body: "not json".to_string(),
        };
        assert!(response.json().is_err());
    }
}
