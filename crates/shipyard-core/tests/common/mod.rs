//! Shared fakes for exercising the pipeline core without real processes or
//! network.
#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;

use shipyard_core::http::{HttpFetcher, HttpResponse};
use shipyard_core::process::{CommandOutput, CommandRunner, CommandSpec};

type RunnerHandler = Box<dyn Fn(&CommandSpec) -> anyhow::Result<CommandOutput> + Send + Sync>;
type FetcherHandler =
    Box<dyn Fn(&str, &[(String, String)]) -> anyhow::Result<HttpResponse> + Send + Sync>;

/// Scripted command runner recording every rendered command line.
pub struct FakeRunner {
    pub calls: Mutex<Vec<String>>,
    handler: RunnerHandler,
}

impl FakeRunner {
    pub fn new(
        handler: impl Fn(&CommandSpec) -> anyhow::Result<CommandOutput> + Send + Sync + 'static,
    ) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            handler: Box::new(handler),
        }
    }

    /// Runner that answers every command with empty success output.
    pub fn silent() -> Self {
        Self::new(|_| Ok(ok_output("")))
    }

    pub fn rendered_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, spec: &CommandSpec) -> anyhow::Result<CommandOutput> {
        self.calls.lock().unwrap().push(spec.to_string());
        (self.handler)(spec)
    }
}

/// One request as seen by the fake fetcher.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub basic_auth: Option<(String, String)>,
}

/// Scripted HTTP fetcher recording every request.
pub struct FakeFetcher {
    pub requests: Mutex<Vec<RecordedRequest>>,
    handler: FetcherHandler,
}

impl FakeFetcher {
    pub fn new(
        handler: impl Fn(&str, &[(String, String)]) -> anyhow::Result<HttpResponse>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            handler: Box::new(handler),
        }
    }

    pub fn recorded(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.recorded().into_iter().map(|r| r.url).collect()
    }
}

#[async_trait]
impl HttpFetcher for FakeFetcher {
    async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
        basic_auth: Option<(&str, &str)>,
    ) -> anyhow::Result<HttpResponse> {
        self.requests.lock().unwrap().push(RecordedRequest {
            url: url.to_string(),
            headers: headers.to_vec(),
            basic_auth: basic_auth.map(|(user, password)| (user.to_string(), password.to_string())),
        });
        (self.handler)(url, headers)
    }
}

pub fn ok_output(stdout: &str) -> CommandOutput {
    CommandOutput {
        success: true,
        code: Some(0),
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

pub fn response(status: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        headers: Vec::new(),
        body: body.to_string(),
    }
}

pub fn response_with_headers(status: u16, body: &str, headers: &[(&str, &str)]) -> HttpResponse {
    HttpResponse {
        status,
        headers: headers
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect(),
        body: body.to_string(),
    }
}
