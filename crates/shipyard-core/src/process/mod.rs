//! Subprocess execution seam.
//!
//! Commands are described by [`CommandSpec`], which keeps secret arguments
//! structurally separate from plain ones so that every rendered form of a
//! command line is redacted; only the spawned process sees raw values.

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;

use anyhow::Context;
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::secret::{AuthUrl, Secret};

/// A single command-line argument.
#[derive(Debug, Clone)]
pub enum CommandArg {
    Plain(String),
    Secret(Secret),
    /// A transport URL with an embedded credential; rendered with the
    /// credential segment redacted, passed to the process in full.
    Url(AuthUrl),
}

/// A command to execute, with optional working directory and stdin payload.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    program: String,
    args: Vec<CommandArg>,
    cwd: Option<PathBuf>,
    stdin: Option<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(CommandArg::Plain(arg.into()));
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for arg in args {
            self.args.push(CommandArg::Plain(arg.into()));
        }
        self
    }

    /// Append an argument whose value must never appear in rendered output.
    pub fn secret_arg(mut self, secret: Secret) -> Self {
        self.args.push(CommandArg::Secret(secret));
        self
    }

    /// Append a credential-bearing URL argument.
    pub fn url_arg(mut self, url: AuthUrl) -> Self {
        self.args.push(CommandArg::Url(url));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn stdin(mut self, payload: impl Into<String>) -> Self {
        self.stdin = Some(payload.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn cwd(&self) -> Option<&PathBuf> {
        self.cwd.as_ref()
    }

    pub fn stdin_payload(&self) -> Option<&str> {
        self.stdin.as_deref()
    }

    /// Raw argument values, secrets included. Transport use only.
    pub fn transport_args(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| match arg {
                CommandArg::Plain(value) => value.clone(),
                CommandArg::Secret(secret) => secret.expose().to_string(),
                CommandArg::Url(url) => url.transport_string(),
            })
            .collect()
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            match arg {
                CommandArg::Plain(value) => write!(f, " {}", value)?,
                CommandArg::Secret(secret) => write!(f, " {}", secret)?,
                CommandArg::Url(url) => write!(f, " {}", url)?,
            }
        }
        Ok(())
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Executes commands on behalf of the pipeline core.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the command to completion, capturing output. Spawn failures are
    /// errors; a nonzero exit is reported through [`CommandOutput`].
    async fn run(&self, spec: &CommandSpec) -> anyhow::Result<CommandOutput>;

    /// Run the command and fail on a nonzero exit, with the redacted
    /// command line and stderr in the error.
    async fn run_checked(&self, spec: &CommandSpec) -> anyhow::Result<CommandOutput> {
        let output = self.run(spec).await?;
        if !output.success {
            anyhow::bail!(
                "command failed ({}): {}",
                spec,
                output.stderr.trim()
            );
        }
        Ok(output)
    }
}

/// Real runner backed by `tokio::process`.
#[derive(Debug, Default)]
pub struct ShellRunner;

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, spec: &CommandSpec) -> anyhow::Result<CommandOutput> {
        debug!(command = %spec, "running");

        let mut cmd = tokio::process::Command::new(spec.program());
        cmd.args(spec.transport_args());
        if let Some(dir) = spec.cwd() {
            cmd.current_dir(dir);
        }
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        if spec.stdin_payload().is_some() {
            cmd.stdin(Stdio::piped());
        } else {
            cmd.stdin(Stdio::null());
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn {}", spec))?;

        if let Some(payload) = spec.stdin_payload() {
            let mut stdin = child
                .stdin
                .take()
                .context("child stdin was not captured")?;
            stdin
                .write_all(payload.as_bytes())
                .await
                .with_context(|| format!("failed to write stdin for {}", spec))?;
            drop(stdin);
        }

        let output = child
            .wait_with_output()
            .await
            .with_context(|| format!("failed to wait for {}", spec))?;

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
