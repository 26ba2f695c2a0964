//! Shipyard - build/push/deploy pipeline orchestrator
//!
//! Usage:
//!   shipyard pull [ORG]          # sync an organization's repositories
//!   shipyard build [DOCKER_REPO] # rebuild stale images
//!   shipyard push [DOCKER_REPO]  # publish built-but-unpublished images
//!   shipyard deploy [DOCKER_REPO]

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shipyard_core::commands::{self, PipelineContext};
use shipyard_core::config::{split_docker_repo, ShipyardConfig};
use shipyard_core::error::PipelineError;
use shipyard_core::secret::Secret;

#[derive(Parser)]
#[command(name = "shipyard")]
#[command(about = "Build/push/deploy pipeline orchestrator", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file location (default: shipyard.toml found upward from cwd)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Work directory (default: current directory)
    #[arg(long, global = true)]
    workdir: Option<PathBuf>,

    /// Cap on concurrent operations per fan-out
    #[arg(long, global = true)]
    jobs: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync an organization's repositories into the workspace
    Pull {
        /// Hosting-provider organization
        organization: Option<String>,

        /// Only operate on repositories matching this pattern
        #[arg(long)]
        filter: Option<String>,

        /// Hosting-provider API token
        #[arg(long)]
        token: Option<String>,
    },

    /// Rebuild images selected by the build policy
    Build(RegistryArgs),

    /// Publish images that are built locally but not yet in the registry
    Push(RegistryArgs),

    /// Apply every service's manifest, conflict-checked
    Deploy {
        #[command(flatten)]
        registry: RegistryArgs,

        /// Ask the cluster tooling for a dry run instead of mutating state
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Args)]
struct RegistryArgs {
    /// Target registry/repo for images
    docker_repo: Option<String>,

    /// Registry user
    #[arg(long)]
    user: Option<String>,

    /// Registry password
    #[arg(long)]
    password: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shipyard=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        report(&err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = ShipyardConfig::load_or_default(cli.config.as_deref())?;
    let workdir = resolve_workdir(cli.workdir.clone(), &config)?;

    match cli.command {
        Commands::Pull {
            organization,
            filter,
            token,
        } => {
            let org = require(
                organization.or(config.organization.clone()),
                "organization",
            )?;
            let filter = filter
                .or(config.filter.clone())
                .unwrap_or_else(|| "*".to_string());
            let token = token.or(config.token.clone()).map(Secret::new);
            let ctx = PipelineContext::new(workdir)?
                .with_token(token)
                .with_max_concurrency(cli.jobs);
            commands::pull(&ctx, &org, &filter).await
        }
        Commands::Build(args) => {
            let (ctx, registry, repo) = registry_context(args, &config, workdir, cli.jobs)?;
            commands::build(&ctx, &registry, &repo).await?;
            Ok(())
        }
        Commands::Push(args) => {
            let (ctx, registry, repo) = registry_context(args, &config, workdir, cli.jobs)?;
            commands::push(&ctx, &registry, &repo).await?;
            Ok(())
        }
        Commands::Deploy { registry, dry_run } => {
            let (ctx, registry, repo) = registry_context(registry, &config, workdir, cli.jobs)?;
            commands::deploy(&ctx, &registry, &repo, dry_run).await?;
            Ok(())
        }
    }
}

fn registry_context(
    args: RegistryArgs,
    config: &ShipyardConfig,
    workdir: PathBuf,
    jobs: Option<usize>,
) -> Result<(PipelineContext, String, String)> {
    let docker_repo = require(
        args.docker_repo.or(config.docker_repo.clone()),
        "docker-repo",
    )?;
    let (registry, repo) = split_docker_repo(&docker_repo)?;
    let ctx = PipelineContext::new(workdir)?
        .with_basic_auth(
            args.user.or(config.user.clone()),
            args.password.or(config.password.clone()),
        )
        .with_max_concurrency(jobs);
    Ok((ctx, registry, repo))
}

fn resolve_workdir(flag: Option<PathBuf>, config: &ShipyardConfig) -> Result<PathBuf> {
    let workdir = match flag.or(config.workdir.clone()) {
        Some(dir) if dir.is_absolute() => dir,
        Some(dir) => std::env::current_dir()?.join(dir),
        None => std::env::current_dir()?,
    };
    Ok(workdir)
}

fn require(value: Option<String>, name: &str) -> Result<String> {
    value.ok_or_else(|| PipelineError::User(format!("missing argument: {}", name)).into())
}

fn report(err: &anyhow::Error) {
    match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::Conflicts(conflicts)) => {
            eprintln!("deploy blocked by resource conflicts:");
            for conflict in conflicts {
                eprintln!("  {}", conflict);
            }
        }
        _ => eprintln!("error: {:#}", err),
    }
}
