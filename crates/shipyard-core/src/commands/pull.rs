//! `pull`: synchronize an organization's repositories into the workspace.

use std::sync::Arc;

use crate::commands::PipelineContext;
use crate::sync::{RepoHost, RepoSync};

pub async fn pull(ctx: &PipelineContext, org: &str, filter: &str) -> anyhow::Result<()> {
    let host = RepoHost::new(Arc::clone(&ctx.fetcher), ctx.token.clone());
    let mut sync = RepoSync::new(host, Arc::clone(&ctx.runner), ctx.workdir.clone());
    if let Some(limit) = ctx.max_concurrency {
        sync = sync.with_max_concurrency(limit);
    }
    sync.pull(org, filter).await
}
