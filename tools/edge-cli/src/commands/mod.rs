//! CLI command implementations.

pub mod check;
pub mod fetch;
pub mod install;
pub mod routes;

use clap::Args;

/// Arguments for the check command.
#[derive(Args)]
pub struct CheckArgs {}

/// Arguments for the routes command.
#[derive(Args)]
pub struct RoutesArgs {
    /// Also list the precache routes.
    #[arg(long)]
    pub precache: bool,
}

/// Arguments for the fetch command.
#[derive(Args)]
pub struct FetchArgs {
    /// Absolute URL to request.
    pub url: String,

    /// HTTP method.
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,

    /// Total network timeout in seconds.
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// Warm the precache routes before the request.
    #[arg(long)]
    pub install: bool,

    /// Print the response headers.
    #[arg(short = 'i', long)]
    pub include: bool,

    /// Skip printing the body.
    #[arg(long)]
    pub no_body: bool,
}

/// Arguments for the install command.
#[derive(Args)]
pub struct InstallArgs {
    /// Origin the precache paths are resolved against.
    pub scope: String,

    /// Total network timeout in seconds.
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// Run activation after a successful install.
    #[arg(long)]
    pub activate: bool,
}

/// Shared helpers for commands that talk to an origin.
pub(crate) mod runtime {
    use std::sync::Arc;
    use std::time::Duration;

    use anyhow::{Context as _, Result};
    use edge_cache::CacheStore;
    use edge_core::Url;
    use edge_data::{HttpNetwork, TimeoutConfig};
    use edge_executor::Worker;

    use crate::context::Context;

    /// Build a worker over an in-memory store and the HTTP client.
    pub fn worker(ctx: &Context, scope: Url, timeout_secs: u64) -> Result<Worker> {
        let config = ctx.compiled()?;
        let timeouts = TimeoutConfig::from_total(Duration::from_secs(timeout_secs));
        let network = HttpNetwork::with_timeouts(&timeouts).context("Failed to build HTTP client")?;

        Ok(Worker::new(
            config,
            Arc::new(CacheStore::in_memory()),
            Arc::new(network),
            scope,
        ))
    }

    /// Parse an absolute URL argument.
    pub fn parse_url(value: &str) -> Result<Url> {
        Url::parse(value).with_context(|| format!("Invalid URL: {}", value))
    }
}
