//! Precache warm-up command.

use anyhow::{Context as _, Result};
use serde::Serialize;

use super::runtime::{parse_url, worker};
use super::InstallArgs;
use crate::context::Context;

#[derive(Debug, Serialize)]
struct InstallReport {
    warmed: usize,
    partitions: Vec<String>,
    removed: Vec<String>,
}

/// Run the install command.
pub async fn run(args: InstallArgs, ctx: &Context) -> Result<()> {
    let scope = parse_url(&args.scope)?;
    let worker = worker(ctx, scope, args.timeout)?;

    let warmed = worker.install().await.context("Install failed")?;
    let removed = if args.activate {
        worker.activate().await.context("Activate failed")?
    } else {
        Vec::new()
    };

    let mut partitions = worker.store().keys().await.context("Failed to list cache")?;
    partitions.sort();

    let report = InstallReport {
        warmed,
        partitions,
        removed,
    };

    if ctx.output.is_json() {
        ctx.output.json(&report);
        return Ok(());
    }

    ctx.output
        .success(&format!("Warmed {} precache route(s)", report.warmed));
    for key in &report.partitions {
        ctx.output.list_item(key);
    }
    if args.activate {
        ctx.output
            .info(&format!("Activation removed {} partition(s)", report.removed.len()));
    }

    Ok(())
}
