//! Single request command.

use std::time::Instant;

use anyhow::{bail, Context as _, Result};
use edge_core::{Method, Request, Response};
use serde::Serialize;
use tracing::debug;

use super::runtime::{parse_url, worker};
use super::FetchArgs;
use crate::context::Context;
use crate::output::{format_bytes, format_millis, status_badge};

#[derive(Debug, Serialize)]
struct FetchReport {
    url: String,
    route: String,
    strategy: String,
    status: u16,
    headers: Vec<(String, String)>,
    body: Option<String>,
    elapsed_ms: u128,
    cached_in: Vec<String>,
}

/// Run the fetch command.
pub async fn run(args: FetchArgs, ctx: &Context) -> Result<()> {
    let url = parse_url(&args.url)?;
    let method = Method::from_bytes(args.method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("Invalid method: {}", args.method))?;
    let scope = url.join("/").context("URL cannot be a base")?;
    let worker = worker(ctx, scope, args.timeout)?;

    if args.install {
        let warmed = worker.install().await.context("Precache failed")?;
        ctx.output.debug(&format!("Warmed {} precache route(s)", warmed));
    }

    let request = Request::new(method, url);
    let route = worker.config().route_for(&request);
    let route_pattern = route.path_pattern().as_str().to_string();
    let strategy = route.strategy().name().to_string();
    debug!(pattern = %route_pattern, strategy = %strategy, "route selected");

    let started = Instant::now();
    let fetched = worker.fetch(request.clone()).await;
    let pending = fetched.deferred.len();
    let response = match fetched.settle().await {
        Ok(response) => response,
        Err(failure) => bail!("{} {} failed: {}", request.method(), request.url(), failure),
    };
    ctx.output.debug(&format!("Settled {} deferred task(s)", pending));

    let (status, headers, body) = describe(response, args.no_body).await?;
    let elapsed_ms = started.elapsed().as_millis();

    let mut cached_in = worker.store().keys().await.context("Failed to list cache")?;
    cached_in.sort();

    let report = FetchReport {
        url: request.url().to_string(),
        route: route_pattern,
        strategy,
        status,
        headers,
        body,
        elapsed_ms,
        cached_in,
    };

    if ctx.output.is_json() {
        ctx.output.json(&report);
        return Ok(());
    }

    print_report(&report, &args, ctx);
    Ok(())
}

async fn describe(
    response: Response,
    skip_body: bool,
) -> Result<(u16, Vec<(String, String)>, Option<String>)> {
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();

    let body = if skip_body {
        None
    } else {
        let bytes = response.bytes().await.context("Failed to read body")?;
        Some(String::from_utf8_lossy(&bytes).into_owned())
    };

    Ok((status, headers, body))
}

fn print_report(report: &FetchReport, args: &FetchArgs, ctx: &Context) {
    let status = edge_core::StatusCode::from_u16(report.status)
        .map(status_badge)
        .unwrap_or_else(|_| report.status.to_string());

    ctx.output.header(&report.url);
    ctx.output.kv("Status", &status);
    ctx.output
        .kv("Route", &format!("{} ({})", report.route, report.strategy));
    ctx.output.kv("Time", &format_millis(report.elapsed_ms));
    if let Some(body) = &report.body {
        ctx.output.kv("Size", &format_bytes(body.len() as u64));
    }
    if !report.cached_in.is_empty() {
        ctx.output.kv("Cached in", &report.cached_in.join(", "));
    }

    if args.include {
        ctx.output.header("Headers");
        for (name, value) in &report.headers {
            ctx.output.kv(name, value);
        }
    }

    if let Some(body) = &report.body {
        ctx.output.raw("");
        ctx.output.raw(body);
    }
}
