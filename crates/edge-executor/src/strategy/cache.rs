//! Cache-backed strategies.

use std::sync::Arc;

use async_trait::async_trait;
use edge_cache::headers::is_expired;
use edge_core::{Failure, Outcome, Request, Response};
use tracing::{debug, warn};

use super::fixed::ignore;
use super::network::network_first;
use super::Strategy;
use crate::compile::RouteConfig;
use crate::context::ExecutionContext;

/// Serve from the route's partition only.
///
/// A miss surfaces as [`Failure::CacheMiss`] so `after` stages can recover it.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheOnly;

#[async_trait]
impl Strategy for CacheOnly {
    fn name(&self) -> &str {
        "cache-only"
    }

    async fn handle(
        &self,
        request: &Request,
        ctx: &ExecutionContext,
        route: &Arc<RouteConfig>,
    ) -> Outcome {
        cache_only(request, ctx, route)
            .await
            .ok_or_else(|| Failure::CacheMiss(request.url().to_string()))
    }
}

/// Serve an unexpired cache entry, otherwise [`NetworkFirst`](super::NetworkFirst).
///
/// An expired entry stays in place so `NetworkFirst` can still fall back to
/// it when the network is down.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheFirst;

#[async_trait]
impl Strategy for CacheFirst {
    fn name(&self) -> &str {
        "cache-first"
    }

    async fn handle(
        &self,
        request: &Request,
        ctx: &ExecutionContext,
        route: &Arc<RouteConfig>,
    ) -> Outcome {
        match fresh(request, ctx, route).await {
            Some(cached) => Ok(cached),
            None => network_first(request, ctx, route).await,
        }
    }
}

/// Like [`CacheFirst`] with [`Ignore`](super::Ignore) as the fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheFirstIgnore;

#[async_trait]
impl Strategy for CacheFirstIgnore {
    fn name(&self) -> &str {
        "cache-first-ignore"
    }

    async fn handle(
        &self,
        request: &Request,
        ctx: &ExecutionContext,
        route: &Arc<RouteConfig>,
    ) -> Outcome {
        Ok(fresh(request, ctx, route).await.unwrap_or_else(ignore))
    }
}

/// Serve the cached entry immediately and refresh it in the background.
///
/// Without a cached entry, waits for [`NetworkFirst`](super::NetworkFirst).
#[derive(Debug, Clone, Copy, Default)]
pub struct StaleWhileRevalidate;

#[async_trait]
impl Strategy for StaleWhileRevalidate {
    fn name(&self) -> &str {
        "stale-while-revalidate"
    }

    async fn handle(
        &self,
        request: &Request,
        ctx: &ExecutionContext,
        route: &Arc<RouteConfig>,
    ) -> Outcome {
        let Some(cached) = cache_only(request, ctx, route).await else {
            return network_first(request, ctx, route).await;
        };

        let request = request.clone();
        let bg_ctx = ctx.clone();
        let route = Arc::clone(route);
        ctx.wait_until(async move {
            if let Err(failure) = network_first(&request, &bg_ctx, &route).await {
                debug!(url = %request.url(), error = %failure, "revalidation failed");
            }
        });
        Ok(cached)
    }
}

/// Look up the request in the route's partition.
///
/// Store failures are logged and read as a miss.
pub(crate) async fn cache_only(
    request: &Request,
    ctx: &ExecutionContext,
    route: &RouteConfig,
) -> Option<Response> {
    let key = route.cache_key();
    match ctx.store().lookup(key.as_str(), request.url().as_str()).await {
        Ok(found) => found,
        Err(err) => {
            warn!(partition = %key, url = %request.url(), error = %err, "cache lookup failed");
            None
        }
    }
}

async fn fresh(request: &Request, ctx: &ExecutionContext, route: &RouteConfig) -> Option<Response> {
    let cached = cache_only(request, ctx, route).await?;
    if is_expired(cached.headers()) {
        debug!(url = %request.url(), "cached response expired");
        return None;
    }
    Some(cached)
}
