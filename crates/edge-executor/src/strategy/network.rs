//! Network-backed strategies.

use std::sync::Arc;

use async_trait::async_trait;
use edge_cache::headers::{response_max_age, stamp_expires};
use edge_cache::CachedResponse;
use edge_core::{Outcome, Request};
use tracing::{debug, warn};

use super::cache::cache_only;
use super::Strategy;
use crate::compile::RouteConfig;
use crate::context::ExecutionContext;

/// Fetch from the network, wrapped in the `before_network` and
/// `after_network` stages.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkOnly;

#[async_trait]
impl Strategy for NetworkOnly {
    fn name(&self) -> &str {
        "network-only"
    }

    async fn handle(
        &self,
        request: &Request,
        ctx: &ExecutionContext,
        route: &Arc<RouteConfig>,
    ) -> Outcome {
        network_only(request, ctx, route).await
    }
}

/// Network, falling back to the cache when the fetch fails.
///
/// An ok response with a positive `max-age` gets an `Expires` header and is
/// written to the route's partition as deferred work.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkFirst;

#[async_trait]
impl Strategy for NetworkFirst {
    fn name(&self) -> &str {
        "network-first"
    }

    async fn handle(
        &self,
        request: &Request,
        ctx: &ExecutionContext,
        route: &Arc<RouteConfig>,
    ) -> Outcome {
        network_first(request, ctx, route).await
    }
}

pub(crate) async fn network_only(
    request: &Request,
    ctx: &ExecutionContext,
    route: &RouteConfig,
) -> Outcome {
    let mut request = request.clone();
    for hook in &route.stages().before_network {
        request = hook.before_network(request, ctx, route).await;
    }

    let mut outcome = ctx.network().fetch(request.clone()).await;
    if let Err(failure) = &outcome {
        debug!(url = %request.url(), error = %failure, "network fetch failed");
    }

    for hook in &route.stages().after_network {
        outcome = hook.after_network(&request, outcome, ctx, route).await;
    }
    outcome
}

pub(crate) async fn network_first(
    request: &Request,
    ctx: &ExecutionContext,
    route: &Arc<RouteConfig>,
) -> Outcome {
    let response = match network_only(request, ctx, route).await {
        Ok(response) => response,
        Err(failure) => {
            return match cache_only(request, ctx, route).await {
                Some(cached) => {
                    debug!(url = %request.url(), "serving cached response after network failure");
                    Ok(cached)
                }
                None => Err(failure),
            };
        }
    };

    if !response.is_ok() {
        return Ok(response);
    }
    let max_age = response_max_age(&response);
    if max_age == 0 {
        return Ok(response);
    }

    let response = stamp_expires(response.buffered().await?, max_age);
    match CachedResponse::try_from(&response) {
        Ok(entry) => {
            let store = Arc::clone(ctx.store());
            let key = route.cache_key().clone();
            let url = request.url().to_string();
            ctx.wait_until(async move {
                if let Err(err) = store.put_entry(key.as_str(), &url, entry).await {
                    warn!(partition = %key, url, error = %err, "deferred cache write failed");
                }
            });
        }
        Err(err) => warn!(url = %request.url(), error = %err, "response not cacheable"),
    }
    Ok(response)
}
