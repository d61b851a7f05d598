//! The four-stage interception pipeline.

use std::sync::Arc;

use edge_core::{Outcome, Request};
use edge_observability::{inline_span, request_span};
use tracing::{debug, Instrument};

use crate::compile::RouteConfig;
use crate::context::{DeferredWork, ExecutionContext};

/// Run `before`, the strategy, then `after` for one request.
///
/// Stages run strictly in sequence. `before` hooks each receive the request
/// returned by the previous one and may pick a strategy for this dispatch;
/// the last pick wins and is consulted once, right before the strategy is
/// invoked. `after` hooks each receive the outcome left by the previous
/// one. Deferred work is registered on `ctx`.
pub async fn dispatch(request: Request, ctx: &ExecutionContext, route: &Arc<RouteConfig>) -> Outcome {
    let span = request_span(ctx.request_id(), &request);
    run_stages(request, ctx, route).instrument(span).await
}

/// Nested dispatch with its own deferred work list.
///
/// Runs the same stages as [`dispatch`] but registers deferred work on a
/// fresh list that is returned to the caller to merge.
pub async fn dispatch_inline(
    request: Request,
    ctx: &ExecutionContext,
    route: &Arc<RouteConfig>,
) -> (Outcome, DeferredWork) {
    let child = ctx.child();
    let span = inline_span(&request);
    let outcome = run_stages(request, &child, route).instrument(span).await;
    (outcome, child.deferred().clone())
}

async fn run_stages(mut request: Request, ctx: &ExecutionContext, route: &Arc<RouteConfig>) -> Outcome {
    let mut chosen = None;
    for hook in &route.stages().before {
        let directive = hook.before(request, ctx, route).await;
        request = directive.request;
        if directive.strategy.is_some() {
            chosen = directive.strategy;
        }
    }

    let strategy = chosen.unwrap_or_else(|| Arc::clone(route.strategy()));
    debug!(strategy = strategy.name(), cache_key = %route.cache_key(), "invoking strategy");
    let mut outcome = strategy.handle(&request, ctx, route).await;

    for hook in &route.stages().after {
        outcome = hook.after(&request, outcome, ctx, route).await;
    }

    match &outcome {
        Ok(response) => debug!(status = %response.status(), "dispatch resolved"),
        Err(failure) => debug!(error = %failure, "dispatch failed"),
    }
    outcome
}
