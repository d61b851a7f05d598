//! Streaming composition of sub-route dispatches.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use edge_core::{Failure, Outcome, Request, Response, StatusCode, Url};
use edge_streaming::{compose, Composition};
use futures::channel::oneshot;
use futures::FutureExt;
use tracing::{debug, warn};

use super::Strategy;
use crate::compile::{CompiledConfig, RouteConfig};
use crate::context::ExecutionContext;
use crate::pipeline::dispatch_inline;

/// Derives the sub-request for one sub-route.
///
/// Called with the incoming request, the matched (parent) route and the
/// sub-route.
pub type RequestMaker =
    Arc<dyn Fn(&Request, &RouteConfig, &RouteConfig) -> Result<Request, Failure> + Send + Sync>;

/// Dispatch every sub-route and stream their bodies in configured order.
///
/// Sub-dispatches start concurrently. Headers come from the first
/// sub-response (in list order) that resolves to a response. The deferred
/// work of every sub-dispatch, and the consumption of the composed body,
/// become deferred work of the enclosing dispatch.
#[derive(Clone)]
pub struct Partition {
    routes: Vec<Arc<RouteConfig>>,
    make_request: Option<RequestMaker>,
}

impl Partition {
    /// Send the incoming request unchanged to every route of `config`.
    pub fn new(config: &CompiledConfig) -> Self {
        Self {
            routes: config.routes().to_vec(),
            make_request: None,
        }
    }

    /// Derive sub-request URLs by substituting each sub-route's `path` into
    /// the request URL, see [`html_request`].
    pub fn html(config: &CompiledConfig) -> Self {
        Self::new(config).with_request_maker(Arc::new(html_request))
    }

    /// Use a custom sub-request derivation.
    pub fn with_request_maker(mut self, make_request: RequestMaker) -> Self {
        self.make_request = Some(make_request);
        self
    }

    /// The sub-routes, in composition order.
    pub fn routes(&self) -> &[Arc<RouteConfig>] {
        &self.routes
    }

    fn sub_request(
        &self,
        request: &Request,
        parent: &RouteConfig,
        sub: &RouteConfig,
    ) -> Result<Request, Failure> {
        match &self.make_request {
            Some(make) => make(request, parent, sub),
            None => Ok(request.clone()),
        }
    }
}

impl fmt::Debug for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Partition")
            .field("routes", &self.routes.len())
            .field("make_request", &self.make_request.is_some())
            .finish()
    }
}

#[async_trait]
impl Strategy for Partition {
    fn name(&self) -> &str {
        "partition"
    }

    async fn handle(
        &self,
        request: &Request,
        ctx: &ExecutionContext,
        route: &Arc<RouteConfig>,
    ) -> Outcome {
        let requests = self
            .routes
            .iter()
            .map(|sub| self.sub_request(request, route, sub))
            .collect::<Result<Vec<_>, _>>()?;

        let mut tasks = Vec::with_capacity(requests.len());
        let mut parts = Vec::with_capacity(requests.len());
        for (sub_request, sub) in requests.into_iter().zip(&self.routes) {
            let (tx, rx) = oneshot::channel();
            let sub_ctx = ctx.clone();
            let sub = Arc::clone(sub);
            tasks.push(tokio::spawn(async move {
                let (outcome, deferred) = dispatch_inline(sub_request, &sub_ctx, &sub).await;
                let _ = tx.send(outcome);
                deferred
            }));
            parts.push(rx.map(|received| {
                received.unwrap_or_else(|_| Err(Failure::Stream("sub-dispatch was cancelled".into())))
            }));
        }
        debug!(parts = parts.len(), "partition dispatched");

        let Composition {
            headers,
            body,
            completion,
        } = compose(parts).await;

        ctx.wait_until(async move {
            completion.await;
            for task in tasks {
                match task.await {
                    Ok(deferred) => deferred.settle().await,
                    Err(err) => warn!(error = %err, "sub-dispatch task failed"),
                }
            }
        });

        Ok(Response::new(StatusCode::OK)
            .with_headers(headers)
            .with_body(body)
            .with_date())
    }
}

/// Sub-request whose URL is the request URL, without fragment, with the
/// first match of the parent route's pattern replaced by the sub-route's
/// `path`.
///
/// `path` may reference capture groups of the parent pattern (`$1`).
pub fn html_request(
    request: &Request,
    parent: &RouteConfig,
    sub: &RouteConfig,
) -> Result<Request, Failure> {
    let path = sub
        .path()
        .ok_or_else(|| Failure::rejected("partition route has no path"))?;
    let base = request.url_without_fragment();
    let replaced = parent.path_pattern().replace(base.as_str(), path);
    let url = Url::parse(&replaced)
        .map_err(|err| Failure::rejected(format!("invalid partition url {replaced}: {err}")))?;
    Ok(request.clone().with_url(url))
}
