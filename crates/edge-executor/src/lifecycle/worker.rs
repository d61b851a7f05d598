//! Lifecycle glue around a compiled configuration.

use std::collections::HashMap;
use std::sync::Arc;

use edge_cache::CacheStore;
use edge_core::{Failure, Method, Outcome, Request, Response, Url};
use edge_data::Network;
use futures::future::join_all;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::message::{CacheOverride, Message, MessageHandler, CACHE_OVERRIDE};
use super::notify::{BroadcastNotifier, Notification, Notifier};
use crate::compile::{CompiledConfig, PrecacheSource, RouteConfig};
use crate::context::{DeferredWork, ExecutionContext};
use crate::pipeline::{dispatch, dispatch_inline};

/// The result of [`Worker::fetch`]: the outcome and the work still running
/// on behalf of the request.
#[derive(Debug)]
pub struct Fetched {
    pub outcome: Outcome,
    pub deferred: DeferredWork,
}

impl Fetched {
    /// Buffer the response body, wait for the deferred work, then return
    /// the buffered outcome.
    ///
    /// The body is read first: a composed partition body only finishes its
    /// deferred work once it has been consumed.
    pub async fn settle(self) -> Outcome {
        let outcome = match self.outcome {
            Ok(response) => response.buffered().await,
            Err(failure) => Err(failure),
        };
        self.deferred.settle().await;
        outcome
    }
}

/// Owns the compiled configuration, the store and the network, and exposes
/// the host entry points.
///
/// Relative paths (precache routes, manifest URLs, cache override
/// requests) are resolved against `scope`. Lifecycle notifications go to
/// the block's notifier when configured, otherwise to a broadcast channel
/// available through [`Worker::subscribe`].
pub struct Worker {
    config: Arc<CompiledConfig>,
    store: Arc<CacheStore>,
    network: Arc<dyn Network>,
    scope: Url,
    notifier: BroadcastNotifier,
    handlers: HashMap<String, Arc<dyn MessageHandler>>,
}

impl Worker {
    pub fn new(
        config: CompiledConfig,
        store: Arc<CacheStore>,
        network: Arc<dyn Network>,
        scope: Url,
    ) -> Self {
        let config = Arc::new(config);
        let cache_override: Arc<dyn MessageHandler> = Arc::new(CacheOverride::new(
            Arc::clone(&config),
            Arc::clone(&store),
            scope.clone(),
        ));

        let mut handlers = HashMap::new();
        handlers.insert(CACHE_OVERRIDE.to_string(), cache_override);

        Self {
            config,
            store,
            network,
            scope,
            notifier: BroadcastNotifier::default(),
            handlers,
        }
    }

    /// Register a handler for a message type, replacing any existing one.
    pub fn with_handler(mut self, kind: impl Into<String>, handler: Arc<dyn MessageHandler>) -> Self {
        self.handlers.insert(kind.into(), handler);
        self
    }

    pub fn config(&self) -> &Arc<CompiledConfig> {
        &self.config
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    pub fn scope(&self) -> &Url {
        &self.scope
    }

    /// Receive lifecycle notifications that have no dedicated notifier.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifier.subscribe()
    }

    /// A fresh context for one request.
    pub fn context(&self) -> ExecutionContext {
        ExecutionContext::new(Arc::clone(&self.store), Arc::clone(&self.network))
    }

    /// Resolve a path against the scope.
    pub fn resolve(&self, path: &str) -> Result<Url, Failure> {
        self.scope
            .join(path)
            .map_err(|err| Failure::rejected(format!("invalid url {path}: {err}")))
    }

    /// Warm the precache routes, then notify.
    ///
    /// Every precache route is dispatched concurrently and its deferred work
    /// (the cache writes) awaited. A manifest is fetched through the
    /// precache configuration first. Returns the number of routes warmed;
    /// fails with the first failed route.
    pub async fn install(&self) -> Result<usize, Failure> {
        let ctx = self.context();
        let precache = self.config.precache();

        let routes = match precache.source() {
            PrecacheSource::Routes(routes) => routes.clone(),
            PrecacheSource::Manifest { url, extractor } => {
                let request = Request::new(Method::GET, self.resolve(url)?);
                let (outcome, deferred) = dispatch_inline(request, &ctx, precache.config()).await;
                let paths = extractor.extract(outcome?).await;
                deferred.settle().await;
                let paths = paths?;
                debug!(manifest = %url, paths = paths.len(), "precache manifest extracted");
                paths
                    .iter()
                    .map(|path| precache.route_for_path(path).map(Arc::new))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|err| Failure::rejected(err.to_string()))?
            }
        };

        let warmed = join_all(routes.iter().map(|route| self.warm(&ctx, route))).await;
        let total = warmed.len();
        warmed.into_iter().collect::<Result<Vec<_>, _>>()?;

        info!(routes = total, "precache installed");
        self.notify(precache.event_type(), precache.notifier()).await;
        Ok(total)
    }

    async fn warm(&self, ctx: &ExecutionContext, route: &Arc<RouteConfig>) -> Result<(), Failure> {
        let path = route
            .path()
            .ok_or_else(|| Failure::rejected("precache route has no path"))?;
        let request = Request::new(Method::GET, self.resolve(path)?);
        let (outcome, deferred) = dispatch_inline(request, ctx, route).await;
        let outcome = match outcome {
            Ok(response) => response.bytes().await.map(drop),
            Err(failure) => Err(failure),
        };
        deferred.settle().await;
        if let Err(failure) = &outcome {
            warn!(path, error = %failure, "precache route failed");
        }
        outcome
    }

    /// Delete partitions the configuration no longer uses, then notify.
    /// Returns the deleted partition names.
    pub async fn activate(&self) -> Result<Vec<String>, Failure> {
        let keep = self.config.cache_keys();
        let deleted = self.store.delete_unlisted(&keep).await?;
        info!(deleted = deleted.len(), "activated");

        let activate = self.config.activate();
        self.notify(activate.event_type(), activate.notifier()).await;
        Ok(deleted)
    }

    /// Route and dispatch one request.
    pub async fn fetch(&self, request: Request) -> Fetched {
        let ctx = self.context();
        let route = self.config.route_for(&request);
        let outcome = dispatch(request, &ctx, route).await;
        Fetched {
            outcome,
            deferred: ctx.deferred().clone(),
        }
    }

    /// Hand a message to the handler registered for its type.
    pub async fn message(&self, message: &Message) -> Result<(), Failure> {
        let handler = self
            .handlers
            .get(&message.kind)
            .ok_or_else(|| Failure::rejected(format!("no handler for message type {}", message.kind)))?;
        handler.handle(message).await
    }

    /// Store a response for a request in the partition of its route.
    pub async fn cache_override(&self, request: &Request, response: Response) -> Result<(), Failure> {
        CacheOverride::new(Arc::clone(&self.config), Arc::clone(&self.store), self.scope.clone())
            .put(request, response)
            .await
    }

    async fn notify(&self, event_type: Option<&str>, notifier: Option<&Arc<dyn Notifier>>) {
        let Some(kind) = event_type else {
            return;
        };
        let notification = Notification::new(kind);
        match notifier {
            Some(notifier) => notifier.notify(notification).await,
            None => self.notifier.notify(notification).await,
        }
    }
}
