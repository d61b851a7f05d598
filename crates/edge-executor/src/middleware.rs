//! Interception stages.
//!
//! A middleware contributes up to four hooks. Missing stages are skipped.
//! `before` and `before_network` run in registration order; `after_network`
//! and `after` run in reverse, so the first registered middleware wraps all
//! the others.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use edge_core::{Outcome, Request};

use crate::compile::RouteConfig;
use crate::context::ExecutionContext;
use crate::strategy::Strategy;

/// What a `before` hook hands on to the rest of the pipeline.
///
/// Carries the (possibly replaced) request and, optionally, the strategy to
/// use for this dispatch instead of the route's own.
pub struct Directive {
    pub request: Request,
    pub strategy: Option<Arc<dyn Strategy>>,
}

impl Directive {
    /// Continue with the route's strategy.
    pub fn proceed(request: Request) -> Self {
        Self {
            request,
            strategy: None,
        }
    }

    /// Serve this dispatch with another strategy.
    pub fn use_strategy(request: Request, strategy: Arc<dyn Strategy>) -> Self {
        Self {
            request,
            strategy: Some(strategy),
        }
    }
}

impl From<Request> for Directive {
    fn from(request: Request) -> Self {
        Self::proceed(request)
    }
}

impl fmt::Debug for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Directive")
            .field("request", &self.request)
            .field("strategy", &self.strategy.as_ref().map(|s| s.name()))
            .finish()
    }
}

/// Runs before strategy selection.
#[async_trait]
pub trait BeforeHook: Send + Sync {
    async fn before(
        &self,
        request: Request,
        ctx: &ExecutionContext,
        route: &RouteConfig,
    ) -> Directive;
}

/// Runs inside network-backed strategies, just before the fetch.
#[async_trait]
pub trait BeforeNetworkHook: Send + Sync {
    async fn before_network(
        &self,
        request: Request,
        ctx: &ExecutionContext,
        route: &RouteConfig,
    ) -> Request;
}

/// Runs inside network-backed strategies on the fetch outcome.
#[async_trait]
pub trait AfterNetworkHook: Send + Sync {
    async fn after_network(
        &self,
        request: &Request,
        outcome: Outcome,
        ctx: &ExecutionContext,
        route: &RouteConfig,
    ) -> Outcome;
}

/// Runs on the strategy outcome. May recover a failure or replace a response.
#[async_trait]
pub trait AfterHook: Send + Sync {
    async fn after(
        &self,
        request: &Request,
        outcome: Outcome,
        ctx: &ExecutionContext,
        route: &RouteConfig,
    ) -> Outcome;
}

/// A named bundle of optional stage hooks.
///
/// # Example
///
/// ```ignore
/// let logger = Arc::new(Logger::default());
/// let middleware = Middleware::new("logger")
///     .with_before(logger.clone())
///     .with_after(logger);
/// ```
#[derive(Clone, Default)]
pub struct Middleware {
    name: String,
    before: Option<Arc<dyn BeforeHook>>,
    before_network: Option<Arc<dyn BeforeNetworkHook>>,
    after_network: Option<Arc<dyn AfterNetworkHook>>,
    after: Option<Arc<dyn AfterHook>>,
}

impl Middleware {
    /// Create a middleware with no hooks.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Create a middleware from a value implementing every stage.
    pub fn all_stages<H>(name: impl Into<String>, hooks: Arc<H>) -> Self
    where
        H: BeforeHook + BeforeNetworkHook + AfterNetworkHook + AfterHook + 'static,
    {
        Self::new(name)
            .with_before(hooks.clone())
            .with_before_network(hooks.clone())
            .with_after_network(hooks.clone())
            .with_after(hooks)
    }

    pub fn with_before(mut self, hook: Arc<dyn BeforeHook>) -> Self {
        self.before = Some(hook);
        self
    }

    pub fn with_before_network(mut self, hook: Arc<dyn BeforeNetworkHook>) -> Self {
        self.before_network = Some(hook);
        self
    }

    pub fn with_after_network(mut self, hook: Arc<dyn AfterNetworkHook>) -> Self {
        self.after_network = Some(hook);
        self
    }

    pub fn with_after(mut self, hook: Arc<dyn AfterHook>) -> Self {
        self.after = Some(hook);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn before(&self) -> Option<&Arc<dyn BeforeHook>> {
        self.before.as_ref()
    }

    pub fn before_network(&self) -> Option<&Arc<dyn BeforeNetworkHook>> {
        self.before_network.as_ref()
    }

    pub fn after_network(&self) -> Option<&Arc<dyn AfterNetworkHook>> {
        self.after_network.as_ref()
    }

    pub fn after(&self) -> Option<&Arc<dyn AfterHook>> {
        self.after.as_ref()
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Middleware")
            .field("name", &self.name)
            .field("before", &self.before.is_some())
            .field("before_network", &self.before_network.is_some())
            .field("after_network", &self.after_network.is_some())
            .field("after", &self.after.is_some())
            .finish()
    }
}

/// Stage hook lists flattened from a middleware list.
#[derive(Clone, Default)]
pub struct Stages {
    pub before: Vec<Arc<dyn BeforeHook>>,
    pub before_network: Vec<Arc<dyn BeforeNetworkHook>>,
    pub after_network: Vec<Arc<dyn AfterNetworkHook>>,
    pub after: Vec<Arc<dyn AfterHook>>,
}

impl Stages {
    /// Flatten middlewares into per-stage lists.
    ///
    /// Middlewares without a given stage are dropped from that list. The
    /// two after-lists are reversed.
    pub fn flatten(middlewares: &[Middleware]) -> Self {
        let before = middlewares.iter().filter_map(|m| m.before().cloned()).collect();
        let before_network = middlewares
            .iter()
            .filter_map(|m| m.before_network().cloned())
            .collect();
        let after_network = middlewares
            .iter()
            .rev()
            .filter_map(|m| m.after_network().cloned())
            .collect();
        let after = middlewares
            .iter()
            .rev()
            .filter_map(|m| m.after().cloned())
            .collect();

        Self {
            before,
            before_network,
            after_network,
            after,
        }
    }
}

impl fmt::Debug for Stages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stages")
            .field("before", &self.before.len())
            .field("before_network", &self.before_network.len())
            .field("after_network", &self.after_network.len())
            .field("after", &self.after.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    #[async_trait]
    impl BeforeHook for Noop {
        async fn before(
            &self,
            request: Request,
            _ctx: &ExecutionContext,
            _route: &RouteConfig,
        ) -> Directive {
            request.into()
        }
    }

    #[async_trait]
    impl AfterHook for Noop {
        async fn after(
            &self,
            _request: &Request,
            outcome: Outcome,
            _ctx: &ExecutionContext,
            _route: &RouteConfig,
        ) -> Outcome {
            outcome
        }
    }

    #[test]
    fn test_flatten_skips_missing_stages() {
        let hook = Arc::new(Noop);
        let middlewares = vec![
            Middleware::new("a").with_before(hook.clone()),
            Middleware::new("b").with_after(hook.clone()),
            Middleware::new("c")
                .with_before(hook.clone())
                .with_after(hook),
        ];

        let stages = Stages::flatten(&middlewares);
        assert_eq!(stages.before.len(), 2);
        assert!(stages.before_network.is_empty());
        assert!(stages.after_network.is_empty());
        assert_eq!(stages.after.len(), 2);
    }

    #[test]
    fn test_debug_lists_stages() {
        let middleware = Middleware::new("noop").with_before(Arc::new(Noop));
        let debug = format!("{:?}", middleware);
        assert!(debug.contains("noop"));
        assert!(debug.contains("before: true"));
    }
}
