//! Programmatic configuration.
//!
//! A [`Config`] describes the default route, per-route overrides, the
//! precache block and the activate block. Unset route fields are inherited
//! from the enclosing configuration when compiled.

use std::sync::Arc;

use edge_core::Method;

use crate::lifecycle::{JsonManifest, ManifestExtractor, Notifier};
use crate::middleware::Middleware;
use crate::strategy::{NetworkOnly, Strategy};

pub const DEFAULT_CACHE_PREFIX: &str = "sw-";
pub const DEFAULT_CACHE_NAME: &str = "default";
pub const DEFAULT_PATH_PATTERN: &str = ".*$";

/// Top-level configuration.
///
/// # Example
///
/// ```ignore
/// let config = Config::new()
///     .with_precache(Precache::new().with_path("/offline.html"))
///     .with_route(
///         Route::pattern("articles/.*$")
///             .with_methods([Method::GET])
///             .with_cache_name("articles")
///             .with_strategy(StaleWhileRevalidate),
///     );
/// let compiled = compile(config)?;
/// ```
#[derive(Clone, Debug)]
pub struct Config {
    pub(crate) cache_prefix: String,
    pub(crate) cache_name: String,
    pub(crate) methods: Vec<Method>,
    pub(crate) path_pattern: String,
    pub(crate) strategy: Arc<dyn Strategy>,
    pub(crate) middlewares: Vec<Middleware>,
    pub(crate) precache: Precache,
    pub(crate) activate: Activate,
    pub(crate) routes: Vec<Route>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_prefix: DEFAULT_CACHE_PREFIX.to_string(),
            cache_name: DEFAULT_CACHE_NAME.to_string(),
            methods: Vec::new(),
            path_pattern: DEFAULT_PATH_PATTERN.to_string(),
            strategy: Arc::new(NetworkOnly),
            middlewares: Vec::new(),
            precache: Precache::default(),
            activate: Activate::default(),
            routes: Vec::new(),
        }
    }
}

impl Config {
    /// Create a configuration with the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.cache_prefix = prefix.into();
        self
    }

    pub fn with_cache_name(mut self, name: impl Into<String>) -> Self {
        self.cache_name = name.into();
        self
    }

    pub fn with_methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.methods = methods.into_iter().collect();
        self
    }

    pub fn with_path_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.path_pattern = pattern.into();
        self
    }

    pub fn with_strategy(self, strategy: impl Strategy + 'static) -> Self {
        self.with_shared_strategy(Arc::new(strategy))
    }

    pub fn with_shared_strategy(mut self, strategy: Arc<dyn Strategy>) -> Self {
        self.strategy = strategy;
        self
    }

    /// Append a middleware. Registration order decides stage order.
    pub fn with_middleware(mut self, middleware: Middleware) -> Self {
        self.middlewares.push(middleware);
        self
    }

    pub fn with_precache(mut self, precache: Precache) -> Self {
        self.precache = precache;
        self
    }

    pub fn with_activate(mut self, activate: Activate) -> Self {
        self.activate = activate;
        self
    }

    /// Append a route. Routes are matched in the order they are added.
    pub fn with_route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }
}

/// Per-route overrides. Every unset field is inherited.
#[derive(Clone, Debug, Default)]
pub struct Route {
    pub(crate) methods: Option<Vec<Method>>,
    pub(crate) path_pattern: Option<String>,
    pub(crate) path: Option<String>,
    pub(crate) strategy: Option<Arc<dyn Strategy>>,
    pub(crate) cache_prefix: Option<String>,
    pub(crate) cache_name: Option<String>,
    pub(crate) middlewares: Option<Vec<Middleware>>,
}

impl Route {
    /// A route matched by a pattern tested against the absolute URL.
    pub fn pattern(pattern: impl Into<String>) -> Self {
        Self {
            path_pattern: Some(pattern.into()),
            ..Self::default()
        }
    }

    /// A route identified by a path, as used by precache and partition
    /// routes.
    pub fn path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn with_path_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.path_pattern = Some(pattern.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.methods = Some(methods.into_iter().collect());
        self
    }

    pub fn with_strategy(self, strategy: impl Strategy + 'static) -> Self {
        self.with_shared_strategy(Arc::new(strategy))
    }

    pub fn with_shared_strategy(mut self, strategy: Arc<dyn Strategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn with_cache_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.cache_prefix = Some(prefix.into());
        self
    }

    pub fn with_cache_name(mut self, name: impl Into<String>) -> Self {
        self.cache_name = Some(name.into());
        self
    }

    /// Append a middleware. A route with its own middlewares does not
    /// inherit the parent's.
    pub fn with_middleware(mut self, middleware: Middleware) -> Self {
        self.middlewares.get_or_insert_with(Vec::new).push(middleware);
        self
    }

    /// Replace the middleware list, e.g. with an empty one.
    pub fn with_middlewares(mut self, middlewares: Vec<Middleware>) -> Self {
        self.middlewares = Some(middlewares);
        self
    }
}

/// Where the precache routes come from.
#[derive(Clone, Debug)]
pub enum PrecacheRoutes {
    /// Routes listed in the configuration.
    Routes(Vec<Route>),
    /// A manifest fetched at install time and turned into paths.
    Manifest {
        url: String,
        extractor: Arc<dyn ManifestExtractor>,
    },
}

impl Default for PrecacheRoutes {
    fn default() -> Self {
        Self::Routes(Vec::new())
    }
}

/// Install-time configuration.
///
/// Defaults to no routes, the `network-first` strategy, and the parent's
/// cache name and middlewares.
#[derive(Clone, Debug, Default)]
pub struct Precache {
    pub(crate) routes: PrecacheRoutes,
    pub(crate) strategy: Option<Arc<dyn Strategy>>,
    pub(crate) cache_name: Option<String>,
    pub(crate) middlewares: Option<Vec<Middleware>>,
    pub(crate) event_type: Option<String>,
    pub(crate) notifier: Option<Arc<dyn Notifier>>,
}

impl Precache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Precache one path.
    pub fn with_path(self, path: impl Into<String>) -> Self {
        self.with_route(Route::path(path))
    }

    /// Precache a route with its own overrides.
    pub fn with_route(mut self, route: Route) -> Self {
        match &mut self.routes {
            PrecacheRoutes::Routes(routes) => routes.push(route),
            PrecacheRoutes::Manifest { .. } => self.routes = PrecacheRoutes::Routes(vec![route]),
        }
        self
    }

    /// Read the paths from a JSON manifest fetched at install time.
    pub fn with_manifest(self, url: impl Into<String>) -> Self {
        self.with_manifest_extractor(url, Arc::new(JsonManifest))
    }

    /// Read the paths from a manifest with a custom extractor.
    pub fn with_manifest_extractor(
        mut self,
        url: impl Into<String>,
        extractor: Arc<dyn ManifestExtractor>,
    ) -> Self {
        self.routes = PrecacheRoutes::Manifest {
            url: url.into(),
            extractor,
        };
        self
    }

    pub fn with_strategy(self, strategy: impl Strategy + 'static) -> Self {
        self.with_shared_strategy(Arc::new(strategy))
    }

    pub fn with_shared_strategy(mut self, strategy: Arc<dyn Strategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn with_cache_name(mut self, name: impl Into<String>) -> Self {
        self.cache_name = Some(name.into());
        self
    }

    pub fn with_middlewares(mut self, middlewares: Vec<Middleware>) -> Self {
        self.middlewares = Some(middlewares);
        self
    }

    /// Notify with this type once install completes.
    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }
}

/// Activation-time configuration.
#[derive(Clone, Debug, Default)]
pub struct Activate {
    pub(crate) event_type: Option<String>,
    pub(crate) notifier: Option<Arc<dyn Notifier>>,
}

impl Activate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notify with this type once activation completes.
    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn event_type(&self) -> Option<&str> {
        self.event_type.as_deref()
    }

    pub fn notifier(&self) -> Option<&Arc<dyn Notifier>> {
        self.notifier.as_ref()
    }
}
