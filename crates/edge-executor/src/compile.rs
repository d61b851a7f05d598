//! Compilation of a [`Config`] into executable route configurations.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use edge_cache::CacheKey;
use edge_core::{Method, Request};
use regex::Regex;
use tracing::debug;

use crate::config::{Activate, Config, PrecacheRoutes, Route, DEFAULT_PATH_PATTERN};
use crate::error::ConfigError;
use crate::lifecycle::{ManifestExtractor, Notifier};
use crate::middleware::{Middleware, Stages};
use crate::router::find_route;
use crate::strategy::{NetworkFirst, Strategy};

/// The resolved configuration applicable to one request.
///
/// Read-only once compiled. A `before` stage can still pick another
/// strategy for a single dispatch through its [`Directive`](crate::Directive).
pub struct RouteConfig {
    methods: Vec<Method>,
    path_pattern: Regex,
    path: Option<String>,
    strategy: Arc<dyn Strategy>,
    cache_prefix: String,
    cache_name: String,
    cache_key: CacheKey,
    middlewares: Vec<Middleware>,
    stages: Stages,
}

struct RouteParts {
    methods: Vec<Method>,
    path_pattern: Regex,
    path: Option<String>,
    strategy: Arc<dyn Strategy>,
    cache_prefix: String,
    cache_name: String,
    middlewares: Vec<Middleware>,
}

impl RouteConfig {
    fn build(parts: RouteParts) -> Self {
        let cache_key = CacheKey::new(&parts.cache_prefix, &parts.cache_name);
        let stages = Stages::flatten(&parts.middlewares);
        Self {
            methods: parts.methods,
            path_pattern: parts.path_pattern,
            path: parts.path,
            strategy: parts.strategy,
            cache_prefix: parts.cache_prefix,
            cache_name: parts.cache_name,
            cache_key,
            middlewares: parts.middlewares,
            stages,
        }
    }

    /// Compile a route, inheriting every field it leaves unset from `self`.
    ///
    /// A route without a pattern matches its own `path` at the end of the
    /// URL, or every URL when it has no path either.
    pub fn derive(&self, route: &Route) -> Result<Self, ConfigError> {
        let pattern = match (&route.path_pattern, &route.path) {
            (Some(pattern), _) => pattern.clone(),
            (None, Some(path)) => format!("{}$", regex::escape(path)),
            (None, None) => DEFAULT_PATH_PATTERN.to_string(),
        };

        Ok(Self::build(RouteParts {
            methods: route.methods.clone().unwrap_or_else(|| self.methods.clone()),
            path_pattern: compile_pattern(&pattern)?,
            path: route.path.clone(),
            strategy: route
                .strategy
                .clone()
                .unwrap_or_else(|| Arc::clone(&self.strategy)),
            cache_prefix: route
                .cache_prefix
                .clone()
                .unwrap_or_else(|| self.cache_prefix.clone()),
            cache_name: route
                .cache_name
                .clone()
                .unwrap_or_else(|| self.cache_name.clone()),
            middlewares: route
                .middlewares
                .clone()
                .unwrap_or_else(|| self.middlewares.clone()),
        }))
    }

    /// Whether the route applies to a request: its method is listed and its
    /// pattern matches the absolute URL.
    pub fn matches(&self, request: &Request) -> bool {
        self.methods.contains(request.method()) && self.path_pattern.is_match(request.url().as_str())
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn path_pattern(&self) -> &Regex {
        &self.path_pattern
    }

    /// The route's path, for precache and partition routes.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn strategy(&self) -> &Arc<dyn Strategy> {
        &self.strategy
    }

    pub fn cache_prefix(&self) -> &str {
        &self.cache_prefix
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    /// Partition name: prefix followed by cache name.
    pub fn cache_key(&self) -> &CacheKey {
        &self.cache_key
    }

    pub fn middlewares(&self) -> &[Middleware] {
        &self.middlewares
    }

    /// Stage hooks flattened from the middlewares.
    pub fn stages(&self) -> &Stages {
        &self.stages
    }
}

impl fmt::Debug for RouteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteConfig")
            .field("methods", &self.methods)
            .field("path_pattern", &self.path_pattern.as_str())
            .field("path", &self.path)
            .field("strategy", &self.strategy.name())
            .field("cache_key", &self.cache_key)
            .field("stages", &self.stages)
            .finish()
    }
}

/// Where the compiled precache routes come from.
#[derive(Clone, Debug)]
pub enum PrecacheSource {
    Routes(Vec<Arc<RouteConfig>>),
    /// Resolved at install time; extracted paths are compiled against the
    /// precache configuration.
    Manifest {
        url: String,
        extractor: Arc<dyn ManifestExtractor>,
    },
}

/// The compiled precache block.
#[derive(Debug)]
pub struct CompiledPrecache {
    config: Arc<RouteConfig>,
    source: PrecacheSource,
    event_type: Option<String>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl CompiledPrecache {
    /// The precache configuration every precache route inherits from.
    pub fn config(&self) -> &Arc<RouteConfig> {
        &self.config
    }

    pub fn source(&self) -> &PrecacheSource {
        &self.source
    }

    pub fn event_type(&self) -> Option<&str> {
        self.event_type.as_deref()
    }

    pub fn notifier(&self) -> Option<&Arc<dyn Notifier>> {
        self.notifier.as_ref()
    }

    /// Compile a precache route for a path found in a manifest.
    pub fn route_for_path(&self, path: &str) -> Result<RouteConfig, ConfigError> {
        self.config.derive(&Route::path(path))
    }
}

/// An executable configuration.
#[derive(Debug)]
pub struct CompiledConfig {
    root: Arc<RouteConfig>,
    routes: Vec<Arc<RouteConfig>>,
    precache: CompiledPrecache,
    activate: Activate,
}

impl CompiledConfig {
    /// The top-level configuration, used when no route matches.
    pub fn root(&self) -> &Arc<RouteConfig> {
        &self.root
    }

    /// Routes in configured order.
    pub fn routes(&self) -> &[Arc<RouteConfig>] {
        &self.routes
    }

    pub fn precache(&self) -> &CompiledPrecache {
        &self.precache
    }

    pub fn activate(&self) -> &Activate {
        &self.activate
    }

    /// Select the route for a request, see [`find_route`].
    pub fn route_for(&self, request: &Request) -> &Arc<RouteConfig> {
        find_route(self, request)
    }

    /// Partition names used by this configuration.
    ///
    /// Manifest-derived precache routes share the precache partition.
    pub fn cache_keys(&self) -> HashSet<String> {
        let mut keys = HashSet::new();
        keys.insert(self.root.cache_key().to_string());
        keys.insert(self.precache.config.cache_key().to_string());
        keys.extend(self.routes.iter().map(|r| r.cache_key().to_string()));
        if let PrecacheSource::Routes(routes) = &self.precache.source {
            keys.extend(routes.iter().map(|r| r.cache_key().to_string()));
        }
        keys
    }
}

/// Compile a configuration.
///
/// Routes inherit `cache_prefix`, `cache_name`, `methods`, `strategy` and
/// `middlewares` from the top level. The precache block inherits the cache
/// prefix, cache name and middlewares, defaults to `network-first`, and its
/// routes inherit from it in turn. Fails only on an invalid path pattern.
pub fn compile(config: Config) -> Result<CompiledConfig, ConfigError> {
    let root = Arc::new(RouteConfig::build(RouteParts {
        methods: config.methods,
        path_pattern: compile_pattern(&config.path_pattern)?,
        path: None,
        strategy: config.strategy,
        cache_prefix: config.cache_prefix,
        cache_name: config.cache_name,
        middlewares: config.middlewares,
    }));

    let routes = config
        .routes
        .iter()
        .map(|route| root.derive(route).map(Arc::new))
        .collect::<Result<Vec<_>, _>>()?;

    let precache = config.precache;
    let precache_config = Arc::new(RouteConfig::build(RouteParts {
        methods: vec![Method::GET],
        path_pattern: root.path_pattern.clone(),
        path: None,
        strategy: precache
            .strategy
            .unwrap_or_else(|| Arc::new(NetworkFirst)),
        cache_prefix: root.cache_prefix.clone(),
        cache_name: precache
            .cache_name
            .unwrap_or_else(|| root.cache_name.clone()),
        middlewares: precache
            .middlewares
            .unwrap_or_else(|| root.middlewares.clone()),
    }));

    let source = match precache.routes {
        PrecacheRoutes::Routes(routes) => PrecacheSource::Routes(
            routes
                .iter()
                .map(|route| precache_config.derive(route).map(Arc::new))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        PrecacheRoutes::Manifest { url, extractor } => PrecacheSource::Manifest { url, extractor },
    };

    debug!(
        routes = routes.len(),
        cache_key = %root.cache_key(),
        "compiled configuration"
    );

    Ok(CompiledConfig {
        root,
        routes,
        precache: CompiledPrecache {
            config: precache_config,
            source,
            event_type: precache.event_type,
            notifier: precache.notifier,
        },
        activate: config.activate,
    })
}

fn compile_pattern(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}
