//! Declarative configuration files.
//!
//! TOML or JSON, chosen by file extension:
//!
//! ```toml
//! cache_prefix = "app-"
//! methods = ["GET"]
//!
//! [precache]
//! routes = ["/", "/offline.html"]
//! event_type = "installed"
//!
//! [[routes]]
//! path_pattern = "/api/"
//! cache_name = "api"
//! strategy = "network-first"
//!
//! [[routes]]
//! path_pattern = "(page)$"
//! strategy = { partition = { html = true, strategy = "network-first", routes = [
//!     { path = "$1.header.html" },
//!     { path = "$1.body.html" },
//! ] } }
//! ```
//!
//! Middlewares are attached programmatically to the resulting [`Config`].

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use edge_core::{Failure, Method, StatusCode};
use serde::Deserialize;

use crate::compile::{compile, CompiledConfig};
use crate::config::{Activate, Config, Precache, Route};
use crate::error::ConfigError;
use crate::lifecycle::header_map;
use crate::strategy::{self, Partition, Static, Strategy};

/// A configuration as written in a file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub cache_prefix: Option<String>,
    pub cache_name: Option<String>,
    pub methods: Option<Vec<String>>,
    pub path_pattern: Option<String>,
    pub strategy: Option<StrategySpec>,
    pub precache: Option<PrecacheFile>,
    pub activate: Option<ActivateFile>,
    pub routes: Vec<RouteFile>,
}

/// A `[[routes]]` entry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RouteFile {
    pub methods: Option<Vec<String>>,
    pub path_pattern: Option<String>,
    pub path: Option<String>,
    pub strategy: Option<StrategySpec>,
    pub cache_prefix: Option<String>,
    pub cache_name: Option<String>,
}

/// The `[precache]` block.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PrecacheFile {
    pub routes: Vec<PrecacheEntry>,
    /// Manifest URL; takes precedence over `routes`.
    pub manifest: Option<String>,
    pub strategy: Option<StrategySpec>,
    pub cache_name: Option<String>,
    pub event_type: Option<String>,
}

/// A precache route: a bare path or a route table.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PrecacheEntry {
    Path(String),
    Route(RouteFile),
}

/// The `[activate]` block.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ActivateFile {
    pub event_type: Option<String>,
}

/// A strategy reference.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StrategySpec {
    /// A built-in strategy by name, e.g. `"stale-while-revalidate"`.
    Named(String),
    /// `{ static = { status, headers, body } }` or `{ static = { failure } }`.
    Static {
        #[serde(rename = "static")]
        fixed: StaticSpec,
    },
    /// `{ partition = { html, routes, ... } }`; the table is a nested
    /// configuration whose routes are the parts.
    Partition { partition: PartitionSpec },
}

#[derive(Debug, Clone, Deserialize)]
pub struct StaticSpec {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: String,
    /// Answer with this failure instead of a response.
    #[serde(default)]
    pub failure: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PartitionSpec {
    /// Substitute each part's `path` into the request URL.
    #[serde(default)]
    pub html: bool,
    #[serde(flatten)]
    pub config: Box<ConfigFile>,
}

impl ConfigFile {
    /// Load a file, parsing it as JSON for `.json` and as TOML otherwise.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let parsed = if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        };
        parsed.map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|err| err.to_string())
    }

    pub fn from_json_str(content: &str) -> Result<Self, String> {
        serde_json::from_str(content).map_err(|err| err.to_string())
    }

    /// Build the programmatic configuration.
    pub fn into_config(self) -> Result<Config, ConfigError> {
        let mut config = Config::new();
        if let Some(prefix) = self.cache_prefix {
            config = config.with_cache_prefix(prefix);
        }
        if let Some(name) = self.cache_name {
            config = config.with_cache_name(name);
        }
        if let Some(methods) = self.methods {
            config = config.with_methods(parse_methods(&methods)?);
        }
        if let Some(pattern) = self.path_pattern {
            config = config.with_path_pattern(pattern);
        }
        if let Some(spec) = self.strategy {
            config = config.with_shared_strategy(spec.build()?);
        }
        if let Some(precache) = self.precache {
            config = config.with_precache(precache.into_precache()?);
        }
        if let Some(activate) = self.activate {
            let mut block = Activate::new();
            if let Some(event_type) = activate.event_type {
                block = block.with_event_type(event_type);
            }
            config = config.with_activate(block);
        }
        for route in self.routes {
            config = config.with_route(route.into_route()?);
        }
        Ok(config)
    }

    /// Build and compile.
    pub fn compile(self) -> Result<CompiledConfig, ConfigError> {
        compile(self.into_config()?)
    }
}

impl RouteFile {
    fn into_route(self) -> Result<Route, ConfigError> {
        let mut route = Route::default();
        if let Some(methods) = self.methods {
            route = route.with_methods(parse_methods(&methods)?);
        }
        if let Some(pattern) = self.path_pattern {
            route = route.with_path_pattern(pattern);
        }
        if let Some(path) = self.path {
            route = route.with_path(path);
        }
        if let Some(spec) = self.strategy {
            route = route.with_shared_strategy(spec.build()?);
        }
        if let Some(prefix) = self.cache_prefix {
            route = route.with_cache_prefix(prefix);
        }
        if let Some(name) = self.cache_name {
            route = route.with_cache_name(name);
        }
        Ok(route)
    }
}

impl PrecacheFile {
    fn into_precache(self) -> Result<Precache, ConfigError> {
        let mut precache = Precache::new();
        match self.manifest {
            Some(url) => precache = precache.with_manifest(url),
            None => {
                for entry in self.routes {
                    precache = match entry {
                        PrecacheEntry::Path(path) => precache.with_path(path),
                        PrecacheEntry::Route(route) => precache.with_route(route.into_route()?),
                    };
                }
            }
        }
        if let Some(spec) = self.strategy {
            precache = precache.with_shared_strategy(spec.build()?);
        }
        if let Some(name) = self.cache_name {
            precache = precache.with_cache_name(name);
        }
        if let Some(event_type) = self.event_type {
            precache = precache.with_event_type(event_type);
        }
        Ok(precache)
    }
}

impl StrategySpec {
    /// Resolve into a strategy, compiling nested partition configurations.
    pub fn build(self) -> Result<Arc<dyn Strategy>, ConfigError> {
        match self {
            Self::Named(name) => strategy::named(&name).ok_or(ConfigError::UnknownStrategy(name)),
            Self::Static { fixed } => Ok(Arc::new(fixed.build()?)),
            Self::Partition { partition } => {
                let compiled = partition.config.compile()?;
                let strategy = if partition.html {
                    Partition::html(&compiled)
                } else {
                    Partition::new(&compiled)
                };
                Ok(Arc::new(strategy))
            }
        }
    }
}

impl StaticSpec {
    fn build(self) -> Result<Static, ConfigError> {
        if let Some(message) = self.failure {
            return Ok(Static::failure(Failure::rejected(message)));
        }
        let code = self.status.unwrap_or(200);
        let status = StatusCode::from_u16(code)
            .map_err(|_| ConfigError::InvalidStatic(format!("status {code}")))?;
        let headers =
            header_map(&self.headers).map_err(|err| ConfigError::InvalidStatic(err.to_string()))?;
        Ok(Static::response(status, headers, self.body))
    }
}

fn parse_methods(methods: &[String]) -> Result<Vec<Method>, ConfigError> {
    methods
        .iter()
        .map(|m| {
            Method::from_bytes(m.to_ascii_uppercase().as_bytes())
                .map_err(|_| ConfigError::InvalidMethod(m.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::PrecacheSource;

    const TOML: &str = r#"
cache_prefix = "app-"
methods = ["get"]

[precache]
routes = ["/", { path = "/offline.html", cache_name = "offline" }]
event_type = "installed"

[activate]
event_type = "activated"

[[routes]]
path_pattern = "/api/"
cache_name = "api"
strategy = "network-first"

[[routes]]
path_pattern = "/fixed$"
strategy = { static = { status = 201, body = "fixed", headers = { "content-type" = "text/plain" } } }

[[routes]]
path_pattern = "(page)$"
cache_name = "pages"

[routes.strategy.partition]
html = true
strategy = "cache-first"
routes = [{ path = "$1.header.html" }, { path = "$1.body.html" }]
"#;

    #[test]
    fn test_toml_round_trip_to_compiled() {
        let compiled = ConfigFile::from_toml_str(TOML).unwrap().compile().unwrap();

        assert_eq!(compiled.root().cache_key().as_str(), "app-default");
        assert_eq!(compiled.root().methods(), &[Method::GET]);
        assert_eq!(compiled.activate().event_type(), Some("activated"));

        let routes = compiled.routes();
        assert_eq!(routes.len(), 3);
        assert_eq!(routes[0].strategy().name(), "network-first");
        assert_eq!(routes[0].cache_key().as_str(), "app-api");
        assert_eq!(routes[1].strategy().name(), "static");
        assert_eq!(routes[2].strategy().name(), "partition");

        let precache = compiled.precache();
        assert_eq!(precache.event_type(), Some("installed"));
        let PrecacheSource::Routes(routes) = precache.source() else {
            panic!("expected literal routes");
        };
        assert_eq!(routes[0].cache_key().as_str(), "app-default");
        assert_eq!(routes[1].cache_key().as_str(), "app-offline");
    }

    #[test]
    fn test_json_manifest() {
        let file = ConfigFile::from_json_str(
            r#"{"precache": {"manifest": "/precache.json"}, "strategy": "cache-only"}"#,
        )
        .unwrap();
        let compiled = file.compile().unwrap();

        assert_eq!(compiled.root().strategy().name(), "cache-only");
        assert!(matches!(
            compiled.precache().source(),
            PrecacheSource::Manifest { url, .. } if url == "/precache.json"
        ));
    }

    #[test]
    fn test_unknown_strategy() {
        let err = ConfigFile::from_toml_str(r#"strategy = "fastest""#)
            .unwrap()
            .compile()
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownStrategy(name) if name == "fastest"));
    }

    #[test]
    fn test_invalid_method() {
        let err = ConfigFile::from_toml_str(r#"methods = ["GE T"]"#)
            .unwrap()
            .compile()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMethod(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ConfigFile::load("/nonexistent/edge.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
