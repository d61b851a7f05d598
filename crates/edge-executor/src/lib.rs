//! Route compilation, interception pipeline and caching strategies.
//!
//! This crate turns a configuration into an executable request pipeline:
//! - `Config` / `compile` - Routes, middlewares and defaults into `CompiledConfig`
//! - `find_route` - First matching route, else the top-level configuration
//! - `dispatch` / `dispatch_inline` - The four interception stages around a strategy
//! - `strategy` - Network, cache, fixed and partition strategies
//! - `Worker` - Install, activate, fetch and message entry points
//! - `ConfigFile` - TOML/JSON configuration files
//!
//! # Example
//!
//! ```ignore
//! use edge_executor::{compile, Config, Route, Worker};
//! use edge_executor::strategy::NetworkFirst;
//!
//! let config = compile(
//!     Config::new().with_route(
//!         Route::pattern("/api/")
//!             .with_methods([Method::GET])
//!             .with_cache_name("api")
//!             .with_strategy(NetworkFirst),
//!     ),
//! )?;
//! let worker = Worker::new(config, store, network, scope);
//!
//! let fetched = worker.fetch(request).await;
//! let response = fetched.outcome?;
//! // Deferred work may wait on the body, so read it before settling.
//! let body = response.bytes().await?;
//! fetched.deferred.settle().await;
//! ```

pub mod strategy;

mod compile;
mod config;
mod context;
mod error;
mod file;
mod lifecycle;
mod middleware;
mod pipeline;
mod router;

pub use compile::*;
pub use config::*;
pub use context::*;
pub use error::*;
pub use file::*;
pub use lifecycle::*;
pub use middleware::*;
pub use pipeline::*;
pub use router::*;
