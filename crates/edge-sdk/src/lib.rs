//! Public SDK for the edge interception cache.
//!
//! This crate re-exports all functionality:
//!
//! ```ignore
//! use edge_sdk::prelude::*;
//!
//! init_tracing(&LogSettings::new(LogFormat::Json))?;
//!
//! let config = compile(
//!     Config::new()
//!         .with_methods([Method::GET])
//!         .with_precache(Precache::new().with_path("/offline.html"))
//!         .with_route(
//!             Route::pattern("/api/")
//!                 .with_cache_name("api")
//!                 .with_strategy(StaleWhileRevalidate),
//!         ),
//! )?;
//!
//! let worker = Worker::new(
//!     config,
//!     Arc::new(CacheStore::in_memory()),
//!     Arc::new(HttpNetwork::new()?),
//!     Url::parse("https://example.com/")?,
//! );
//! worker.install().await?;
//! worker.activate().await?;
//!
//! let response = worker.fetch(Request::get("https://example.com/api/items")?)
//!     .await
//!     .settle()
//!     .await?;
//! ```

pub use edge_cache;
pub use edge_core;
pub use edge_data;
pub use edge_executor;
pub use edge_observability;
pub use edge_streaming;

/// Prelude for convenient imports.
///
/// The partition strategy is exported as `PartitionStrategy` to keep it
/// apart from the storage [`Partition`](edge_cache::Partition) trait.
pub mod prelude {
    pub use edge_cache::*;
    pub use edge_core::*;
    pub use edge_data::*;
    pub use edge_executor::strategy::{
        html_request, CacheFirst, CacheFirstIgnore, CacheOnly, Ignore, NetworkFirst, NetworkOnly,
        Partition as PartitionStrategy, RequestMaker, StaleWhileRevalidate, Static, Strategy,
    };
    pub use edge_executor::*;
    pub use edge_observability::*;
    pub use edge_streaming::*;
    pub use std::sync::Arc;
}
