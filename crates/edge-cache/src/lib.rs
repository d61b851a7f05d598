//! Partitioned response cache for the edge interception layer.
//!
//! This crate provides:
//! - `CacheStore` - Partition handles, put-with-retry, expiry sweeps, pruning
//! - `StorageBackend` / `Partition` - Pluggable storage
//! - `MemoryBackend` - In-process backend with an optional byte quota
//! - `CacheKey` - Partition identity derived from prefix + name
//! - `headers` - `Cache-Control` max-age and `Expires` handling
//!
//! # Example
//!
//! ```ignore
//! use edge_cache::{CacheKey, CacheStore};
//!
//! let store = CacheStore::in_memory();
//! let key = CacheKey::new("sw-", "pages");
//!
//! store.put(key.as_str(), request.url().as_str(), &response).await?;
//! let cached = store.lookup(key.as_str(), request.url().as_str()).await?;
//! ```

pub mod headers;

mod backend;
mod error;
mod key;
mod memory;
mod store;

pub use backend::*;
pub use error::*;
pub use key::*;
pub use memory::*;
pub use store::*;
