//! Strategies deciding how a matched request is served.
//!
//! Every strategy has the same contract: given the request, the execution
//! context and the matched route, produce a response or a failure.
//!
//! | strategy | behavior |
//! |---|---|
//! | [`NetworkOnly`] | stage-wrapped network fetch |
//! | [`CacheOnly`] | cache lookup, miss is a failure |
//! | [`NetworkFirst`] | network, cache on failure, cache write on cacheable success |
//! | [`CacheFirst`] | unexpired cache entry, else `NetworkFirst` |
//! | [`StaleWhileRevalidate`] | cache entry now and refresh later, else `NetworkFirst` |
//! | [`Ignore`] | fixed 408 |
//! | [`CacheFirstIgnore`] | unexpired cache entry, else `Ignore` |
//! | [`Static`] | fixed response or failure |
//! | [`Partition`] | ordered composition of sub-route dispatches |

mod cache;
mod fixed;
mod network;
mod partition;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use edge_core::{Outcome, Request};

use crate::compile::RouteConfig;
use crate::context::ExecutionContext;

pub use cache::*;
pub use fixed::*;
pub use network::*;
pub use partition::*;

/// A pluggable algorithm deciding how a request is answered.
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Short name used in logs and route listings.
    fn name(&self) -> &str;

    async fn handle(
        &self,
        request: &Request,
        ctx: &ExecutionContext,
        route: &Arc<RouteConfig>,
    ) -> Outcome;
}

impl fmt::Debug for dyn Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Strategy({})", self.name())
    }
}

/// Look up a built-in strategy by its configuration name.
///
/// `static` and `partition` need parameters and are not resolvable by name.
pub fn named(name: &str) -> Option<Arc<dyn Strategy>> {
    let strategy: Arc<dyn Strategy> = match name {
        "network-only" => Arc::new(NetworkOnly),
        "cache-only" => Arc::new(CacheOnly),
        "network-first" => Arc::new(NetworkFirst),
        "cache-first" => Arc::new(CacheFirst),
        "stale-while-revalidate" => Arc::new(StaleWhileRevalidate),
        "ignore" => Arc::new(Ignore),
        "cache-first-ignore" => Arc::new(CacheFirstIgnore),
        _ => return None,
    };
    Some(strategy)
}
