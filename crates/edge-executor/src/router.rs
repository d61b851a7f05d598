//! Route selection.

use std::sync::Arc;

use edge_core::Request;

use crate::compile::{CompiledConfig, RouteConfig};

/// Return the first route, in configured order, that accepts the request's
/// method and whose pattern matches its absolute URL. Falls back to the
/// top-level configuration.
pub fn find_route<'a>(config: &'a CompiledConfig, request: &Request) -> &'a Arc<RouteConfig> {
    config
        .routes()
        .iter()
        .find(|route| route.matches(request))
        .unwrap_or_else(|| config.root())
}
