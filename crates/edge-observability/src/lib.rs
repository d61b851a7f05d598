//! Observability infrastructure for the edge interception cache.
//!
//! This crate provides:
//! - `init_tracing` - Install a global `tracing` subscriber (JSON or human)
//! - `LogFormat` - Output format selection
//! - `request_span` / `inline_span` - Spans wrapping one dispatch

mod logging;
mod span;

pub use logging::*;
pub use span::*;

// Re-export RequestId from edge-core for convenience
pub use edge_core::RequestId;
