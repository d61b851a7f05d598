//! Network access for the edge interception cache.
//!
//! This crate provides:
//! - `Network` - The fetch collaborator strategies call for network access
//! - `HttpNetwork` - reqwest-backed implementation
//! - `TimeoutConfig` - Timeouts handed to the underlying HTTP client

mod client;
mod timeout;

pub use client::*;
pub use timeout::*;
