//! Streaming primitives for composed responses.
//!
//! This crate stitches independently produced sub-responses into one body:
//! - `compose` - Concatenate part bodies strictly in list order
//! - `Composition` - Headers, the streamed body, and its `Completion`

mod compose;

pub use compose::*;
