//! Core abstractions for the edge interception cache.
//!
//! This crate provides the value types every other crate speaks:
//! - `Request` - Immutable request value; edits produce a new request
//! - `Response` / `Body` - Response with a buffered or streamed body
//! - `Failure` / `Outcome` - The tagged result carried through the pipeline
//! - `RequestId` - Correlation id for one dispatch
//! - `date` - HTTP-date formatting and parsing

pub mod date;

mod body;
mod context;
mod error;
mod request;
mod response;

pub use body::*;
pub use context::*;
pub use error::*;
pub use request::*;
pub use response::*;

pub use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
pub use url::Url;
