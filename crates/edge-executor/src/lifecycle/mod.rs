//! Install, activate, fetch and message entry points.

mod manifest;
mod message;
mod notify;
mod worker;

pub use manifest::*;
pub use message::*;
pub use notify::*;
pub use worker::*;
