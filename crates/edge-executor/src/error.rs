//! Configuration errors.

use std::path::PathBuf;

/// Errors raised while compiling or loading a configuration.
///
/// Dispatch itself never produces these; request-time failures are
/// [`edge_core::Failure`]s.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid path pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("invalid method: {0}")]
    InvalidMethod(String),

    #[error("invalid static response: {0}")]
    InvalidStatic(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
}
