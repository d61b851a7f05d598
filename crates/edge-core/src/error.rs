//! Failure taxonomy shared by the pipeline, strategies and store.

use crate::response::Response;

/// Why a request could not be answered with a response.
///
/// Failures travel through the `afterNetwork` and `after` stages next to
/// responses (see [`Outcome`]), so middlewares can substitute a recovered
/// response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Failure {
    /// The network fetch was rejected (offline, DNS, connection reset...).
    #[error("network request to {url} failed: {reason}")]
    Network { url: String, reason: String },

    /// Nothing is cached for the request and no fallback applied.
    #[error("no cached response for {0}")]
    CacheMiss(String),

    /// The cache store failed in a way that is not recoverable.
    #[error("storage error: {0}")]
    Storage(String),

    /// A streamed body could not be produced or consumed.
    #[error("stream error: {0}")]
    Stream(String),

    /// A middleware, static route or message handler refused the request.
    #[error("{0}")]
    Rejected(String),
}

impl Failure {
    /// Create a network failure for a URL.
    pub fn network(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a rejection with a message.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }

    /// Whether the failure came from the network layer.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}

/// The single slot passed through the after stages: a response or a failure.
pub type Outcome = Result<Response, Failure>;
