//! Timeout configuration for the HTTP client.
//!
//! The pipeline has no timeout or cancellation primitive of its own; these
//! values are passed straight to the client that performs the fetch.

use std::time::Duration;

/// Timeouts applied by [`crate::HttpNetwork`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Connection timeout.
    pub connect: Option<Duration>,
    /// Total request timeout.
    pub total: Option<Duration>,
}

impl TimeoutConfig {
    /// No timeouts (the client's defaults apply).
    pub fn none() -> Self {
        Self::default()
    }

    /// Create from a single total timeout.
    pub fn from_total(total: Duration) -> Self {
        Self {
            connect: Some(total / 4),
            total: Some(total),
        }
    }

    /// Set the connection timeout.
    pub fn with_connect(mut self, connect: Duration) -> Self {
        self.connect = Some(connect);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_total_splits_connect() {
        let config = TimeoutConfig::from_total(Duration::from_millis(800));
        assert_eq!(config.connect, Some(Duration::from_millis(200)));
        assert_eq!(config.total, Some(Duration::from_millis(800)));
    }

    #[test]
    fn test_none() {
        assert_eq!(TimeoutConfig::none().total, None);
    }
}
