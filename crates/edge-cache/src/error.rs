//! Store errors.

use edge_core::Failure;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Cache store errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The backend is out of space. Recoverable by evicting expired entries.
    #[error("storage quota exceeded")]
    QuotaExceeded,

    /// A streamed response was handed to the store without being buffered.
    #[error("streamed response bodies must be buffered before caching")]
    Unbuffered,

    /// Any other backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether eviction might make a retry succeed.
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::QuotaExceeded)
    }
}

impl From<StoreError> for Failure {
    fn from(err: StoreError) -> Self {
        Failure::Storage(err.to_string())
    }
}
