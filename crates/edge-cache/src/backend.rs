//! Storage backend abstraction.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use edge_core::{Body, Response};
use http::{HeaderMap, StatusCode};

use crate::error::{StoreError, StoreResult};
use crate::headers;

/// A response as held by a partition: status, headers and buffered body.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    /// Status code.
    pub status: StatusCode,
    /// Headers, including `Date` and, when stamped, `Expires`.
    pub headers: HeaderMap,
    /// Buffered body.
    pub body: Bytes,
}

impl CachedResponse {
    /// Approximate storage footprint in bytes.
    pub fn size(&self) -> usize {
        let header_bytes: usize = self
            .headers
            .iter()
            .map(|(name, value)| name.as_str().len() + value.len())
            .sum();
        self.body.len() + header_bytes
    }

    /// Whether the `Expires` header lies in the past.
    pub fn is_expired(&self) -> bool {
        headers::is_expired(&self.headers)
    }

    /// Materialise a fresh response.
    pub fn to_response(&self) -> Response {
        Response::from_parts(self.status, self.headers.clone(), Body::Full(self.body.clone()))
    }
}

impl TryFrom<&Response> for CachedResponse {
    type Error = StoreError;

    fn try_from(response: &Response) -> Result<Self, Self::Error> {
        let body = response.body().as_bytes().ok_or(StoreError::Unbuffered)?;
        Ok(Self {
            status: response.status(),
            headers: response.headers().clone(),
            body: body.clone(),
        })
    }
}

/// An open partition handle.
#[async_trait]
pub trait Partition: Send + Sync {
    /// Partition name (the cache key).
    fn name(&self) -> &str;

    /// Whether the partition was deleted after this handle was opened.
    fn is_closed(&self) -> bool;

    /// Store an entry under a URL, replacing any previous one.
    async fn put(&self, url: &str, response: CachedResponse) -> StoreResult<()>;

    /// Look up an entry.
    async fn get(&self, url: &str) -> StoreResult<Option<CachedResponse>>;

    /// Delete an entry. Returns whether it existed.
    async fn delete(&self, url: &str) -> StoreResult<bool>;

    /// All entries, in no particular order.
    async fn entries(&self) -> StoreResult<Vec<(String, CachedResponse)>>;
}

/// Storage holding named partitions.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Open a partition, creating it when missing.
    async fn open(&self, name: &str) -> StoreResult<Arc<dyn Partition>>;

    /// Whether a partition exists.
    async fn exists(&self, name: &str) -> StoreResult<bool>;

    /// Delete a partition. Returns whether it existed.
    async fn delete(&self, name: &str) -> StoreResult<bool>;

    /// Names of all existing partitions.
    async fn keys(&self) -> StoreResult<Vec<String>>;
}
