//! The process-wide cache store.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use edge_core::Response;
use futures::future::try_join_all;
use tracing::{debug, error, warn};

use crate::backend::{CachedResponse, Partition, StorageBackend};
use crate::error::{StoreError, StoreResult};
use crate::memory::MemoryBackend;

/// Owns the partition handle table in front of a storage backend.
///
/// Construct one per process and share it by `Arc`.
pub struct CacheStore {
    backend: Arc<dyn StorageBackend>,
    handles: DashMap<String, Arc<dyn Partition>>,
}

impl CacheStore {
    /// Create a store over a backend.
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        Self::from_backend(Arc::new(backend))
    }

    /// Create a store over a shared backend.
    pub fn from_backend(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            handles: DashMap::new(),
        }
    }

    /// Create a store over an unbounded [`MemoryBackend`].
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    /// The underlying backend.
    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    /// Return the handle for a partition, creating the partition if needed.
    ///
    /// Cached handles are reused until they report themselves closed, in
    /// which case the partition is reopened.
    pub async fn open(&self, key: &str) -> StoreResult<Arc<dyn Partition>> {
        if let Some(handle) = self.cached_handle(key) {
            return Ok(handle);
        }
        let handle = self.backend.open(key).await?;
        self.handles.insert(key.to_string(), Arc::clone(&handle));
        Ok(handle)
    }

    fn cached_handle(&self, key: &str) -> Option<Arc<dyn Partition>> {
        let handle = self.handles.get(key).map(|h| Arc::clone(h.value()))?;
        if handle.is_closed() {
            debug!(partition = key, "dropping stale partition handle");
            self.handles.remove(key);
            return None;
        }
        Some(handle)
    }

    /// Handle for a partition only if it already exists.
    async fn existing(&self, key: &str) -> StoreResult<Option<Arc<dyn Partition>>> {
        if let Some(handle) = self.cached_handle(key) {
            return Ok(Some(handle));
        }
        if self.backend.exists(key).await? {
            return self.open(key).await.map(Some);
        }
        Ok(None)
    }

    /// Store a copy of `response` under `url` in partition `key`.
    ///
    /// The response is copied before the returned future first polls, so the
    /// future does not borrow it. See [`CacheStore::put_entry`].
    pub fn put<'a>(
        &'a self,
        key: &'a str,
        url: &'a str,
        response: &Response,
    ) -> impl Future<Output = StoreResult<()>> + Send + 'a {
        let entry = CachedResponse::try_from(response);
        async move { self.put_entry(key, url, entry?).await }
    }

    /// Store an entry under `url` in partition `key`.
    ///
    /// On quota exhaustion the store evicts and retries, sequentially:
    /// first expired entries of this partition, then expired entries of
    /// every partition. A third quota failure gives up without an error and
    /// without storing. Any other failure is returned immediately.
    pub async fn put_entry(&self, key: &str, url: &str, entry: CachedResponse) -> StoreResult<()> {
        for attempt in 0u8.. {
            let partition = self.open(key).await?;
            match partition.put(url, entry.clone()).await {
                Ok(()) => {
                    debug!(partition = key, url, attempt, "cached response");
                    return Ok(());
                }
                Err(StoreError::QuotaExceeded) => {}
                Err(err) => {
                    error!(partition = key, url, error = %err, "cache write failed");
                    return Err(err);
                }
            }

            match attempt {
                0 => {
                    debug!(partition = key, "quota exceeded, sweeping partition");
                    self.delete_expired_in_partition(key).await?;
                }
                1 => {
                    debug!(partition = key, "quota exceeded, sweeping all partitions");
                    self.delete_all_expired().await?;
                }
                _ => {
                    warn!(partition = key, url, "quota exceeded after eviction, not caching");
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    /// Look up the entry for `url` in partition `key`.
    ///
    /// A partition that does not exist yields `None` without creating it.
    pub async fn lookup(&self, key: &str, url: &str) -> StoreResult<Option<Response>> {
        let Some(partition) = self.existing(key).await? else {
            return Ok(None);
        };
        Ok(partition.get(url).await?.map(|entry| entry.to_response()))
    }

    /// Delete one entry.
    pub async fn delete(&self, key: &str, url: &str) -> StoreResult<bool> {
        match self.existing(key).await? {
            Some(partition) => partition.delete(url).await,
            None => Ok(false),
        }
    }

    /// Delete every expired entry in one partition. Returns how many were removed.
    pub async fn delete_expired_in_partition(&self, key: &str) -> StoreResult<usize> {
        let Some(partition) = self.existing(key).await? else {
            return Ok(0);
        };

        let mut removed = 0;
        for (url, entry) in partition.entries().await? {
            if entry.is_expired() && partition.delete(&url).await? {
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(partition = key, removed, "deleted expired entries");
        }
        Ok(removed)
    }

    /// Delete expired entries in every partition, sweeping partitions in parallel.
    pub async fn delete_all_expired(&self) -> StoreResult<usize> {
        let keys = self.backend.keys().await?;
        let counts =
            try_join_all(keys.iter().map(|key| self.delete_expired_in_partition(key))).await?;
        Ok(counts.into_iter().sum())
    }

    /// Delete every partition whose key is not in `keep`. Returns the deleted keys.
    pub async fn delete_unlisted(&self, keep: &HashSet<String>) -> StoreResult<Vec<String>> {
        let doomed: Vec<String> = self
            .backend
            .keys()
            .await?
            .into_iter()
            .filter(|key| !keep.contains(key))
            .collect();

        try_join_all(doomed.iter().map(|key| self.delete_partition(key))).await?;
        if !doomed.is_empty() {
            debug!(partitions = ?doomed, "deleted unlisted partitions");
        }
        Ok(doomed)
    }

    /// Delete a whole partition.
    pub async fn delete_partition(&self, key: &str) -> StoreResult<bool> {
        self.handles.remove(key);
        self.backend.delete(key).await
    }

    /// Names of all existing partitions.
    pub async fn keys(&self) -> StoreResult<Vec<String>> {
        self.backend.keys().await
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("open_handles", &self.handles.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edge_core::{Body, StatusCode};
    use http::header::{self, HeaderValue};

    const PAST: &str = "Thu, 01 Jan 1970 00:00:00 GMT";
    const FUTURE: &str = "Fri, 01 Jan 2100 00:00:00 GMT";

    fn body(len: usize) -> Response {
        Response::new(StatusCode::OK).with_body(vec![b'x'; len])
    }

    fn expiring(len: usize, expires: &'static str) -> Response {
        body(len).with_header(header::EXPIRES, HeaderValue::from_static(expires))
    }

    /// Backend whose partitions fail every put with a fixed error and log
    /// puts and sweeps in order.
    #[derive(Default)]
    struct Script {
        failure: Option<StoreError>,
        events: std::sync::Mutex<Vec<String>>,
    }

    impl Script {
        fn failing(failure: StoreError) -> Arc<Self> {
            Arc::new(Self {
                failure: Some(failure),
                ..Self::default()
            })
        }

        fn record(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    struct ScriptedBackend(Arc<Script>);

    struct ScriptedPartition {
        name: String,
        script: Arc<Script>,
    }

    #[async_trait::async_trait]
    impl Partition for ScriptedPartition {
        fn name(&self) -> &str {
            &self.name
        }

        fn is_closed(&self) -> bool {
            false
        }

        async fn put(&self, _url: &str, _response: CachedResponse) -> StoreResult<()> {
            self.script.record(format!("put:{}", self.name));
            match &self.script.failure {
                Some(failure) => Err(failure.clone()),
                None => Ok(()),
            }
        }

        async fn get(&self, _url: &str) -> StoreResult<Option<CachedResponse>> {
            Ok(None)
        }

        async fn delete(&self, _url: &str) -> StoreResult<bool> {
            Ok(false)
        }

        async fn entries(&self) -> StoreResult<Vec<(String, CachedResponse)>> {
            self.script.record(format!("sweep:{}", self.name));
            Ok(Vec::new())
        }
    }

    #[async_trait::async_trait]
    impl StorageBackend for ScriptedBackend {
        async fn open(&self, name: &str) -> StoreResult<Arc<dyn Partition>> {
            Ok(Arc::new(ScriptedPartition {
                name: name.to_string(),
                script: Arc::clone(&self.0),
            }))
        }

        async fn exists(&self, _name: &str) -> StoreResult<bool> {
            Ok(true)
        }

        async fn delete(&self, _name: &str) -> StoreResult<bool> {
            Ok(true)
        }

        async fn keys(&self) -> StoreResult<Vec<String>> {
            Ok(vec!["a".to_string(), "b".to_string()])
        }
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn test_put_future_does_not_borrow_response() {
        let store = CacheStore::in_memory();
        let chunks = futures::stream::iter(vec![Ok(bytes::Bytes::from("x"))]);
        let response = Response::new(StatusCode::OK).with_body(Body::from_stream(chunks));

        let write = store.put("a", "u", &response);
        drop(response);
        assert_send(&write);
    }

    #[tokio::test]
    async fn test_backend_failure_is_not_retried() {
        let script = Script::failing(StoreError::Backend("disk".into()));
        let store = CacheStore::new(ScriptedBackend(Arc::clone(&script)));

        assert_eq!(
            store.put("a", "u", &body(1)).await.unwrap_err(),
            StoreError::Backend("disk".into())
        );
        assert_eq!(script.events(), vec!["put:a"]);
    }

    #[tokio::test]
    async fn test_quota_escalation_order() {
        let script = Script::failing(StoreError::QuotaExceeded);
        let store = CacheStore::new(ScriptedBackend(Arc::clone(&script)));

        store.put("a", "u", &body(1)).await.unwrap();
        assert_eq!(
            script.events(),
            vec!["put:a", "sweep:a", "put:a", "sweep:a", "sweep:b", "put:a"]
        );
    }

    #[tokio::test]
    async fn test_put_then_lookup() {
        let store = CacheStore::in_memory();
        store
            .put("sw-a", "https://x/1", &expiring(3, FUTURE))
            .await
            .unwrap();

        let cached = store.lookup("sw-a", "https://x/1").await.unwrap().unwrap();
        assert_eq!(cached.header("expires"), Some(FUTURE));
        assert_eq!(cached.text().await.unwrap(), "xxx");
        assert!(store.lookup("sw-a", "https://x/2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lookup_does_not_create_partition() {
        let store = CacheStore::in_memory();
        assert!(store.lookup("sw-missing", "https://x/").await.unwrap().is_none());
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_quota_sweeps_own_partition_first() {
        let store = CacheStore::new(MemoryBackend::with_quota(1600));
        store.put("a", "old", &expiring(1000, PAST)).await.unwrap();
        store.put("b", "stale", &expiring(10, PAST)).await.unwrap();

        store.put("a", "new", &body(1000)).await.unwrap();

        assert!(store.lookup("a", "old").await.unwrap().is_none());
        assert!(store.lookup("a", "new").await.unwrap().is_some());
        // The partition sweep was enough; other partitions were left alone.
        assert!(store.lookup("b", "stale").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_quota_escalates_to_all_partitions() {
        let store = CacheStore::new(MemoryBackend::with_quota(2500));
        store.put("a", "fresh", &body(1000)).await.unwrap();
        store.put("b", "stale", &expiring(1000, PAST)).await.unwrap();

        store.put("a", "new", &body(1000)).await.unwrap();

        assert!(store.lookup("a", "fresh").await.unwrap().is_some());
        assert!(store.lookup("a", "new").await.unwrap().is_some());
        assert!(store.lookup("b", "stale").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_quota_gives_up_silently() {
        let store = CacheStore::new(MemoryBackend::with_quota(500));
        store.put("a", "big", &body(1000)).await.unwrap();
        assert!(store.lookup("a", "big").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_streamed_body_is_rejected() {
        let store = CacheStore::in_memory();
        let chunks = futures::stream::iter(vec![Ok(bytes::Bytes::from("x"))]);
        let response = Response::new(StatusCode::OK).with_body(Body::from_stream(chunks));
        assert_eq!(
            store.put("a", "s", &response).await.unwrap_err(),
            StoreError::Unbuffered
        );
    }

    #[tokio::test]
    async fn test_stale_handle_is_reopened() {
        let store = CacheStore::in_memory();
        store.open("a").await.unwrap();
        // Deleted behind the store's back.
        store.backend().delete("a").await.unwrap();

        store.put("a", "u", &body(1)).await.unwrap();
        assert!(store.lookup("a", "u").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_all_expired() {
        let store = CacheStore::in_memory();
        store.put("a", "1", &expiring(1, PAST)).await.unwrap();
        store.put("a", "2", &expiring(1, FUTURE)).await.unwrap();
        store.put("b", "3", &expiring(1, PAST)).await.unwrap();
        store.put("b", "4", &body(1)).await.unwrap();

        assert_eq!(store.delete_all_expired().await.unwrap(), 2);
        assert!(store.lookup("a", "2").await.unwrap().is_some());
        assert!(store.lookup("b", "4").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_unlisted() {
        let store = CacheStore::in_memory();
        for key in ["sw-keep", "sw-old", "other"] {
            store.put(key, "u", &body(1)).await.unwrap();
        }

        let keep: HashSet<String> = ["sw-keep".to_string()].into_iter().collect();
        let mut deleted = store.delete_unlisted(&keep).await.unwrap();
        deleted.sort();

        assert_eq!(deleted, vec!["other".to_string(), "sw-old".to_string()]);
        assert_eq!(store.keys().await.unwrap(), vec!["sw-keep".to_string()]);
    }
}
