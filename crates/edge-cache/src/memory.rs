//! In-process storage backend with an optional byte quota.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::backend::{CachedResponse, Partition, StorageBackend};
use crate::error::{StoreError, StoreResult};

/// Byte accounting shared by every partition of one backend.
#[derive(Debug, Default)]
struct Usage {
    used: AtomicUsize,
    quota: Option<usize>,
}

impl Usage {
    /// Account for `size` new bytes replacing `replaced` ones.
    ///
    /// The check and the update are one atomic step, so puts racing on
    /// different partitions cannot overshoot the quota together.
    fn reserve(&self, size: usize, replaced: usize) -> StoreResult<()> {
        let Some(quota) = self.quota else {
            self.used.fetch_add(size, Ordering::AcqRel);
            self.used.fetch_sub(replaced, Ordering::AcqRel);
            return Ok(());
        };

        self.used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                let next = used.saturating_sub(replaced) + size;
                (next <= quota).then_some(next)
            })
            .map(drop)
            .map_err(|_| StoreError::QuotaExceeded)
    }
}

/// In-memory backend.
///
/// With a quota configured, a put that would push the total footprint of all
/// partitions past the quota fails with [`StoreError::QuotaExceeded`].
#[derive(Debug, Default)]
pub struct MemoryBackend {
    partitions: DashMap<String, Arc<MemoryPartition>>,
    usage: Arc<Usage>,
}

impl MemoryBackend {
    /// Create an unbounded backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend limited to `bytes` across all partitions.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            partitions: DashMap::new(),
            usage: Arc::new(Usage {
                used: AtomicUsize::new(0),
                quota: Some(bytes),
            }),
        }
    }

    /// Bytes currently held.
    pub fn used_bytes(&self) -> usize {
        self.usage.used.load(Ordering::Acquire)
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn open(&self, name: &str) -> StoreResult<Arc<dyn Partition>> {
        let entry = self.partitions.entry(name.to_string()).or_insert_with(|| {
            Arc::new(MemoryPartition {
                name: name.to_string(),
                entries: Mutex::new(HashMap::new()),
                closed: AtomicBool::new(false),
                usage: Arc::clone(&self.usage),
            })
        });
        let partition: Arc<dyn Partition> = entry.value().clone();
        Ok(partition)
    }

    async fn exists(&self, name: &str) -> StoreResult<bool> {
        Ok(self.partitions.contains_key(name))
    }

    async fn delete(&self, name: &str) -> StoreResult<bool> {
        match self.partitions.remove(name) {
            Some((_, partition)) => {
                partition.close();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.partitions.iter().map(|p| p.key().clone()).collect())
    }
}

/// A partition of [`MemoryBackend`].
#[derive(Debug)]
pub struct MemoryPartition {
    name: String,
    entries: Mutex<HashMap<String, CachedResponse>>,
    closed: AtomicBool,
    usage: Arc<Usage>,
}

impl MemoryPartition {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, CachedResponse>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        let mut entries = self.lock();
        let freed: usize = entries.values().map(CachedResponse::size).sum();
        entries.clear();
        self.usage.used.fetch_sub(freed, Ordering::AcqRel);
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.is_closed() {
            return Err(StoreError::Backend(format!(
                "partition {} was deleted",
                self.name
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Partition for MemoryPartition {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    async fn put(&self, url: &str, response: CachedResponse) -> StoreResult<()> {
        self.ensure_open()?;
        let size = response.size();
        let mut entries = self.lock();
        let replaced = entries.get(url).map(CachedResponse::size).unwrap_or(0);

        self.usage.reserve(size, replaced)?;
        entries.insert(url.to_string(), response);
        Ok(())
    }

    async fn get(&self, url: &str) -> StoreResult<Option<CachedResponse>> {
        self.ensure_open()?;
        Ok(self.lock().get(url).cloned())
    }

    async fn delete(&self, url: &str) -> StoreResult<bool> {
        self.ensure_open()?;
        match self.lock().remove(url) {
            Some(removed) => {
                self.usage.used.fetch_sub(removed.size(), Ordering::AcqRel);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn entries(&self) -> StoreResult<Vec<(String, CachedResponse)>> {
        self.ensure_open()?;
        Ok(self
            .lock()
            .iter()
            .map(|(url, response)| (url.clone(), response.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{HeaderMap, StatusCode};

    fn entry(len: usize) -> CachedResponse {
        CachedResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::from(vec![b'x'; len]),
        }
    }

    #[tokio::test]
    async fn test_quota_rejects_oversized_put() {
        let backend = MemoryBackend::with_quota(100);
        let partition = backend.open("p").await.unwrap();

        partition.put("a", entry(60)).await.unwrap();
        assert_eq!(
            partition.put("b", entry(60)).await.unwrap_err(),
            StoreError::QuotaExceeded
        );
        // Replacing an entry only counts the difference.
        partition.put("a", entry(90)).await.unwrap();
        assert_eq!(backend.used_bytes(), 90);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_quota_holds_across_concurrent_partitions() {
        let backend = Arc::new(MemoryBackend::with_quota(100));
        let writers: Vec<_> = (0..16)
            .map(|i| {
                let backend = Arc::clone(&backend);
                tokio::spawn(async move {
                    let partition = backend.open(&format!("p{i}")).await.unwrap();
                    partition.put("a", entry(60)).await
                })
            })
            .collect();

        let mut stored = 0;
        for writer in writers {
            match writer.await.unwrap() {
                Ok(()) => stored += 1,
                Err(err) => assert_eq!(err, StoreError::QuotaExceeded),
            }
        }
        assert_eq!(stored, 1);
        assert_eq!(backend.used_bytes(), 60);
    }

    #[tokio::test]
    async fn test_delete_partition_closes_handles_and_frees_bytes() {
        let backend = MemoryBackend::new();
        let partition = backend.open("p").await.unwrap();
        partition.put("a", entry(10)).await.unwrap();

        assert!(backend.delete("p").await.unwrap());
        assert!(partition.is_closed());
        assert!(partition.get("a").await.is_err());
        assert_eq!(backend.used_bytes(), 0);
        assert!(!backend.exists("p").await.unwrap());
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let backend = MemoryBackend::new();
        let first = backend.open("p").await.unwrap();
        first.put("a", entry(1)).await.unwrap();
        let second = backend.open("p").await.unwrap();
        assert!(second.get("a").await.unwrap().is_some());
        assert_eq!(backend.keys().await.unwrap(), vec!["p".to_string()]);
    }
}
