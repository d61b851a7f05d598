//! Per-request execution context and deferred work.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use edge_cache::CacheStore;
use edge_core::RequestId;
use edge_data::Network;
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;

/// Background work registered during a dispatch.
///
/// The primary response is returned before this work runs to completion;
/// the host keeps the request alive until [`DeferredWork::settle`]
/// resolves. Clones share the same task list.
#[derive(Clone, Default)]
pub struct DeferredWork {
    tasks: Arc<Mutex<Vec<BoxFuture<'static, ()>>>>,
}

impl DeferredWork {
    /// Create an empty task list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task.
    pub fn push<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.lock().push(task.boxed());
    }

    /// Register another list's tasks as a single task of this list.
    pub fn merge(&self, other: DeferredWork) {
        self.push(other.settle());
    }

    /// Number of tasks registered and not yet drained.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no task is pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take every pending task out of the list.
    pub fn drain(&self) -> Vec<BoxFuture<'static, ()>> {
        std::mem::take(&mut *self.lock())
    }

    /// Run tasks until none are left, including tasks registered by tasks.
    pub async fn settle(self) {
        loop {
            let batch = self.drain();
            if batch.is_empty() {
                break;
            }
            join_all(batch).await;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<BoxFuture<'static, ()>>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for DeferredWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredWork")
            .field("pending", &self.len())
            .finish()
    }
}

/// Everything a stage or strategy may touch while handling one request.
///
/// Cheap to clone; clones share the store, the network and the deferred
/// task list.
#[derive(Clone)]
pub struct ExecutionContext {
    request_id: RequestId,
    store: Arc<CacheStore>,
    network: Arc<dyn Network>,
    deferred: DeferredWork,
}

impl ExecutionContext {
    /// Create a context with a fresh request id and an empty task list.
    pub fn new(store: Arc<CacheStore>, network: Arc<dyn Network>) -> Self {
        Self {
            request_id: RequestId::generate(),
            store,
            network,
            deferred: DeferredWork::new(),
        }
    }

    /// Set the request id.
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }

    /// Same request and collaborators, separate deferred task list.
    ///
    /// Used for nested dispatches, whose work is handed back to the caller.
    pub fn child(&self) -> Self {
        Self {
            request_id: self.request_id.clone(),
            store: Arc::clone(&self.store),
            network: Arc::clone(&self.network),
            deferred: DeferredWork::new(),
        }
    }

    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    pub fn network(&self) -> &Arc<dyn Network> {
        &self.network
    }

    /// Register background work against this request.
    pub fn wait_until<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.deferred.push(task);
    }

    /// The deferred task list.
    pub fn deferred(&self) -> &DeferredWork {
        &self.deferred
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("request_id", &self.request_id)
            .field("deferred", &self.deferred)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_settle_runs_nested_registrations() {
        let work = DeferredWork::new();
        let count = Arc::new(AtomicUsize::new(0));

        let inner_work = work.clone();
        let inner_count = Arc::clone(&count);
        work.push(async move {
            inner_count.fetch_add(1, Ordering::SeqCst);
            let late = Arc::clone(&inner_count);
            inner_work.push(async move {
                late.fetch_add(1, Ordering::SeqCst);
            });
        });
        assert_eq!(work.len(), 1);

        work.clone().settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(work.is_empty());
    }

    #[tokio::test]
    async fn test_merge_registers_single_task() {
        let parent = DeferredWork::new();
        let child = DeferredWork::new();
        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let count = Arc::clone(&count);
            child.push(async move {
                count.fetch_add(1, Ordering::SeqCst);
            });
        }

        parent.merge(child);
        assert_eq!(parent.len(), 1);
        parent.settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}
