//! The transport boundary.
//!
//! A [`Session`] turns a request into an asynchronous result. Work spawned
//! on behalf of a session is tracked in its [`Outstanding`] registry so that
//! tearing down the owner can cancel everything still in flight.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::{AbortHandle, JoinHandle};

use crate::request::Request;

/// Failure reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError<E> {
    /// The call was canceled before it completed.
    #[error("request canceled")]
    Canceled,
    /// The transport failed the request with its native error.
    #[error(transparent)]
    Request(E),
}

/// An opaque capability that executes requests.
#[async_trait]
pub trait Session: Send + Sync + 'static {
    /// Requests this session understands.
    type Request: Request;

    /// Executes `request`.
    ///
    /// Dropping the returned future cancels the call.
    async fn execute(
        &self,
        request: Self::Request,
    ) -> Result<
        <Self::Request as Request>::Response,
        TransportError<<Self::Request as Request>::Error>,
    >;

    /// Work currently running on behalf of this session.
    fn outstanding(&self) -> &Outstanding;
}

#[async_trait]
impl<S: Session> Session for Arc<S> {
    type Request = S::Request;

    async fn execute(
        &self,
        request: Self::Request,
    ) -> Result<
        <Self::Request as Request>::Response,
        TransportError<<Self::Request as Request>::Error>,
    > {
        self.as_ref().execute(request).await
    }

    fn outstanding(&self) -> &Outstanding {
        self.as_ref().outstanding()
    }
}

/// Identifier of one unit of outstanding work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkId(u64);

impl fmt::Display for WorkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "work#{}", self.0)
    }
}

#[derive(Debug, Default)]
struct OutstandingInner {
    tasks: DashMap<WorkId, AbortHandle>,
    counter: AtomicU64,
}

/// Registry of in-flight tasks that can be canceled in bulk.
///
/// Clones share the same registry.
#[derive(Debug, Clone, Default)]
pub struct Outstanding {
    inner: Arc<OutstandingInner>,
}

impl Outstanding {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `task` on the current tokio runtime and tracks it until it ends.
    ///
    /// The task does not start before its abort handle is registered, and
    /// it untracks itself however it ends, aborted tasks included.
    pub fn spawn<F>(&self, task: F) -> (WorkId, JoinHandle<F::Output>)
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let id = self.next_id();
        let untrack = Untrack {
            inner: self.inner.clone(),
            id,
        };
        let (registered, wait) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let _untrack = untrack;
            let _ = wait.await;
            task.await
        });
        self.inner.tasks.insert(id, handle.abort_handle());
        let _ = registered.send(());
        (id, handle)
    }

    /// Tracks a task spawned elsewhere. Call [`complete`](Self::complete) when it ends.
    pub fn register(&self, handle: AbortHandle) -> WorkId {
        let id = self.next_id();
        self.inner.tasks.insert(id, handle);
        id
    }

    /// Stops tracking `id` without canceling it.
    pub fn complete(&self, id: WorkId) {
        self.inner.tasks.remove(&id);
    }

    /// Cancels one task. Returns `false` if it was not tracked.
    pub fn cancel(&self, id: WorkId) -> bool {
        match self.inner.tasks.remove(&id) {
            Some((_, handle)) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Cancels every tracked task.
    pub fn cancel_all(&self) {
        let ids: Vec<WorkId> = self.inner.tasks.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            self.cancel(id);
        }
    }

    /// Number of tasks still running.
    pub fn len(&self) -> usize {
        self.cleanup_finished();
        self.inner.tasks.len()
    }

    /// Whether no task is running.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cleanup_finished(&self) {
        self.inner.tasks.retain(|_, handle| !handle.is_finished());
    }

    fn next_id(&self) -> WorkId {
        WorkId(self.inner.counter.fetch_add(1, Ordering::Relaxed))
    }
}

/// Removes a spawned task from the registry when its future is dropped.
struct Untrack {
    inner: Arc<OutstandingInner>,
    id: WorkId,
}

impl Drop for Untrack {
    fn drop(&mut self) {
        self.inner.tasks.remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_spawned_task_untracks_itself() {
        let outstanding = Outstanding::new();
        let (_, handle) = outstanding.spawn(async { 7 });
        assert_eq!(handle.await.unwrap(), 7);
        assert!(outstanding.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_instant_tasks_leave_no_entries() {
        let outstanding = Outstanding::new();
        for value in 0..200 {
            let (_, handle) = outstanding.spawn(async move { value });
            assert_eq!(handle.await.unwrap(), value);
        }
        assert_eq!(outstanding.inner.tasks.len(), 0);
    }

    #[tokio::test]
    async fn test_aborted_task_untracks_itself() {
        let outstanding = Outstanding::new();
        let (_, handle) = outstanding.spawn(tokio::time::sleep(Duration::from_secs(60)));
        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
        assert_eq!(outstanding.inner.tasks.len(), 0);
    }

    #[tokio::test]
    async fn test_cancel_all_aborts_running_tasks() {
        let outstanding = Outstanding::new();
        let (_, first) = outstanding.spawn(tokio::time::sleep(Duration::from_secs(60)));
        let (_, second) = outstanding.spawn(tokio::time::sleep(Duration::from_secs(60)));
        assert_eq!(outstanding.len(), 2);

        outstanding.cancel_all();
        assert!(first.await.unwrap_err().is_cancelled());
        assert!(second.await.unwrap_err().is_cancelled());
        assert!(outstanding.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_single_task() {
        let outstanding = Outstanding::new();
        let (id, handle) = outstanding.spawn(tokio::time::sleep(Duration::from_secs(60)));
        assert!(outstanding.cancel(id));
        assert!(!outstanding.cancel(id));
        assert!(handle.await.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn test_register_and_complete() {
        let outstanding = Outstanding::new();
        let handle = tokio::spawn(tokio::time::sleep(Duration::from_secs(60)));
        let id = outstanding.register(handle.abort_handle());
        assert_eq!(outstanding.len(), 1);
        outstanding.complete(id);
        assert!(outstanding.is_empty());
        handle.abort();
    }
}
