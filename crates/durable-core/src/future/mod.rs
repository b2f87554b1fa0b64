//! Write-once asynchronous result shared between the orchestrator and callers.

use std::{
    fmt,
    future::{Future, IntoFuture},
    pin::Pin,
    sync::Arc,
};

use tokio::sync::watch;

use crate::error::TaskFailure;

type Settled<T> = Option<Result<T, TaskFailure>>;

/// Single-assignment result cell.
///
/// The first of [`complete`](Self::complete),
/// [`complete_exceptionally`](Self::complete_exceptionally) or
/// [`cancel`](Self::cancel) wins; later attempts return `false` and leave the
/// outcome alone. Clones share the same cell; use [`ptr_eq`](Self::ptr_eq) to
/// check identity.
pub struct TaskFuture<T> {
    cell: Arc<watch::Sender<Settled<T>>>,
}

impl<T> TaskFuture<T> {
    /// New pending future.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { cell: Arc::new(tx) }
    }

    /// Settle with a value. Returns `false` if already settled.
    pub fn complete(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    /// Settle with a failure. Returns `false` if already settled.
    pub fn complete_exceptionally(&self, reason: impl Into<String>) -> bool {
        self.settle(Err(TaskFailure::Failed(reason.into())))
    }

    /// Settle as cancelled. Returns `true` only if this call changed the state.
    pub fn cancel(&self) -> bool {
        self.settle(Err(TaskFailure::Cancelled))
    }

    pub fn is_done(&self) -> bool {
        self.cell.borrow().is_some()
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(*self.cell.borrow(), Some(Err(TaskFailure::Cancelled)))
    }

    /// Settled with a failure or cancellation.
    pub fn is_completed_exceptionally(&self) -> bool {
        matches!(*self.cell.borrow(), Some(Err(_)))
    }

    /// Resolve once the future is settled, whatever the outcome.
    pub async fn settled(&self) {
        let mut rx = self.cell.subscribe();
        // The sender lives in `self.cell`, so this only returns once a value is set.
        let _ = rx.wait_for(Option::is_some).await;
    }

    /// Same underlying cell.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }

    fn settle(&self, outcome: Result<T, TaskFailure>) -> bool {
        self.cell.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(outcome);
            true
        })
    }
}

impl<T: Clone> TaskFuture<T> {
    /// Outcome if settled, without waiting.
    pub fn try_get(&self) -> Option<Result<T, TaskFailure>> {
        self.cell.borrow().clone()
    }

    /// Wait until settled.
    pub async fn wait(&self) -> Result<T, TaskFailure> {
        let mut rx = self.cell.subscribe();
        // The sender lives in `self.cell`, so the channel cannot close while we wait.
        match rx.wait_for(Option::is_some).await {
            Ok(slot) => (*slot).clone().unwrap_or(Err(TaskFailure::Cancelled)),
            Err(_) => Err(TaskFailure::Cancelled),
        }
    }
}

impl<T> Clone for TaskFuture<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T> Default for TaskFuture<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for TaskFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.cell.borrow() {
            None => "pending",
            Some(Ok(_)) => "completed",
            Some(Err(TaskFailure::Cancelled)) => "cancelled",
            Some(Err(TaskFailure::Failed(_))) => "failed",
        };
        f.debug_struct("TaskFuture").field("state", &state).finish()
    }
}

impl<T> IntoFuture for TaskFuture<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Output = Result<T, TaskFailure>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move { self.wait().await })
    }
}
