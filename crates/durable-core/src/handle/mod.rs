//! Client-facing view of a running task.

use std::{
    fmt,
    sync::{Arc, PoisonError, RwLock},
};

use durable_model::{TaskId, TaskStatus, Value};

use crate::{future::TaskFuture, metadata::TaskMetadata};

/// Identity, live status and asynchronous result of one task.
///
/// Clones share the metadata cell and the future, so an
/// [`update_metadata`](Self::update_metadata) made through any clone is seen
/// by all of them.
pub struct TaskHandle<T = Value> {
    id: TaskId,
    metadata: Arc<RwLock<Arc<TaskMetadata>>>,
    future: TaskFuture<T>,
}

impl<T> TaskHandle<T> {
    pub fn new(id: TaskId, metadata: Arc<TaskMetadata>, future: TaskFuture<T>) -> Self {
        Self {
            id,
            metadata: Arc::new(RwLock::new(metadata)),
            future,
        }
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    /// Status of the metadata the handle currently points at. Never cached.
    pub fn status(&self) -> TaskStatus {
        self.metadata().status()
    }

    /// The metadata instance the handle currently points at.
    pub fn metadata(&self) -> Arc<TaskMetadata> {
        Arc::clone(&self.metadata.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Swap the metadata the handle reads from.
    pub fn update_metadata(&self, metadata: Arc<TaskMetadata>) {
        *self.metadata.write().unwrap_or_else(PoisonError::into_inner) = metadata;
    }

    /// The future backing this handle (same cell as [`future`](Self::future)).
    pub fn await_result(&self) -> TaskFuture<T> {
        self.future.clone()
    }

    pub fn future(&self) -> TaskFuture<T> {
        self.future.clone()
    }

    /// Cancel the future only.
    ///
    /// Returns `true` if the future was still pending. Status bookkeeping is
    /// left to the orchestrator: the metadata is not moved to `Cancelled` here.
    pub fn cancel(&self) -> bool {
        self.future.cancel()
    }
}

impl<T: Clone> TaskHandle<T> {
    /// Value if the future completed normally; `None` while pending, after a
    /// failure, or after cancellation.
    pub fn result(&self) -> Option<T> {
        self.future.try_get().and_then(Result::ok)
    }
}

impl<T> Clone for TaskHandle<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            metadata: Arc::clone(&self.metadata),
            future: self.future.clone(),
        }
    }
}

impl<T> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("status", &self.status())
            .field("future", &self.future)
            .finish()
    }
}
