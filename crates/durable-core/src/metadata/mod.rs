//! Durable record of one task.

use std::{
    collections::BTreeMap,
    fmt,
    sync::{PoisonError, RwLock},
    time::SystemTime,
};

use durable_model::{AgentName, TaskId, TaskInfo, TaskStatus, Value};

use crate::error::CoreError;

/// Binds a [`TaskId`] to its agent, initial arguments and lifecycle status.
///
/// Identity fields never change after [`TaskMetadata::create`]. The status is
/// the only mutable part and sits behind a lock, so `transition_to` is safe
/// for concurrent callers and every reader sees a fully written value.
///
/// The orchestrator does not mutate instances it has handed out. Each
/// transition produces a fresh instance (see [`TaskMetadata::advanced`]) that
/// is pushed into the task handle.
pub struct TaskMetadata {
    task_id: TaskId,
    agent_name: AgentName,
    initial_state: BTreeMap<String, Value>,
    labels: BTreeMap<String, String>,
    created_at: SystemTime,
    live: RwLock<LiveFields>,
}

#[derive(Clone)]
struct LiveFields {
    status: TaskStatus,
    failure_reason: Option<String>,
    updated_at: SystemTime,
}

impl TaskMetadata {
    /// New record in `Pending`.
    pub fn create(
        task_id: TaskId,
        agent_name: impl Into<AgentName>,
        initial_state: BTreeMap<String, Value>,
    ) -> Self {
        let now = SystemTime::now();
        Self {
            task_id,
            agent_name: agent_name.into(),
            initial_state,
            labels: BTreeMap::new(),
            created_at: now,
            live: RwLock::new(LiveFields {
                status: TaskStatus::Pending,
                failure_reason: None,
                updated_at: now,
            }),
        }
    }

    /// Attach free-form tags. Part of the identity fields, so only at creation.
    pub fn with_labels(mut self, labels: BTreeMap<String, String>) -> Self {
        self.labels = labels;
        self
    }

    pub fn id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    pub fn initial_state(&self) -> &BTreeMap<String, Value> {
        &self.initial_state
    }

    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    pub fn status(&self) -> TaskStatus {
        self.read().status
    }

    pub fn failure_reason(&self) -> Option<String> {
        self.read().failure_reason.clone()
    }

    pub fn updated_at(&self) -> SystemTime {
        self.read().updated_at
    }

    /// Move this instance to `next`.
    ///
    /// Rejects moves that [`TaskStatus::can_transition_to`] forbids, in
    /// particular anything out of a terminal state.
    pub fn transition_to(&self, next: TaskStatus) -> Result<(), CoreError> {
        let mut live = self.write();
        if !live.status.can_transition_to(next) {
            return Err(CoreError::IllegalTransition {
                id: self.task_id.clone(),
                from: live.status,
                to: next,
            });
        }
        live.status = next;
        live.updated_at = SystemTime::now();
        Ok(())
    }

    /// Atomically move from `expected` to `next`.
    ///
    /// Returns `false` when the current status differs from `expected` or the
    /// move is illegal. `reason` is recorded only for `Failed`.
    pub fn compare_and_transition(
        &self,
        expected: TaskStatus,
        next: TaskStatus,
        reason: Option<String>,
    ) -> bool {
        let mut live = self.write();
        if live.status != expected || !expected.can_transition_to(next) {
            return false;
        }
        live.status = next;
        live.updated_at = SystemTime::now();
        if next == TaskStatus::Failed {
            live.failure_reason = reason;
        }
        true
    }

    /// A new instance identical to this one but in `next`.
    ///
    /// `self` is left untouched; holders of the old instance keep seeing the old status.
    pub fn advanced(&self, next: TaskStatus, reason: Option<String>) -> Result<Self, CoreError> {
        let copy = self.clone();
        if copy.compare_and_transition(copy.status(), next, reason) {
            Ok(copy)
        } else {
            Err(CoreError::IllegalTransition {
                id: self.task_id.clone(),
                from: copy.status(),
                to: next,
            })
        }
    }

    /// Serializable snapshot.
    pub fn info(&self) -> TaskInfo {
        let live = self.read();
        TaskInfo {
            id: self.task_id.clone(),
            agent_name: self.agent_name.clone(),
            status: live.status,
            initial_state: self.initial_state.clone(),
            labels: self.labels.clone(),
            created_at: self.created_at,
            updated_at: live.updated_at,
            failure_reason: live.failure_reason.clone(),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, LiveFields> {
        self.live.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, LiveFields> {
        self.live.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clone for TaskMetadata {
    fn clone(&self) -> Self {
        Self {
            task_id: self.task_id.clone(),
            agent_name: self.agent_name.clone(),
            initial_state: self.initial_state.clone(),
            labels: self.labels.clone(),
            created_at: self.created_at,
            live: RwLock::new(self.read().clone()),
        }
    }
}

impl fmt::Debug for TaskMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let live = self.read();
        f.debug_struct("TaskMetadata")
            .field("task_id", &self.task_id)
            .field("agent_name", &self.agent_name)
            .field("status", &live.status)
            .field("failure_reason", &live.failure_reason)
            .finish()
    }
}
