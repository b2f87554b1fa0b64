use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::{TaskId, Value};

/// One entry of a task's execution journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskEvent {
    pub task_id: TaskId,
    #[serde(with = "crate::time_serde")]
    pub at: SystemTime,
    pub kind: TaskEventKind,
}

/// What happened to the task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TaskEventKind {
    /// First dispatch of the task.
    Started { agent_name: String },
    /// Invocation suspended, waiting on external input.
    Paused {
        reason: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pending_key: Option<String>,
    },
    /// A value was injected into the task scope.
    InputProvided { key: String },
    /// Re-dispatch of a paused task.
    Resumed,
    /// Invocation returned a value.
    Completed {
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
    },
    /// Invocation failed.
    Failed { reason: String },
    /// Task was cancelled.
    Cancelled,
    /// Invocation exceeded its time budget; a `Cancelled` entry follows.
    TimedOut { timeout_ms: u64 },
}

impl TaskEvent {
    pub fn now(task_id: TaskId, kind: TaskEventKind) -> Self {
        Self {
            task_id,
            at: SystemTime::now(),
            kind,
        }
    }
}

impl TaskEventKind {
    /// Short symbolic name, for logs and metrics labels.
    pub fn name(&self) -> &'static str {
        match self {
            TaskEventKind::Started { .. } => "started",
            TaskEventKind::Paused { .. } => "paused",
            TaskEventKind::InputProvided { .. } => "inputProvided",
            TaskEventKind::Resumed => "resumed",
            TaskEventKind::Completed { .. } => "completed",
            TaskEventKind::Failed { .. } => "failed",
            TaskEventKind::Cancelled => "cancelled",
            TaskEventKind::TimedOut { .. } => "timedOut",
        }
    }
}
