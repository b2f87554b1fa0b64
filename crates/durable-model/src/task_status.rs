use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Lifecycle state of a durable task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[repr(u8)]
pub enum TaskStatus {
    /// Task is created and waiting for a worker.
    Pending = 0,
    /// Task is currently executing.
    Running = 1,
    /// Task is suspended until external input arrives.
    Paused = 2,
    /// Task completed successfully.
    Completed = 3,
    /// Task failed with an error.
    Failed = 4,
    /// Task was explicitly cancelled (or timed out).
    Cancelled = 5,
}

impl TaskStatus {
    /// Returns `true` if the task is in a terminal state (won't transition further).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// Returns `true` if the task is occupying or waiting for a worker.
    pub fn is_active(&self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::Running)
    }

    /// Whether `self -> next` is a legal lifecycle move.
    ///
    /// `Pending -> Running -> {Paused <-> Running} -> {Completed | Failed | Cancelled}`,
    /// plus cancellation from any non-terminal state.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        match self {
            Pending => matches!(next, Running | Failed | Cancelled),
            Running => matches!(next, Paused | Completed | Failed | Cancelled),
            Paused => matches!(next, Running | Cancelled),
            Completed | Failed | Cancelled => false,
        }
    }

    /// Inverse of `status as u8`.
    pub fn from_repr(v: u8) -> Option<Self> {
        match v {
            0 => Some(TaskStatus::Pending),
            1 => Some(TaskStatus::Running),
            2 => Some(TaskStatus::Paused),
            3 => Some(TaskStatus::Completed),
            4 => Some(TaskStatus::Failed),
            5 => Some(TaskStatus::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Paused => "paused",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_lowercase();
        match norm.as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "running" => Ok(TaskStatus::Running),
            "paused" => Ok(TaskStatus::Paused),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            "cancelled" | "canceled" => Ok(TaskStatus::Cancelled),
            _ => Err(ModelError::InvalidStatus(s.to_string())),
        }
    }
}
