use durable_model::{TaskId, TaskStatus};
use thiserror::Error;

use crate::suspend::TaskPaused;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("illegal transition for task {id}: {from} -> {to}")]
    IllegalTransition {
        id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("task {id} is not paused (current status: {status})")]
    NotPaused { id: TaskId, status: TaskStatus },

    #[error("cannot resume task {id} in state: {status}")]
    NotResumable { id: TaskId, status: TaskStatus },

    #[error("task {id} is already {status}; cancel it first or wait for it to finish")]
    AlreadyActive { id: TaskId, status: TaskStatus },

    #[error("cannot clean up task {id} in non-terminal state: {status}")]
    NotTerminal { id: TaskId, status: TaskStatus },

    #[error("concurrent transition already in progress for task {0}")]
    ConcurrentTransition(TaskId),

    #[error("orchestrator is shutting down")]
    ShuttingDown,
}

/// Exceptional outcome of a [`TaskFuture`](crate::TaskFuture).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskFailure {
    #[error("task failed: {0}")]
    Failed(String),

    #[error("task cancelled")]
    Cancelled,
}

/// Error path of a workflow invocation.
///
/// `Paused` is a control signal, not a failure: the orchestrator turns it into
/// a PAUSED status and never surfaces it through the task future.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AgentError {
    #[error(transparent)]
    Paused(#[from] TaskPaused),

    #[error("{0}")]
    Failed(String),
}

impl AgentError {
    pub fn failed(reason: impl std::fmt::Display) -> Self {
        AgentError::Failed(reason.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paused_converts_with_question_mark() {
        fn step() -> Result<(), AgentError> {
            Err(TaskPaused::new("Waiting for manager"))?;
            Ok(())
        }

        let err = step().unwrap_err();
        assert!(matches!(err, AgentError::Paused(_)));
        assert!(err.to_string().contains("Waiting for manager"));
    }

    #[test]
    fn core_error_messages_name_the_task() {
        let err = CoreError::NotPaused {
            id: TaskId::from("t-9"),
            status: TaskStatus::Completed,
        };
        let msg = err.to_string();
        assert!(msg.contains("t-9"));
        assert!(msg.contains("not paused"));
    }
}
