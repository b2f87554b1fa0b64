//! Durable task execution core.
//!
//! A [`TaskOrchestrator`] runs [`Workflow`]s on a bounded worker pool and hands
//! callers a [`TaskHandle`]. Workflows may suspend through a
//! [`DurableHumanInTheLoop`] point; the orchestrator records the task as
//! paused, releases the worker and re-dispatches once input is provided.

pub mod error;
pub use error::{AgentError, CoreError, TaskFailure};

pub mod metadata;
pub use metadata::TaskMetadata;

pub mod future;
pub use future::TaskFuture;

pub mod handle;
pub use handle::TaskHandle;

pub mod scope;
pub use scope::{AgenticScope, ScopeState};

pub mod suspend;
pub use suspend::{DurableHumanInTheLoop, DurableHumanInTheLoopBuilder, Outcome, TaskPaused};

pub mod workflow;
pub use workflow::{Workflow, WorkflowFn, WorkflowRef};

pub mod state;
pub use state::TaskState;

pub mod config;
pub use config::OrchestratorConfig;

pub mod orchestrator;
pub use orchestrator::TaskOrchestrator;

pub use durable_model::{
    Subscribe, TaskConfig, TaskEvent, TaskEventKind, TaskId, TaskInfo, TaskPage, TaskQuery,
    TaskStatus, Value,
};
