//! Plain data types shared by the durable task crates.
//!
//! Nothing here runs tasks. The types are serde-friendly so they can be
//! logged, returned from queries, or handed to event subscribers.

mod error;
pub use error::ModelError;

mod time_serde;

mod task_id;
pub use task_id::TaskId;

mod task_status;
pub use task_status::TaskStatus;

mod task_info;
pub use task_info::TaskInfo;

mod task_query;
pub use task_query::{TaskPage, TaskQuery};

mod task_config;
pub use task_config::{TaskConfig, TimeoutMs};

mod task_event;
pub use task_event::{TaskEvent, TaskEventKind};

mod subscribe;
pub use subscribe::Subscribe;

/// Dynamically typed value stored in a scope, passed as initial state, or
/// produced as a task result.
pub type Value = serde_json::Value;

/// Name of the agent (workflow) a task runs.
pub type AgentName = String;
