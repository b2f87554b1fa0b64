use std::{collections::BTreeMap, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{AgentName, Value};

/// Timeout value in milliseconds.
pub type TimeoutMs = u64;

/// Per-task settings supplied when a task is started.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskConfig {
    /// Agent (workflow) name recorded in the task metadata.
    pub agent_name: AgentName,
    /// Initial arguments, copied into the task scope before the first run.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub initial_state: BTreeMap<String, Value>,
    /// Free-form tags copied into the task metadata.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Upper bound for one invocation; `None` falls back to the orchestrator
    /// default. Zero means no limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<TimeoutMs>,
}

impl TaskConfig {
    pub fn new(agent_name: impl Into<AgentName>) -> Self {
        Self {
            agent_name: agent_name.into(),
            ..Default::default()
        }
    }

    pub fn with_state(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.initial_state.insert(key.into(), value.into());
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let ms = TimeoutMs::try_from(timeout.as_millis()).unwrap_or(TimeoutMs::MAX);
        self.timeout_ms = Some(ms);
        self
    }

    /// Effective per-task timeout; a zero value is treated as unset.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}
