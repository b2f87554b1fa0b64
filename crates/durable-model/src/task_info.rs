use std::{collections::BTreeMap, time::SystemTime};

use serde::{Deserialize, Serialize};

use crate::{AgentName, TaskId, TaskStatus, Value};

/// Point-in-time view of a task record, safe to serialize and hand out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    /// Unique task identifier.
    pub id: TaskId,
    /// Agent (workflow) the task runs.
    pub agent_name: AgentName,
    /// Current lifecycle state.
    pub status: TaskStatus,
    /// Arguments supplied when the task was created.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub initial_state: BTreeMap<String, Value>,
    /// Tags supplied when the task was created.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// When the task was created.
    #[serde(with = "crate::time_serde")]
    pub created_at: SystemTime,
    /// When the task last changed state.
    #[serde(with = "crate::time_serde")]
    pub updated_at: SystemTime,
    /// Failure message (only for Failed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(status: TaskStatus, failure_reason: Option<String>) -> TaskInfo {
        TaskInfo {
            id: TaskId::from("test-task-1"),
            agent_name: "reviewer".to_string(),
            status,
            initial_state: BTreeMap::from([("topic".to_string(), Value::from("rust"))]),
            labels: BTreeMap::from([("team".to_string(), "docs".to_string())]),
            created_at: SystemTime::now(),
            updated_at: SystemTime::now(),
            failure_reason,
        }
    }

    #[test]
    fn task_info_serde_roundtrip() {
        let info = info(TaskStatus::Failed, Some("boom".to_string()));

        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("\"agentName\":\"reviewer\""));
        let back: TaskInfo = serde_json::from_str(&json).unwrap();

        assert_eq!(back.id, info.id);
        assert_eq!(back.agent_name, info.agent_name);
        assert_eq!(back.status, info.status);
        assert_eq!(back.initial_state, info.initial_state);
        assert_eq!(back.labels, info.labels);
        assert_eq!(back.failure_reason, info.failure_reason);
    }

    #[test]
    fn task_info_optional_failure_reason() {
        let json = serde_json::to_string(&info(TaskStatus::Completed, None)).unwrap();
        assert!(!json.contains("failureReason"));
    }
}
