//! Per-task key-value execution context.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{PoisonError, RwLock},
};

use durable_model::Value;

/// Read side of an execution context, as seen by suspension points.
pub trait ScopeState: Send + Sync {
    fn has_state(&self, key: &str) -> bool;

    fn read_state(&self, key: &str) -> Option<Value>;
}

/// In-memory scope owned by the orchestrator for the lifetime of one task.
///
/// The same scope is handed to every invocation of the task, so values
/// written before a pause (or injected while paused) are visible on resume.
#[derive(Debug, Default)]
pub struct AgenticScope {
    state: RwLock<HashMap<String, Value>>,
}

impl AgenticScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope pre-populated with a task's initial arguments.
    pub fn with_state(initial: &BTreeMap<String, Value>) -> Self {
        Self {
            state: RwLock::new(
                initial
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ),
        }
    }

    /// Insert or overwrite `key`; returns the previous value.
    pub fn write_state(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into())
    }

    pub fn remove_state(&self, key: &str) -> Option<Value> {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.state.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ScopeState for AgenticScope {
    fn has_state(&self, key: &str) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    fn read_state(&self, key: &str) -> Option<Value> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() {
        let scope = AgenticScope::new();
        assert!(!scope.has_state("k"));

        assert!(scope.write_state("k", "v").is_none());
        assert!(scope.has_state("k"));
        assert_eq!(scope.read_state("k"), Some(Value::from("v")));

        assert_eq!(scope.write_state("k", "w"), Some(Value::from("v")));
        assert_eq!(scope.len(), 1);
    }

    #[test]
    fn initial_state_is_copied() {
        let initial = BTreeMap::from([
            ("b".to_string(), Value::from(2)),
            ("a".to_string(), Value::from(1)),
        ]);
        let scope = AgenticScope::with_state(&initial);
        assert_eq!(scope.keys(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(scope.read_state("b"), Some(Value::from(2)));
    }

    #[test]
    fn remove_clears_key() {
        let scope = AgenticScope::new();
        scope.write_state("k", true);
        assert_eq!(scope.remove_state("k"), Some(Value::from(true)));
        assert!(scope.is_empty());
    }
}
