//! Suspension points.
//!
//! A suspension point never blocks. When its input is missing it returns
//! [`Outcome::Paused`]; the workflow propagates that (usually via `?` after
//! [`Outcome::into_result`]) and the orchestrator marks the task paused.
//! Re-running the workflow after the input lands in the scope simply passes
//! the check, so agent code needs no separate resume path.

use durable_model::Value;
use thiserror::Error;

use crate::scope::ScopeState;

const DEFAULT_OUTPUT_KEY: &str = "humanInput";
const DEFAULT_REASON: &str = "Waiting for human input";

/// Signal that an invocation cannot proceed until more input arrives.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("task paused: {reason}")]
pub struct TaskPaused {
    reason: String,
    pending_key: Option<String>,
}

impl TaskPaused {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            pending_key: None,
        }
    }

    /// Pause waiting on a specific scope key.
    pub fn waiting_on(reason: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            pending_key: Some(key.into()),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn pending_key(&self) -> Option<&str> {
        self.pending_key.as_deref()
    }
}

/// Result of a suspension point.
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// Input was present; carry on with it.
    Resumed(T),
    /// Input is missing; the task should pause.
    Paused(TaskPaused),
}

impl<T> Outcome<T> {
    pub fn is_paused(&self) -> bool {
        matches!(self, Outcome::Paused(_))
    }

    pub fn into_result(self) -> Result<T, TaskPaused> {
        match self {
            Outcome::Resumed(v) => Ok(v),
            Outcome::Paused(p) => Err(p),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Resumed(v) => Outcome::Resumed(f(v)),
            Outcome::Paused(p) => Outcome::Paused(p),
        }
    }
}

/// Reusable "ask a human" step that survives process-level suspension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurableHumanInTheLoop {
    output_key: String,
    reason: String,
    description: String,
    is_async: bool,
}

impl DurableHumanInTheLoop {
    pub fn builder() -> DurableHumanInTheLoopBuilder {
        DurableHumanInTheLoopBuilder::default()
    }

    /// Scope key the answer is read from.
    pub fn output_key(&self) -> &str {
        &self.output_key
    }

    /// Message carried by the pause signal.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Presentation hint; not interpreted here.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Scheduling hint; not interpreted here.
    pub fn is_async(&self) -> bool {
        self.is_async
    }

    /// Read the answer from `scope`, or pause if nobody has answered yet.
    pub fn ask_user<S>(&self, scope: &S) -> Outcome<Value>
    where
        S: ScopeState + ?Sized,
    {
        if !scope.has_state(&self.output_key) {
            return Outcome::Paused(self.pause());
        }
        match scope.read_state(&self.output_key) {
            Some(value) => Outcome::Resumed(value),
            None => Outcome::Paused(self.pause()),
        }
    }

    fn pause(&self) -> TaskPaused {
        TaskPaused::waiting_on(self.reason.clone(), self.output_key.clone())
    }
}

impl Default for DurableHumanInTheLoop {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Debug, Clone)]
pub struct DurableHumanInTheLoopBuilder {
    output_key: String,
    reason: String,
    description: String,
    is_async: bool,
}

impl Default for DurableHumanInTheLoopBuilder {
    fn default() -> Self {
        Self {
            output_key: DEFAULT_OUTPUT_KEY.to_string(),
            reason: DEFAULT_REASON.to_string(),
            description: String::new(),
            is_async: false,
        }
    }
}

impl DurableHumanInTheLoopBuilder {
    pub fn output_key(mut self, key: impl Into<String>) -> Self {
        self.output_key = key.into();
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn async_mode(mut self, is_async: bool) -> Self {
        self.is_async = is_async;
        self
    }

    pub fn build(self) -> DurableHumanInTheLoop {
        DurableHumanInTheLoop {
            output_key: self.output_key,
            reason: self.reason,
            description: self.description,
            is_async: self.is_async,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::scope::AgenticScope;

    /// Scope stub with a fixed answer set.
    struct FixedScope(HashMap<&'static str, Value>);

    impl ScopeState for FixedScope {
        fn has_state(&self, key: &str) -> bool {
            self.0.contains_key(key)
        }

        fn read_state(&self, key: &str) -> Option<Value> {
            self.0.get(key).cloned()
        }
    }

    #[test]
    fn defaults() {
        let hitl = DurableHumanInTheLoop::builder().build();
        assert_eq!(hitl.output_key(), "humanInput");
        assert_eq!(hitl.reason(), "Waiting for human input");
        assert_eq!(hitl.description(), "");
        assert!(!hitl.is_async());
        assert_eq!(hitl, DurableHumanInTheLoop::default());
    }

    #[test]
    fn pauses_with_default_reason_when_input_missing() {
        let hitl = DurableHumanInTheLoop::builder().build();
        let scope = FixedScope(HashMap::new());

        let Outcome::Paused(paused) = hitl.ask_user(&scope) else {
            panic!("expected pause");
        };
        assert!(paused.to_string().contains("Waiting for human input"));
        assert_eq!(paused.pending_key(), Some("humanInput"));
    }

    #[test]
    fn custom_key_pauses_with_custom_reason() {
        let hitl = DurableHumanInTheLoop::builder()
            .output_key("approval")
            .reason("Waiting for manager")
            .build();
        let scope = FixedScope(HashMap::from([("humanInput", Value::from("ignored"))]));

        let err = hitl.ask_user(&scope).into_result().unwrap_err();
        assert!(err.to_string().contains("Waiting for manager"));
        assert_eq!(err.reason(), "Waiting for manager");
    }

    #[test]
    fn returns_scope_value_once_present() {
        let hitl = DurableHumanInTheLoop::builder()
            .output_key("approval")
            .reason("Waiting for manager")
            .build();
        let scope = FixedScope(HashMap::from([("approval", Value::from("approved"))]));

        assert_eq!(
            hitl.ask_user(&scope),
            Outcome::Resumed(Value::from("approved"))
        );
    }

    #[test]
    fn replays_after_input_is_injected() {
        let hitl = DurableHumanInTheLoop::default();
        let scope = AgenticScope::new();

        assert!(hitl.ask_user(&scope).is_paused());
        scope.write_state("humanInput", "yes");
        assert_eq!(hitl.ask_user(&scope).into_result(), Ok(Value::from("yes")));
        // Asking again does not consume the answer.
        assert_eq!(hitl.ask_user(&scope).into_result(), Ok(Value::from("yes")));
    }

    #[test]
    fn builder_setters_round_trip() {
        let hitl = DurableHumanInTheLoop::builder()
            .output_key("k")
            .description("Approve the refund")
            .async_mode(true)
            .reason("r")
            .build();

        assert_eq!(hitl.output_key(), "k");
        assert_eq!(hitl.description(), "Approve the refund");
        assert!(hitl.is_async());
        assert_eq!(hitl.reason(), "r");
    }

    #[test]
    fn outcome_map_keeps_pause() {
        let paused: Outcome<i32> = Outcome::Paused(TaskPaused::new("x"));
        assert!(paused.map(|v| v + 1).is_paused());
        assert_eq!(Outcome::Resumed(1).map(|v| v + 1), Outcome::Resumed(2));
    }
}
