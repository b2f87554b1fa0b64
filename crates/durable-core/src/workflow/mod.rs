use std::{future::Future, sync::Arc};

use async_trait::async_trait;
use durable_model::Value;

use crate::{error::AgentError, scope::AgenticScope};

/// Shared, dynamically dispatched workflow.
pub type WorkflowRef = Arc<dyn Workflow>;

/// Unit of agent work the orchestrator can run, pause and re-run.
///
/// A workflow is invoked from the top on every dispatch, including resumes,
/// against the same task scope. Steps that already happened should be written
/// so that replaying them is harmless (for example by caching their outputs in
/// the scope).
#[async_trait]
pub trait Workflow: Send + Sync + 'static {
    fn name(&self) -> &str;

    async fn run(&self, scope: Arc<AgenticScope>) -> Result<Value, AgentError>;
}

/// Closure-backed [`Workflow`].
pub struct WorkflowFn<F> {
    name: String,
    f: F,
}

impl<F, Fut> WorkflowFn<F>
where
    F: Fn(Arc<AgenticScope>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, AgentError>> + Send + 'static,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    pub fn arc(name: impl Into<String>, f: F) -> WorkflowRef {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Workflow for WorkflowFn<F>
where
    F: Fn(Arc<AgenticScope>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, AgentError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, scope: Arc<AgenticScope>) -> Result<Value, AgentError> {
        (self.f)(scope).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::ScopeState;

    #[tokio::test]
    async fn closure_workflow_reads_scope() {
        let wf = WorkflowFn::arc("echo", |scope: Arc<AgenticScope>| async move {
            scope
                .read_state("input")
                .ok_or_else(|| AgentError::failed("missing input"))
        });
        assert_eq!(wf.name(), "echo");

        let scope = Arc::new(AgenticScope::new());
        assert_eq!(
            wf.run(Arc::clone(&scope)).await,
            Err(AgentError::Failed("missing input".into()))
        );

        scope.write_state("input", 5);
        assert_eq!(wf.run(scope).await, Ok(Value::from(5)));
    }
}
