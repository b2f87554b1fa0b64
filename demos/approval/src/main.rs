use std::{sync::Arc, time::Duration};

use anyhow::{Context, bail};
use serde_json::json;
use tracing::info;

use durable_core::{
    AgentError, AgenticScope, DurableHumanInTheLoop, OrchestratorConfig, ScopeState, Subscribe,
    TaskConfig, TaskOrchestrator, TaskQuery, TaskStatus, WorkflowFn,
};
use durable_observe::{Journal, LoggerConfig, logger_init};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1) Logger
    // DURABLE_LOG / DURABLE_LOG_FORMAT override the defaults.
    let cfg = LoggerConfig::from_env()?;
    logger_init(&cfg)?;
    info!("logger initialized");

    // 2) Orchestrator
    let subscribers: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Journal::new())];
    let orchestrator = TaskOrchestrator::new(
        OrchestratorConfig::default().with_shutdown_grace(Duration::from_secs(5)),
        subscribers,
    );
    info!("orchestrator ready");

    // 3) Workflow: draft a request, wait for a manager, then finish
    let approval = DurableHumanInTheLoop::builder()
        .output_key("approval")
        .reason("Waiting for manager approval")
        .description("Manager decides on the expense request")
        .async_mode(true)
        .build();
    let workflow = WorkflowFn::arc("expense-approval", move |scope: Arc<AgenticScope>| {
        let approval = approval.clone();
        async move {
            if !scope.has_state("draft") {
                let amount = scope.read_state("amount").unwrap_or(json!(0));
                scope.write_state("draft", json!({ "amount": amount, "currency": "EUR" }));
            }
            let decision = approval.ask_user(&*scope).into_result()?;
            Ok::<_, AgentError>(json!({
                "draft": scope.read_state("draft"),
                "decision": decision,
            }))
        }
    });

    // 4) Start and wait for the pause
    let handle = orchestrator.start(
        TaskConfig::new("expense-approval").with_state("amount", 420),
        workflow,
    )?;
    info!(task = %handle.id(), "task submitted");

    tokio::time::timeout(Duration::from_secs(5), async {
        while handle.status() != TaskStatus::Paused {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .context("task never paused")?;

    let paused = orchestrator.list(&TaskQuery::new().with_status(TaskStatus::Paused));
    info!(paused = paused.total, "tasks waiting for input");

    // 5) Manager answers; the same handle completes
    orchestrator.resume(handle.id(), "approval", "approved")?;
    let result = handle.await_result().await?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if handle.status() != TaskStatus::Completed {
        bail!("unexpected final status {}", handle.status());
    }
    for event in orchestrator.events(handle.id()) {
        info!(kind = event.kind.name(), "journal");
    }

    // 6) Shutdown
    orchestrator.cleanup(handle.id())?;
    if !orchestrator.shutdown().await {
        bail!("workers did not stop within grace period");
    }
    info!("orchestrator stopped");
    Ok(())
}
