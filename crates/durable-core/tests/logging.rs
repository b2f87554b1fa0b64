use std::{
    io,
    sync::{Arc, Mutex},
    time::Duration,
};

use durable_core::{AgenticScope, TaskConfig, TaskOrchestrator, Value, WorkflowFn};

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// Lifecycle lines at info belong to the journal subscriber; the orchestrator
// itself stays at debug so the two never double up.
#[tokio::test]
async fn lifecycle_is_not_logged_at_info_by_the_orchestrator() {
    let capture = Capture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let orch = TaskOrchestrator::default();
    let wf = WorkflowFn::arc("echo", |_scope: Arc<AgenticScope>| async move {
        Ok(Value::from(1))
    });
    let handle = orch.start(TaskConfig::new("echo"), wf).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle.await_result())
        .await
        .unwrap()
        .unwrap();

    let out = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
    assert!(
        !out.contains("durable_core::orchestrator"),
        "unexpected info output:\n{out}"
    );
}
