use std::borrow::Borrow;

use durable_model::{TaskEvent, TaskEventKind};
use tracing::{debug, error, info, warn};

/// Flat accessors over a [`TaskEvent`] for log formatting.
pub trait View {
    fn as_task(&self) -> &str;
    fn as_reason(&self) -> &str;
    fn pending_key(&self) -> &str;
    fn timeout_ms(&self) -> u64;
    fn kind(&self) -> &TaskEventKind;
}

impl<T> View for T
where
    T: Borrow<TaskEvent>,
{
    #[inline]
    fn as_task(&self) -> &str {
        self.borrow().task_id.as_str()
    }
    #[inline]
    fn as_reason(&self) -> &str {
        match &self.borrow().kind {
            TaskEventKind::Paused { reason, .. } | TaskEventKind::Failed { reason } => reason,
            _ => "unknown",
        }
    }
    #[inline]
    fn pending_key(&self) -> &str {
        match &self.borrow().kind {
            TaskEventKind::Paused {
                pending_key: Some(key),
                ..
            }
            | TaskEventKind::InputProvided { key } => key,
            _ => "none",
        }
    }
    #[inline]
    fn timeout_ms(&self) -> u64 {
        match self.borrow().kind {
            TaskEventKind::TimedOut { timeout_ms } => timeout_ms,
            _ => 0,
        }
    }
    #[inline]
    fn kind(&self) -> &TaskEventKind {
        &self.borrow().kind
    }
}

#[inline]
pub fn message_for(kind: &TaskEventKind) -> &'static str {
    match kind {
        // lifecycle
        TaskEventKind::Started { .. } => "task started",
        TaskEventKind::Completed { .. } => "task completed",
        TaskEventKind::Failed { .. } => "task failed",
        TaskEventKind::Cancelled => "task cancelled",
        TaskEventKind::TimedOut { .. } => "task exceeded its configured timeout",

        // suspension
        TaskEventKind::Paused { .. } => "task paused waiting for external input",
        TaskEventKind::InputProvided { .. } => "external input stored in task scope",
        TaskEventKind::Resumed => "paused task re-dispatched",
    }
}

#[inline]
pub fn log_event<E: View>(e: E) {
    let msg = message_for(e.kind());

    match e.kind() {
        TaskEventKind::Started { agent_name } => {
            info!(task = e.as_task(), agent = %agent_name, "{msg}")
        }
        TaskEventKind::Completed { result } => {
            info!(task = e.as_task(), has_result = result.is_some(), "{msg}")
        }
        TaskEventKind::Failed { .. } => {
            error!(task = e.as_task(), reason = e.as_reason(), "{msg}")
        }
        TaskEventKind::Cancelled => info!(task = e.as_task(), "{msg}"),
        TaskEventKind::TimedOut { .. } => {
            warn!(task = e.as_task(), timeout_ms = e.timeout_ms(), "{msg}")
        }

        TaskEventKind::Paused { .. } => info!(
            task = e.as_task(),
            reason = e.as_reason(),
            pending_key = e.pending_key(),
            "{msg}"
        ),
        TaskEventKind::InputProvided { .. } => {
            debug!(task = e.as_task(), key = e.pending_key(), "{msg}")
        }
        TaskEventKind::Resumed => info!(task = e.as_task(), "{msg}"),
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        sync::{Arc, Mutex},
    };

    use durable_model::TaskId;

    use super::*;

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

    fn captured(event: TaskEvent) -> String {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();
        tracing::subscriber::with_default(subscriber, || log_event(&event));
        let bytes = capture.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn view_reads_kind_specific_fields() {
        let paused = TaskEvent::now(
            TaskId::from("t-1"),
            TaskEventKind::Paused {
                reason: "Waiting for manager".into(),
                pending_key: Some("approval".into()),
            },
        );
        assert_eq!(paused.as_task(), "t-1");
        assert_eq!(paused.as_reason(), "Waiting for manager");
        assert_eq!(paused.pending_key(), "approval");
        assert_eq!(paused.timeout_ms(), 0);

        let timed_out = TaskEvent::now(TaskId::from("t-2"), TaskEventKind::TimedOut { timeout_ms: 50 });
        assert_eq!(timed_out.timeout_ms(), 50);
        assert_eq!(timed_out.as_reason(), "unknown");
    }

    #[test]
    fn failure_logs_at_error_with_reason() {
        let out = captured(TaskEvent::now(
            TaskId::from("t-3"),
            TaskEventKind::Failed {
                reason: "model unavailable".into(),
            },
        ));
        assert!(out.contains("ERROR"));
        assert!(out.contains("task failed"));
        assert!(out.contains("t-3"));
        assert!(out.contains("model unavailable"));
    }

    #[test]
    fn timeout_logs_at_warn() {
        let out = captured(TaskEvent::now(
            TaskId::from("t-4"),
            TaskEventKind::TimedOut { timeout_ms: 250 },
        ));
        assert!(out.contains("WARN"));
        assert!(out.contains("timeout_ms=250"));
    }
}
