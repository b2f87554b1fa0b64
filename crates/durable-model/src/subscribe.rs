use crate::TaskEvent;

/// Receives every journal entry the orchestrator records.
///
/// Called synchronously on the thread that produced the event; keep it cheap.
pub trait Subscribe: Send + Sync + 'static {
    fn name(&self) -> &'static str {
        "subscriber"
    }

    fn on_event(&self, event: &TaskEvent);
}
