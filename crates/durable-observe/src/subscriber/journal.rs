use durable_model::{Subscribe, TaskEvent};

use crate::subscriber::view::log_event;

/// Writes every task event to the `tracing` pipeline.
#[derive(Debug, Default, Clone, Copy)]
pub struct Journal;

impl Journal {
    pub fn new() -> Self {
        Self
    }
}

impl Subscribe for Journal {
    fn name(&self) -> &'static str {
        "journal"
    }

    fn on_event(&self, event: &TaskEvent) {
        log_event(event);
    }
}
