use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid task status: {0} (expected: pending|running|paused|completed|failed|cancelled)")]
    InvalidStatus(String),
}
