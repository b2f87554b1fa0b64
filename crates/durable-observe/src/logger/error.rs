use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoggerError {
    #[error("unknown log format {0:?}, expected text, json or journald")]
    InvalidFormat(String),

    #[error("journald output needs linux and the `journald` feature")]
    JournaldNotSupported,

    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,

    #[error("logger setup failed: {0}")]
    InitializationFailed(String),

    #[error("bad log filter {directive:?}: {reason}")]
    InvalidLogLevel { directive: String, reason: String },
}
