//! Logging setup and a journal subscriber that mirrors task events into `tracing`.

mod logger;
pub use logger::*;

mod subscriber;
pub use subscriber::*;
