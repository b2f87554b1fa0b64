mod config;
mod error;
mod format;
mod layer;

pub use config::{LOG_FORMAT_ENV, LOG_LEVEL_ENV, LoggerConfig};
pub use error::LoggerError;
pub use format::LoggerFormat;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the process-wide `tracing` subscriber described by `cfg`.
///
/// Can succeed once per process; later calls return
/// [`LoggerError::AlreadyInitialized`].
pub fn logger_init(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    let filter = layer::env_filter(&cfg.level)?;
    let output = layer::output_layer(cfg)?;

    tracing_subscriber::registry()
        .with(output)
        .with(filter)
        .try_init()
        .map_err(|e| layer::install_error(e.to_string()))
}
