use time::{UtcOffset, format_description::well_known::Rfc3339};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, fmt::time::OffsetTime};

use crate::logger::{config::LoggerConfig, error::LoggerError, format::LoggerFormat};

pub(crate) type OutputLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

pub(crate) fn env_filter(directive: &str) -> Result<EnvFilter, LoggerError> {
    EnvFilter::builder()
        .parse(directive)
        .map_err(|e| LoggerError::InvalidLogLevel {
            directive: directive.to_string(),
            reason: e.to_string(),
        })
}

pub(crate) fn output_layer(cfg: &LoggerConfig) -> Result<OutputLayer, LoggerError> {
    let layer: OutputLayer = match cfg.format {
        LoggerFormat::Text => fmt::layer()
            .with_ansi(cfg.use_color)
            .with_target(cfg.with_targets)
            .with_timer(local_timer())
            .boxed(),
        LoggerFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(cfg.with_targets)
            .with_timer(local_timer())
            .boxed(),
        LoggerFormat::Journald => journald_layer()?,
    };
    Ok(layer)
}

/// RFC3339 timestamps in the local offset, UTC when it cannot be determined.
fn local_timer() -> OffsetTime<Rfc3339> {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetTime::new(offset, Rfc3339)
}

pub(crate) fn install_error(message: String) -> LoggerError {
    if message.contains("global default") {
        LoggerError::AlreadyInitialized
    } else {
        LoggerError::InitializationFailed(message)
    }
}

#[cfg(all(target_os = "linux", feature = "journald"))]
fn journald_layer() -> Result<OutputLayer, LoggerError> {
    let layer = tracing_journald::layer()
        .map_err(|e| LoggerError::InitializationFailed(format!("journald: {e}")))?
        .with_syslog_identifier("durable".to_string());
    Ok(layer.boxed())
}

#[cfg(not(all(target_os = "linux", feature = "journald")))]
fn journald_layer() -> Result<OutputLayer, LoggerError> {
    Err(LoggerError::JournaldNotSupported)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_directive_is_reported_with_reason() {
        let err = env_filter("durable_core=loud").unwrap_err();
        match err {
            LoggerError::InvalidLogLevel { directive, reason } => {
                assert_eq!(directive, "durable_core=loud");
                assert!(!reason.is_empty());
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn accepts_per_crate_directives() {
        assert!(env_filter("info,durable_core=debug").is_ok());
    }

    #[test]
    fn install_error_classification() {
        assert_eq!(
            install_error("a global default trace dispatcher has already been set".into()),
            LoggerError::AlreadyInitialized
        );
        assert_eq!(
            install_error("boom".into()),
            LoggerError::InitializationFailed("boom".into())
        );
    }

    #[test]
    fn text_and_json_layers_build() {
        let cfg = LoggerConfig::default();
        assert!(output_layer(&cfg).is_ok());
        assert!(output_layer(&cfg.with_format(LoggerFormat::Json)).is_ok());
    }
}
