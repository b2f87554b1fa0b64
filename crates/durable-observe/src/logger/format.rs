use std::{fmt, str::FromStr};

use crate::logger::error::LoggerError;

/// Where and how log lines are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoggerFormat {
    /// Human readable lines on stdout.
    #[default]
    Text,
    /// One JSON object per line on stdout.
    Json,
    /// Native journald records.
    Journald,
}

impl LoggerFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            LoggerFormat::Text => "text",
            LoggerFormat::Json => "json",
            LoggerFormat::Journald => "journald",
        }
    }

    /// Whether this build can emit the format at all.
    pub fn is_available(self) -> bool {
        match self {
            LoggerFormat::Journald => cfg!(all(target_os = "linux", feature = "journald")),
            LoggerFormat::Text | LoggerFormat::Json => true,
        }
    }
}

impl fmt::Display for LoggerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoggerFormat {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let format = match s.trim().to_ascii_lowercase().as_str() {
            "text" | "plain" => LoggerFormat::Text,
            "json" => LoggerFormat::Json,
            "journald" | "journal" => LoggerFormat::Journald,
            _ => return Err(LoggerError::InvalidFormat(s.to_string())),
        };
        if !format.is_available() {
            return Err(LoggerError::JournaldNotSupported);
        }
        Ok(format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(" Text ".parse::<LoggerFormat>(), Ok(LoggerFormat::Text));
        assert_eq!("JSON".parse::<LoggerFormat>(), Ok(LoggerFormat::Json));
        assert_eq!("plain".parse::<LoggerFormat>(), Ok(LoggerFormat::Text));
    }

    #[test]
    fn rejects_unknown_format() {
        assert_eq!(
            "yaml".parse::<LoggerFormat>(),
            Err(LoggerError::InvalidFormat("yaml".into()))
        );
    }

    #[test]
    fn display_round_trips_through_parse() {
        for format in [LoggerFormat::Text, LoggerFormat::Json] {
            assert_eq!(format.to_string().parse::<LoggerFormat>(), Ok(format));
        }
    }

    #[cfg(not(feature = "journald"))]
    #[test]
    fn journald_requires_feature() {
        assert!(!LoggerFormat::Journald.is_available());
        assert_eq!(
            "journald".parse::<LoggerFormat>(),
            Err(LoggerError::JournaldNotSupported)
        );
    }
}
