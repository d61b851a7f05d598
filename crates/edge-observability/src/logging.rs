//! Global subscriber installation.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt as fmt_layer, EnvFilter};

/// Output format for logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON lines (for production/log aggregation).
    Json,
    /// Human-readable format (for development).
    #[default]
    Human,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Human => write!(f, "human"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "human" | "pretty" | "text" => Ok(Self::Human),
            other => Err(LoggingError::UnknownFormat(other.to_string())),
        }
    }
}

/// Errors raised while configuring logging.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("unknown log format: {0}")]
    UnknownFormat(String),

    #[error("failed to install tracing subscriber: {0}")]
    Install(String),
}

/// Logging settings.
#[derive(Debug, Clone)]
pub struct LogSettings {
    /// Output format.
    pub format: LogFormat,
    /// Filter used when `RUST_LOG` is not set.
    pub default_directive: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::Human,
            default_directive: "info".to_string(),
        }
    }
}

impl LogSettings {
    /// Settings with the given format and the default filter.
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    /// Set the filter used when `RUST_LOG` is not set.
    pub fn with_default_directive(mut self, directive: impl Into<String>) -> Self {
        self.default_directive = directive.into();
        self
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.default_directive))
    }
}

/// Install a global tracing subscriber writing to stderr.
///
/// `RUST_LOG` takes precedence over the default directive. Fails if a
/// global subscriber is already installed.
pub fn init_tracing(settings: &LogSettings) -> Result<(), LoggingError> {
    let layer = match settings.format {
        LogFormat::Json => fmt_layer::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Human => fmt_layer::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(settings.env_filter())
        .with(layer)
        .try_init()
        .map_err(|err| LoggingError::Install(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("Human".parse::<LogFormat>().unwrap(), LogFormat::Human);
        assert!(matches!(
            "xml".parse::<LogFormat>(),
            Err(LoggingError::UnknownFormat(f)) if f == "xml"
        ));
    }

    #[test]
    fn test_deserialize_format() {
        let format: LogFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(format, LogFormat::Json);
        assert_eq!(format.to_string(), "json");
    }

    #[test]
    fn test_settings_builder() {
        let settings = LogSettings::new(LogFormat::Json).with_default_directive("edge=debug");
        assert_eq!(settings.format, LogFormat::Json);
        assert_eq!(settings.default_directive, "edge=debug");
    }
}
