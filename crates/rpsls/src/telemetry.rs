//! Tracing subscriber setup.
//!
//! Library crates only emit `tracing` events. Binaries call
//! [`init_tracing`] once at startup to decide where those events go.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::RpslsError;

/// Environment variable holding the filter directive, e.g. `debug` or
/// `info,rpsls_session=trace`.
pub const LOG_ENV: &str = "RPSLS_LOG";

/// Environment variable selecting the output format (`text` or `json`).
pub const LOG_FORMAT_ENV: &str = "RPSLS_LOG_FORMAT";

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Json => f.write_str("json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = RpslsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(RpslsError::Telemetry(format!("unknown log format {other:?}"))),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl LogConfig {
    /// Reads [`LOG_ENV`] and [`LOG_FORMAT_ENV`], falling back to the
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            level: lookup(LOG_ENV)
                .filter(|level| !level.trim().is_empty())
                .unwrap_or(defaults.level),
            format: lookup(LOG_FORMAT_ENV)
                .and_then(|format| format.parse().ok())
                .unwrap_or(defaults.format),
        }
    }
}

/// Installs the global tracing subscriber.
///
/// # Errors
/// [`RpslsError::Telemetry`] if the filter directive doesn't parse or a
/// global subscriber is already installed.
pub fn init_tracing(config: &LogConfig) -> Result<(), RpslsError> {
    let filter =
        EnvFilter::try_new(&config.level).map_err(|e| RpslsError::Telemetry(e.to_string()))?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match config.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|e| RpslsError::Telemetry(e.to_string()))?;

    tracing::debug!(level = %config.level, format = %config.format, "tracing initialised");
    Ok(())
}
