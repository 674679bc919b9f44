//! Structured logging setup.
//!
//! Conduit components emit `tracing` events and spans; this module installs
//! a `tracing-subscriber` registry that renders them as JSON lines for
//! production or in a human-readable form for development.
//!
//! # Example
//!
//! ```rust,ignore
//! use conduit_telemetry::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! tracing::info!(resource_path = "users/42", "dispatching");
//! ```

use crate::error::TelemetryError;
use crate::TelemetryResult;
use serde::{Deserialize, Serialize};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Multi-line human-readable output.
    Pretty,
    /// Single-line human-readable output.
    Compact,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Filter directive (e.g., "info", "conduit_router=debug").
    pub level: String,

    /// Output format.
    pub format: LogFormat,

    /// Whether to emit span open/close events.
    pub span_events: bool,

    /// Whether to include file/line info.
    pub file_line_info: bool,

    /// Whether to include target (module path).
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            format: LogFormat::Json,
            span_events: false,
            file_line_info: false,
            include_target: true,
        }
    }
}

impl LogConfig {
    /// Creates a development configuration with human-readable output.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            level: "debug".to_string(),
            format: LogFormat::Pretty,
            span_events: true,
            file_line_info: true,
            include_target: true,
        }
    }

    /// Creates a production configuration with JSON output.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns `TelemetryError::LoggingInit` if the filter directive is invalid
/// or a global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.level)?;

    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let base = tracing_subscriber::fmt::layer()
        .with_span_events(span_events)
        .with_file(config.file_line_info)
        .with_line_number(config.file_line_info)
        .with_target(config.include_target);

    let layer = match config.format {
        LogFormat::Json => base.json().with_filter(filter).boxed(),
        LogFormat::Pretty => base.pretty().with_filter(filter).boxed(),
        LogFormat::Compact => base.compact().with_filter(filter).boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

/// Creates an env filter from a directive string.
///
/// # Errors
///
/// Returns an error if the directive is invalid.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter)
        .map_err(|e| TelemetryError::LoggingInit(format!("Invalid log level: {e}")))
}

/// Standard log field names used across Conduit.
pub mod fields {
    /// Context id of the dispatch.
    pub const CONTEXT_ID: &str = "context_id";

    /// Request type (create, read, ...).
    pub const REQUEST_TYPE: &str = "request_type";

    /// Resource path of the request.
    pub const RESOURCE_PATH: &str = "resource_path";

    /// Template of the matched route.
    pub const ROUTE: &str = "route";

    /// Selected API version.
    pub const VERSION: &str = "version";

    /// Duration field name (in milliseconds).
    pub const DURATION_MS: &str = "duration_ms";

    /// Error field name.
    pub const ERROR: &str = "error";
}
