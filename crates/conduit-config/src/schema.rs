//! Configuration sections.

use conduit_core::DefaultVersionBehaviour;
use conduit_telemetry::{LogConfig, LogFormat};
use serde::{Deserialize, Serialize};

/// API version selection settings.
///
/// # Example
///
/// ```
/// use conduit_config::VersioningConfig;
/// use conduit_core::DefaultVersionBehaviour;
///
/// let config = VersioningConfig {
///     default_behaviour: DefaultVersionBehaviour::Oldest,
///     warn_on_missing_version: true,
/// };
/// assert_ne!(config, VersioningConfig::default());
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct VersioningConfig {
    /// Which registered version answers requests that name none.
    #[serde(default)]
    pub default_behaviour: DefaultVersionBehaviour,

    /// Log a warning whenever a request arrives without a resource version.
    #[serde(default)]
    pub warn_on_missing_version: bool,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive, e.g. `info` or `conduit_router=debug,info`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Emit span open and close events.
    #[serde(default)]
    pub span_events: bool,

    /// Include source file and line in logs.
    #[serde(default)]
    pub include_location: bool,

    /// Include the event target (module path).
    #[serde(default = "default_true")]
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            span_events: false,
            include_location: false,
            include_target: true,
        }
    }
}

impl LoggingConfig {
    /// Converts this section into the subscriber settings used by
    /// [`conduit_telemetry::init_logging`].
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            format: self.format,
            span_events: self.span_events,
            file_line_info: self.include_location,
            include_target: self.include_target,
        }
    }
}

const fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}
