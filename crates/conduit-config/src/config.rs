//! Root configuration type.

use conduit_telemetry::logging::create_env_filter;
use conduit_telemetry::LogFormat;
use serde::{Deserialize, Serialize};

use crate::{ConfigError, LoggingConfig, VersioningConfig};

/// Complete Conduit configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use conduit_config::ConduitConfig;
/// use conduit_core::DefaultVersionBehaviour;
///
/// let config = ConduitConfig::default();
/// assert_eq!(config.versioning.default_behaviour, DefaultVersionBehaviour::Latest);
/// assert_eq!(config.logging.level, "info");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct ConduitConfig {
    /// Version selection.
    #[serde(default)]
    pub versioning: VersioningConfig,

    /// Logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ConduitConfig {
    /// Development preset: verbose, human-readable logs and warnings for
    /// requests that name no version.
    #[must_use]
    pub fn development() -> Self {
        Self {
            versioning: VersioningConfig {
                warn_on_missing_version: true,
                ..VersioningConfig::default()
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
                format: LogFormat::Pretty,
                span_events: true,
                include_location: true,
                ..LoggingConfig::default()
            },
        }
    }

    /// Production preset: JSON logs at `info`.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the log level is not a valid
    /// filter directive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "logging.level",
                "must not be empty",
            ));
        }
        if let Err(e) = create_env_filter(&self.logging.level) {
            return Err(ConfigError::invalid_value("logging.level", e.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(ConduitConfig::default().validate().is_ok());
        assert!(ConduitConfig::development().validate().is_ok());
    }

    #[test]
    fn test_empty_level_rejected() {
        let mut config = ConduitConfig::default();
        config.logging.level = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "logging.level"));
    }

    #[test]
    fn test_invalid_directive_rejected() {
        let mut config = ConduitConfig::default();
        config.logging.level = "conduit_router=verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_development_preset() {
        let config = ConduitConfig::development();
        assert!(config.versioning.warn_on_missing_version);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.logging.to_log_config().level, "debug");
    }
}
