//! Layered configuration loader.

use std::env;
use std::fs;
use std::path::Path;

use conduit_core::DefaultVersionBehaviour;
use conduit_telemetry::LogFormat;

use crate::{ConduitConfig, ConfigError};

/// Loads [`ConduitConfig`] in layers, later layers overriding earlier ones:
///
/// 1. Built-in defaults or a preset
/// 2. A TOML or JSON file
/// 3. Environment variables named `PREFIX__SECTION__KEY`
///
/// # Example
///
/// ```no_run
/// use conduit_config::ConfigLoader;
///
/// # fn main() -> Result<(), conduit_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_defaults()
///     .with_optional_file("conduit.toml")?
///     .with_env_prefix("CONDUIT")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config: ConduitConfig,
    env_prefix: Option<String>,
}

impl ConfigLoader {
    /// Creates a loader starting from the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets to the default configuration.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = ConduitConfig::default();
        self
    }

    /// Resets to the development preset.
    ///
    /// ```
    /// use conduit_config::{ConfigLoader, LogFormat};
    ///
    /// let config = ConfigLoader::new().with_development().load().unwrap();
    /// assert_eq!(config.logging.format, LogFormat::Pretty);
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = ConduitConfig::development();
        self
    }

    /// Resets to the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = ConduitConfig::production();
        self
    }

    /// Loads a configuration file, choosing the parser by extension
    /// (`.toml` or `.json`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing or unreadable, has an
    /// unsupported extension, or does not parse (unknown fields included).
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        self.config = parse(&content, &format).map_err(|e| match e {
            ConfigError::ValidationError(_) => ConfigError::validation_error(format!(
                "unsupported configuration file format: {}",
                path.display()
            )),
            other => other,
        })?;

        Ok(self)
    }

    /// Loads a configuration file if it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Loads configuration from a string in the given format (`toml` or
    /// `json`).
    ///
    /// ```
    /// use conduit_config::ConfigLoader;
    /// use conduit_core::DefaultVersionBehaviour;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[versioning]\ndefault_behaviour = \"oldest\"", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.versioning.default_behaviour, DefaultVersionBehaviour::Oldest);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails or the format is unknown.
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = parse(content, &format.to_lowercase())?;
        Ok(self)
    }

    /// Enables environment overrides named `PREFIX__SECTION__KEY`, for
    /// example `CONDUIT__LOGGING__LEVEL=debug`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Applies environment overrides, validates, and returns the result.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override cannot be parsed or validation
    /// fails.
    pub fn load(mut self) -> Result<ConduitConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            let vars: Vec<(String, String)> = env::vars()
                .filter(|(k, _)| k.starts_with(&prefix))
                .collect();
            for (key, value) in vars {
                self.apply_env_var(&key, &value, &prefix)?;
            }
        }

        self.config.validate()?;
        Ok(self.config)
    }

    /// Returns the configuration without overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> ConduitConfig {
        self.config
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let path = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::env_parse_error(key, "invalid key format"))?;

        let parts: Vec<&str> = path.split("__").collect();
        let versioning = &mut self.config.versioning;
        let logging = &mut self.config.logging;

        match parts.as_slice() {
            ["VERSIONING", "DEFAULT_BEHAVIOUR"] => {
                versioning.default_behaviour = match value.to_lowercase().as_str() {
                    "latest" => DefaultVersionBehaviour::Latest,
                    "oldest" => DefaultVersionBehaviour::Oldest,
                    "none" => DefaultVersionBehaviour::None,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'latest', 'oldest' or 'none'",
                        ))
                    }
                };
            }
            ["VERSIONING", "WARN_ON_MISSING_VERSION"] => {
                versioning.warn_on_missing_version = bool_var(key, value)?;
            }

            ["LOGGING", "ENABLED"] => logging.enabled = bool_var(key, value)?,
            ["LOGGING", "LEVEL"] => logging.level = value.to_string(),
            ["LOGGING", "FORMAT"] => {
                logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    "compact" => LogFormat::Compact,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json', 'pretty' or 'compact'",
                        ))
                    }
                };
            }
            ["LOGGING", "SPAN_EVENTS"] => logging.span_events = bool_var(key, value)?,
            ["LOGGING", "INCLUDE_LOCATION"] => logging.include_location = bool_var(key, value)?,
            ["LOGGING", "INCLUDE_TARGET"] => logging.include_target = bool_var(key, value)?,

            // Unrelated variables sharing the prefix are ignored.
            _ => {}
        }

        Ok(())
    }
}

fn parse(content: &str, format: &str) -> Result<ConduitConfig, ConfigError> {
    match format {
        "toml" => Ok(toml::from_str(content)?),
        "json" => Ok(serde_json::from_str(content)?),
        _ => Err(ConfigError::validation_error(format!(
            "unsupported configuration format: {format}"
        ))),
    }
}

fn bool_var(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loader_new() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config, ConduitConfig::default());
    }

    #[test]
    fn test_loader_with_string_json() {
        let json = r#"{"versioning": {"default_behaviour": "none", "warn_on_missing_version": true}}"#;

        let config = ConfigLoader::new()
            .with_string(json, "JSON")
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.versioning.default_behaviour, DefaultVersionBehaviour::None);
        assert!(config.versioning.warn_on_missing_version);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_loader_rejects_unknown_section() {
        let result = ConfigLoader::new().with_string("[server]\nport = 8080", "toml");
        assert!(matches!(result, Err(ConfigError::TomlError(_))));
    }

    #[test]
    fn test_loader_rejects_unknown_format() {
        let result = ConfigLoader::new().with_string("versioning: {}", "yaml");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_load_validates() {
        let result = ConfigLoader::new()
            .with_string("[logging]\nlevel = \"\"", "toml")
            .unwrap()
            .load();
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_load_unvalidated_skips_validation() {
        let config = ConfigLoader::new()
            .with_string("[logging]\nlevel = \"\"", "toml")
            .unwrap()
            .load_unvalidated();
        assert!(config.logging.level.is_empty());
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("YES"), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }

    // Overrides are applied through `apply_env_var` directly; mutating the
    // process environment would need `unsafe`, which the workspace forbids.

    #[test]
    fn test_apply_env_var_versioning() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_var("TEST__VERSIONING__DEFAULT_BEHAVIOUR", "Oldest", "TEST")
            .unwrap();
        loader
            .apply_env_var("TEST__VERSIONING__WARN_ON_MISSING_VERSION", "on", "TEST")
            .unwrap();
        assert_eq!(
            loader.config.versioning.default_behaviour,
            DefaultVersionBehaviour::Oldest
        );
        assert!(loader.config.versioning.warn_on_missing_version);
    }

    #[test]
    fn test_apply_env_var_logging() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("TEST__LOGGING__LEVEL", "debug", "TEST").unwrap();
        loader.apply_env_var("TEST__LOGGING__FORMAT", "compact", "TEST").unwrap();
        loader.apply_env_var("TEST__LOGGING__ENABLED", "false", "TEST").unwrap();
        assert_eq!(loader.config.logging.level, "debug");
        assert_eq!(loader.config.logging.format, LogFormat::Compact);
        assert!(!loader.config.logging.enabled);
    }

    #[test]
    fn test_apply_env_var_invalid_values() {
        let mut loader = ConfigLoader::new();
        assert!(loader
            .apply_env_var("TEST__VERSIONING__DEFAULT_BEHAVIOUR", "newest", "TEST")
            .is_err());
        assert!(loader
            .apply_env_var("TEST__LOGGING__SPAN_EVENTS", "sometimes", "TEST")
            .is_err());
        assert!(loader.apply_env_var("TESTLOGGING", "x", "TEST").is_err());
    }

    #[test]
    fn test_apply_env_var_ignores_unknown_keys() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("TEST__SERVER__PORT", "80", "TEST").unwrap();
        assert_eq!(loader.config, ConduitConfig::default());
    }
}
