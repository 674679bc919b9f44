//! Typed configuration for Conduit.
//!
//! Settings are loaded in layers (defaults, then a TOML or JSON file, then
//! `CONDUIT__SECTION__KEY` environment variables) into [`ConduitConfig`].
//! Unknown fields are rejected.
//!
//! # Configuration File Format
//!
//! ```toml
//! [versioning]
//! default_behaviour = "latest"   # latest | oldest | none
//! warn_on_missing_version = false
//!
//! [logging]
//! enabled = true
//! level = "info"
//! format = "json"                # json | pretty | compact
//! span_events = false
//! include_location = false
//! include_target = true
//! ```
//!
//! # Example
//!
//! ```
//! use conduit_config::ConfigLoader;
//!
//! # fn main() -> Result<(), conduit_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_string("[logging]\nlevel = \"debug\"", "toml")?
//!     .with_env_prefix("CONDUIT")
//!     .load()?;
//!
//! let log_config = config.logging.to_log_config();
//! assert_eq!(log_config.level, "debug");
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/conduit-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::ConduitConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{LoggingConfig, VersioningConfig};

pub use conduit_telemetry::LogFormat;
