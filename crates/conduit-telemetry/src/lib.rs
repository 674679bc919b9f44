//! Observability helpers for Conduit.
//!
//! - **Logging**: `tracing-subscriber` setup with JSON or human-readable output
//! - **Metrics**: request, route-miss and version-selection metrics recorded
//!   through the `metrics` facade
//!
//! # Example
//!
//! ```rust,ignore
//! use conduit_telemetry::{init_logging, LogConfig};
//!
//! fn main() {
//!     init_logging(&LogConfig::production()).expect("logging");
//!     conduit_telemetry::metrics::describe_metrics();
//! }
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig, LogFormat};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
