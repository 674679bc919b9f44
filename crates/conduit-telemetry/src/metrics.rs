//! Dispatch metrics.
//!
//! Metrics are recorded through the `metrics` facade; installing a recorder
//! (Prometheus, StatsD, ...) is left to the host application. Without a
//! recorder every call is a no-op.
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `conduit_requests_total` | Counter | `request_type`, `outcome` | Dispatched requests |
//! | `conduit_request_duration_seconds` | Histogram | `request_type` | Dispatch latency |
//! | `conduit_route_misses_total` | Counter | - | Paths no route matched |
//! | `conduit_version_selections_total` | Counter | `version`, `defaulted` | Version selections |

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Duration;

/// Outcome label for successful dispatches.
pub const OUTCOME_OK: &str = "ok";

/// Registers descriptions for all Conduit metrics.
///
/// Call once after installing a recorder.
pub fn describe_metrics() {
    describe_counter!(
        "conduit_requests_total",
        "Total number of requests dispatched"
    );
    describe_histogram!(
        "conduit_request_duration_seconds",
        "Request dispatch duration in seconds"
    );
    describe_counter!(
        "conduit_route_misses_total",
        "Total number of resource paths that matched no route"
    );
    describe_counter!(
        "conduit_version_selections_total",
        "Total number of API version selections"
    );
}

/// Records a completed dispatch.
///
/// `outcome` is [`OUTCOME_OK`] or the error category of the failure.
pub fn record_request(request_type: &str, outcome: &str, duration: Duration) {
    counter!(
        "conduit_requests_total",
        "request_type" => request_type.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!(
        "conduit_request_duration_seconds",
        "request_type" => request_type.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Records a path that matched no route and had no default route.
pub fn record_route_miss() {
    counter!("conduit_route_misses_total").increment(1);
}

/// Records a version selection.
pub fn record_version_selected(version: &str, defaulted: bool) {
    counter!(
        "conduit_version_selections_total",
        "version" => version.to_string(),
        "defaulted" => defaulted.to_string()
    )
    .increment(1);
}
