//! Dispatch logging filter.
//!
//! [`LoggingFilter`] wraps the rest of the chain in a `dispatch` span and
//! records every completed request through the telemetry helpers:
//!
//! - `conduit_requests_total` by request type and outcome
//! - `conduit_request_duration_seconds` by request type
//!
//! The outcome is `ok` or the category of the returned error.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use conduit_core::{Context, FnHandler, ReadRequest, RequestHandler, Resource, Response};
//! use conduit_middleware::{FilterChain, LoggingFilter};
//! use serde_json::json;
//!
//! let chain = FilterChain::new(Arc::new(FnHandler::new(|_ctx, _req| async {
//!     Ok(Response::Resource(Resource::new(None, None, json!({}))))
//! })));
//! chain.add_filter(Arc::new(LoggingFilter::new().verbose(true)));
//!
//! # tokio_test::block_on(async {
//! assert!(chain.handle_read(Context::root(), ReadRequest::new("a")).await.is_ok());
//! # });
//! ```

use std::time::Instant;

use conduit_core::{BoxFuture, Context, Request, ResourceResult, Response};
use conduit_telemetry::metrics::{record_request, OUTCOME_OK};
use tracing::Instrument;

use crate::filter::{Filter, Next};

/// Logs and measures every dispatch that passes through it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingFilter {
    verbose: bool,
}

impl LoggingFilter {
    /// Creates a logging filter that reports successes at `debug` level.
    #[must_use]
    pub const fn new() -> Self {
        Self { verbose: false }
    }

    /// Reports successes at `info` level instead of `debug`.
    #[must_use]
    pub const fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

impl Filter for LoggingFilter {
    fn name(&self) -> &str {
        "logging"
    }

    fn filter<'a>(
        &'a self,
        ctx: Context,
        request: Request,
        next: Next,
    ) -> BoxFuture<'a, ResourceResult<Response>> {
        let request_type = request.request_type();
        let span = tracing::info_span!(
            "dispatch",
            context_id = %ctx.id(),
            request_type = %request_type,
            resource_path = %request.resource_path(),
        );

        let verbose = self.verbose;
        Box::pin(
            async move {
                let start = Instant::now();
                let result = next.run(ctx, request).await;
                let elapsed = start.elapsed();
                let duration_ms = elapsed.as_secs_f64() * 1000.0;

                match &result {
                    Ok(_) => {
                        record_request(request_type.as_str(), OUTCOME_OK, elapsed);
                        if verbose {
                            tracing::info!(duration_ms, "request completed");
                        } else {
                            tracing::debug!(duration_ms, "request completed");
                        }
                    }
                    Err(error) => {
                        let category = error.category();
                        record_request(request_type.as_str(), category.as_str(), elapsed);
                        tracing::warn!(
                            duration_ms,
                            category = %category,
                            error = %error,
                            "request failed"
                        );
                    }
                }
                result
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::FilterChain;
    use conduit_core::{FnHandler, ReadRequest, RequestHandler, ResourceError};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_passes_results_through() {
        let chain = FilterChain::new(Arc::new(FnHandler::new(|_ctx, req: Request| async move {
            Err(ResourceError::not_found_path(req.resource_path()))
        })));
        chain.add_filter(Arc::new(LoggingFilter::new()));

        let err = chain
            .handle_read(Context::root(), ReadRequest::new("missing"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_name() {
        assert_eq!(LoggingFilter::new().name(), "logging");
        assert!(LoggingFilter::new().verbose(true).verbose);
    }
}
