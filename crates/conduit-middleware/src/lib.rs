//! # Conduit Middleware
//!
//! An ordered, runtime-mutable chain of filters placed in front of a target
//! handler.
//!
//! Each filter receives the request together with a [`Next`] cursor. It may
//! inspect or rewrite the request, forward it by calling [`Next::run`], or
//! answer on its own and skip everything downstream.
//!
//! ## Components
//!
//! - [`Filter`] - The filter trait
//! - [`FilterChain`] - Filters and target held in atomic snapshots
//! - [`FnFilter`] - A filter built from a closure
//! - [`ConditionalFilter`] - Runs a filter only when a [`FilterCondition`] holds
//! - [`LoggingFilter`] - Per-dispatch tracing span and request metrics
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use conduit_core::{Context, FnHandler, ReadRequest, RequestHandler, Resource, Response};
//! use conduit_middleware::{FilterChain, FnFilter};
//! use serde_json::json;
//!
//! let target = Arc::new(FnHandler::new(|_ctx, request| async move {
//!     Ok(Response::Resource(Resource::new(None, None, json!(request.resource_path()))))
//! }));
//! let chain = FilterChain::new(target);
//! chain.add_filter(Arc::new(FnFilter::new("prefix", |ctx, request, next| {
//!     let request = request.with_resource_path("rewritten");
//!     next.run(ctx, request)
//! })));
//!
//! # tokio_test::block_on(async {
//! let resource = chain.handle_read(Context::root(), ReadRequest::new("original")).await.unwrap();
//! assert_eq!(resource.content, json!("rewritten"));
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/conduit-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod chain;
pub mod condition;
pub mod filter;
pub mod logging;

pub use chain::FilterChain;
pub use condition::{
    and, match_request_type, match_resource_path, not, or, ConditionalFilter, FilterCondition,
    SharedCondition,
};
pub use filter::{Filter, FnFilter, Next, SharedFilter};
pub use logging::LoggingFilter;
