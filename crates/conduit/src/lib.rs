//! # Conduit
//!
//! **Request dispatch for resource-oriented services**
//!
//! Conduit takes a CRUDPAQ request (create, read, update, delete, patch,
//! query, action) addressed to a resource path and carries it to the one
//! handler responsible for it:
//!
//! ```text
//! Request → Filter ... Filter → Router ─┬─ "realms/{realm}" → Router → ...
//!                                       └─ "users"          → VersionRouter ─┬─ 1.0 → handler
//!                                                                            └─ 2.0 → handler
//! ```
//!
//! - Filters see every request first and may rewrite or answer it.
//! - Routers match URI templates, capture variables and forward the
//!   unmatched remainder.
//! - Version routers pick a compatible implementation of a resource.
//!
//! Every table (filters, routes, versions, default policy) can change while
//! requests are in flight. Each dispatch works on the snapshot it started
//! with.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use conduit::prelude::*;
//! use serde_json::json;
//!
//! let pipeline = DispatchPipeline::new();
//! pipeline
//!     .router()
//!     .add_route(
//!         RoutingMode::Equals,
//!         "users/{id}",
//!         Arc::new(FnHandler::new(|ctx: Context, _req| async move {
//!             let id = ctx
//!                 .find::<RouterContext>()
//!                 .and_then(|r| r.variable("id"))
//!                 .unwrap_or_default()
//!                 .to_string();
//!             Ok(Response::Resource(Resource::new(Some(&id), None, json!({ "id": id }))))
//!         })),
//!     )
//!     .unwrap();
//!
//! # tokio_test::block_on(async {
//! let user = pipeline.handle_read(Context::root(), ReadRequest::new("users/42")).await.unwrap();
//! assert_eq!(user.id.as_deref(), Some("42"));
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/conduit/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod dispatch;

pub use dispatch::DispatchPipeline;

pub use conduit_config as config;
pub use conduit_core as core;
pub use conduit_middleware as middleware;
pub use conduit_router as router;
pub use conduit_telemetry as telemetry;

/// Installs the global log subscriber described by `config` and registers
/// metric descriptions.
///
/// # Errors
///
/// Returns an error if the log level is invalid or a subscriber is already
/// installed.
pub fn init_telemetry(config: &conduit_config::ConduitConfig) -> conduit_telemetry::TelemetryResult<()> {
    conduit_telemetry::init_logging(&config.logging.to_log_config())?;
    conduit_telemetry::metrics::describe_metrics();
    Ok(())
}

/// Prelude module for convenient imports.
///
/// ```rust
/// use conduit::prelude::*;
/// ```
pub mod prelude {
    pub use crate::DispatchPipeline;

    pub use conduit_config::{ConduitConfig, ConfigLoader};

    pub use conduit_core::{
        ActionRequest, ApiVersionContext, BoxFuture, Context, CreateRequest,
        DefaultVersionBehaviour, DeleteRequest, FnHandler, PatchOperation, PatchRequest, Provider,
        QueryRequest, QueryResponse, ReadRequest, Request, RequestHandler, RequestType, Resource,
        ResourceError, ResourceProvider, ResourceResult, Response, RouterContext, SharedHandler,
        UpdateRequest, Version, VersionRouterContext,
    };

    pub use conduit_middleware::{
        ConditionalFilter, Filter, FilterChain, FnFilter, LoggingFilter, Next, SharedFilter,
    };

    pub use conduit_router::{Router, RoutingMode, VersionRouter, VersionSelector};
}
