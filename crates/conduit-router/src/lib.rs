//! URI template router and API version selector for Conduit.
//!
//! This crate provides the two routing stages of a dispatch:
//!
//! - [`Router`] matches the resource path against a runtime-mutable table of
//!   URI templates and forwards the request, with its path rewritten to the
//!   unmatched remainder, to the best binding.
//! - [`VersionRouter`] forwards to one of several versions of the same
//!   resource, chosen by the [`VersionSelector`].
//!
//! Both are [`RequestHandler`](conduit_core::RequestHandler)s and nest freely:
//!
//! ```text
//!   Router ── "realms/{realm}" (StartsWith) ──▶ Router ── "users/{id}" ──▶ VersionRouter
//!                                                                          ├─ 1.0 ▶ handler
//!                                                                          └─ 2.0 ▶ handler
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use conduit_core::{Context, FnHandler, ReadRequest, RequestHandler, Resource, Response};
//! use conduit_router::{Router, RoutingMode};
//! use serde_json::json;
//!
//! let users = Arc::new(Router::new());
//! users
//!     .add_route(
//!         RoutingMode::Equals,
//!         "{id}",
//!         Arc::new(FnHandler::new(|_ctx, req| async move {
//!             Ok(Response::Resource(Resource::new(None, None, json!(req.resource_path()))))
//!         })),
//!     )
//!     .unwrap();
//!
//! let root = Router::new();
//! root.add_route(RoutingMode::StartsWith, "users", users).unwrap();
//!
//! # tokio_test::block_on(async {
//! let resource = root.handle_read(Context::root(), ReadRequest::new("users/42")).await.unwrap();
//! assert_eq!(resource.content, json!(""));
//! # });
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod router;
mod template;
mod version;

pub use router::{Route, RouteMatch, Router};
pub use template::{RoutingMode, TemplateMatch, UriTemplate};
pub use version::{TracingAdvice, VersionAdvice, VersionRouter, VersionSelector};
