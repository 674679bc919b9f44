//! # Conduit Core
//!
//! Core types and traits for the Conduit request-dispatch framework.
//!
//! This crate provides the foundational types shared by the router, the
//! version selector and the filter chain:
//!
//! - [`Request`] - CRUDPAQ request variants bound to a resource path
//! - [`Resource`] / [`Response`] - Results produced by handlers
//! - [`ResourceError`] - Categorised error taxonomy
//! - [`Context`] - Immutable chain of typed context frames
//! - [`Version`] / [`AcceptApiVersion`] - API version model
//! - [`RequestHandler`] - The handler contract every component implements

#![doc(html_root_url = "https://docs.rs/conduit-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod error;
mod handler;
mod params;
mod request;
mod resource;
mod version;

pub use context::{
    ApiVersionContext, AttributesContext, Context, ContextFrame, ContextType, RootContext,
    RouterContext, VersionRouterContext,
};
pub use error::{ErrorCategory, ErrorEnvelope, ResourceError, ResourceResult};
pub use handler::{
    BoxFuture, FnHandler, Provider, RequestHandler, ResourceProvider, SharedHandler,
};
pub use params::Params;
pub use request::{
    normalize_path, ActionRequest, CreateRequest, DeleteRequest, PatchOp, PatchOperation,
    PatchRequest, QueryRequest, ReadRequest, Request, RequestType, SortKey, UpdateRequest,
};
pub use resource::{QueryResponse, Resource, Response};
pub use version::{
    AcceptApiVersion, DefaultVersionBehaviour, Version, ACCEPT_API_VERSION, CONTENT_API_VERSION,
};
