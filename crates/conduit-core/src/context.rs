//! Request context chain.
//!
//! Every request travels with a [`Context`]: an immutable, singly linked list
//! of typed frames. Routers and version selectors never modify the context
//! they receive; they chain a new frame onto it and hand the child to the
//! next component.
//!
//! ```text
//! version-router ──▶ router ──▶ api-version ──▶ root
//!   (selected 1.2)   (id=42)    (resource=1.1)
//! ```
//!
//! Frames are looked up either by type ([`Context::as_context`]) or by name
//! ([`Context::context`]); both walk from the newest frame towards the root
//! and return the first match.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

use crate::error::{ResourceError, ResourceResult};
use crate::params::Params;
use crate::version::{AcceptApiVersion, Version};

/// A handle onto one node of the context chain.
///
/// Cloning is cheap (one reference count increment) and shares the chain.
///
/// # Example
///
/// ```
/// use conduit_core::{Context, AttributesContext};
///
/// let root = Context::root();
/// let ctx = root.push(AttributesContext::new("client").with("ip", "10.0.0.1"));
///
/// let attrs = ctx.as_context::<AttributesContext>().unwrap();
/// assert_eq!(attrs.get("ip").and_then(|v| v.as_str()), Some("10.0.0.1"));
/// assert!(ctx.parent().unwrap().is_root());
/// ```
#[derive(Clone)]
pub struct Context {
    node: Arc<Node>,
}

struct Node {
    frame: ContextFrame,
    parent: Option<Context>,
    id: OnceLock<String>,
}

impl Context {
    /// Creates a new root context.
    #[must_use]
    pub fn root() -> Self {
        Self::from_node(ContextFrame::Root(RootContext), None, OnceLock::new())
    }

    /// Creates a root context with a caller-supplied identifier.
    #[must_use]
    pub fn root_with_id(id: impl Into<String>) -> Self {
        Self::from_node(
            ContextFrame::Root(RootContext),
            None,
            OnceLock::from(id.into()),
        )
    }

    fn from_node(frame: ContextFrame, parent: Option<Context>, id: OnceLock<String>) -> Self {
        Self {
            node: Arc::new(Node { frame, parent, id }),
        }
    }

    /// Returns a child context holding `frame` whose parent is `self`.
    #[must_use]
    pub fn push(&self, frame: impl Into<ContextFrame>) -> Self {
        Self::from_node(frame.into(), Some(self.clone()), OnceLock::new())
    }

    /// Returns the frame held by this node.
    #[must_use]
    pub fn frame(&self) -> &ContextFrame {
        &self.node.frame
    }

    /// Returns the name of the frame held by this node.
    #[must_use]
    pub fn name(&self) -> &str {
        self.node.frame.name()
    }

    /// Returns the parent context, or `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<&Context> {
        self.node.parent.as_ref()
    }

    /// Returns true if this context has no parent.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.node.parent.is_none()
    }

    /// Returns the unique identifier of this node.
    ///
    /// Identifiers are UUID v7 strings generated the first time they are
    /// observed.
    pub fn id(&self) -> &str {
        self.node.id.get_or_init(|| Uuid::now_v7().to_string())
    }

    /// Iterates over this node and its ancestors, newest first.
    pub fn ancestors(&self) -> impl Iterator<Item = &Context> {
        std::iter::successors(Some(self), |ctx| ctx.parent())
    }

    /// Returns the nearest frame of type `T`, if any.
    #[must_use]
    pub fn find<T: ContextType>(&self) -> Option<&T> {
        self.ancestors().find_map(|ctx| T::from_frame(ctx.frame()))
    }

    /// Returns the nearest frame of type `T`.
    ///
    /// # Errors
    ///
    /// Returns an internal error if no frame of that type is in the chain.
    pub fn as_context<T: ContextType>(&self) -> ResourceResult<&T> {
        self.find::<T>().ok_or_else(|| {
            ResourceError::internal(format!("No context of type {} found", T::NAME))
        })
    }

    /// Returns true if a frame of type `T` is in the chain.
    #[must_use]
    pub fn contains<T: ContextType>(&self) -> bool {
        self.find::<T>().is_some()
    }

    /// Returns the nearest node whose frame is named `name`.
    ///
    /// # Errors
    ///
    /// Returns an internal error if no frame has that name.
    pub fn context(&self, name: &str) -> ResourceResult<&Context> {
        self.ancestors()
            .find(|ctx| ctx.name() == name)
            .ok_or_else(|| ResourceError::internal(format!("No context named {name} found")))
    }

    /// Returns true if a frame named `name` is in the chain.
    #[must_use]
    pub fn contains_context(&self, name: &str) -> bool {
        self.ancestors().any(|ctx| ctx.name() == name)
    }

    /// Renders the chain as nested JSON, newest frame outermost.
    ///
    /// Rendering observes, and therefore assigns, every node's identifier.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut value = serde_json::to_value(self.frame()).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut value {
            map.insert("id".to_string(), Value::String(self.id().to_string()));
            map.insert(
                "parent".to_string(),
                self.parent().map_or(Value::Null, Context::to_json),
            );
        }
        value
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.ancestors().map(|ctx| ctx.frame()))
            .finish()
    }
}

/// A frame of the context chain.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "name", rename_all = "kebab-case")]
pub enum ContextFrame {
    /// Start of every chain.
    Root(RootContext),
    /// Result of a path routing decision.
    Router(RouterContext),
    /// API versions requested by the client.
    ApiVersion(ApiVersionContext),
    /// Result of a version selection.
    VersionRouter(VersionRouterContext),
    /// Named free-form attributes.
    Attributes(AttributesContext),
}

impl ContextFrame {
    /// Returns the stable name of this frame.
    ///
    /// Attribute frames are named by their creator.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Root(_) => RootContext::NAME,
            Self::Router(_) => RouterContext::NAME,
            Self::ApiVersion(_) => ApiVersionContext::NAME,
            Self::VersionRouter(_) => VersionRouterContext::NAME,
            Self::Attributes(a) => &a.name,
        }
    }
}

/// A frame type that can be looked up in a [`Context`] chain.
pub trait ContextType: Sized {
    /// Stable name of the frame type.
    const NAME: &'static str;

    /// Extracts `Self` from a frame of the matching variant.
    fn from_frame(frame: &ContextFrame) -> Option<&Self>;
}

macro_rules! context_type {
    ($ty:ident, $variant:ident, $name:literal) => {
        impl ContextType for $ty {
            const NAME: &'static str = $name;

            fn from_frame(frame: &ContextFrame) -> Option<&Self> {
                match frame {
                    ContextFrame::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }

        impl From<$ty> for ContextFrame {
            fn from(inner: $ty) -> Self {
                ContextFrame::$variant(inner)
            }
        }
    };
}

context_type!(RootContext, Root, "root");
context_type!(RouterContext, Router, "router");
context_type!(ApiVersionContext, ApiVersion, "api-version");
context_type!(VersionRouterContext, VersionRouter, "version-router");
context_type!(AttributesContext, Attributes, "attributes");

/// The root frame.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RootContext;

/// The outcome of matching a URI template against a resource path.
#[derive(Debug, Clone, Serialize)]
pub struct RouterContext {
    matched_path: String,
    remaining_path: String,
    base_path: String,
    variables: Params,
}

impl RouterContext {
    /// Creates a router frame to be pushed onto `parent`.
    ///
    /// The base path is the matched portion prefixed with the base path of
    /// the nearest enclosing router frame.
    #[must_use]
    pub fn new(
        parent: &Context,
        matched_path: impl Into<String>,
        remaining_path: impl Into<String>,
        variables: Params,
    ) -> Self {
        let matched_path = matched_path.into();
        let base_path = match parent.find::<RouterContext>() {
            Some(outer) if !outer.base_path.is_empty() && !matched_path.is_empty() => {
                format!("{}/{}", outer.base_path, matched_path)
            }
            Some(outer) if matched_path.is_empty() => outer.base_path.clone(),
            _ => matched_path.clone(),
        };
        Self {
            matched_path,
            remaining_path: remaining_path.into(),
            base_path,
            variables,
        }
    }

    /// The portion of the path consumed by the template.
    #[must_use]
    pub fn matched_path(&self) -> &str {
        &self.matched_path
    }

    /// The portion of the path left for the next routing stage.
    #[must_use]
    pub fn remaining_path(&self) -> &str {
        &self.remaining_path
    }

    /// The matched paths of all enclosing routers joined with this one.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Variables captured by the template.
    #[must_use]
    pub fn variables(&self) -> &Params {
        &self.variables
    }

    /// Returns a captured variable by name, searching only this frame.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name)
    }
}

/// API versions requested by the client, as parsed by a protocol adapter.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ApiVersionContext {
    requested: AcceptApiVersion,
}

impl ApiVersionContext {
    /// Creates a frame from parsed versions.
    #[must_use]
    pub const fn new(requested: AcceptApiVersion) -> Self {
        Self { requested }
    }

    /// Creates a frame requesting only a resource version.
    #[must_use]
    pub const fn resource(version: Version) -> Self {
        Self::new(AcceptApiVersion::new(None, Some(version)))
    }

    /// The requested protocol version.
    #[must_use]
    pub const fn protocol_version(&self) -> Option<Version> {
        self.requested.protocol
    }

    /// The requested resource version.
    #[must_use]
    pub const fn resource_version(&self) -> Option<Version> {
        self.requested.resource
    }
}

/// The outcome of a version selection.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct VersionRouterContext {
    requested: Option<Version>,
    selected: Version,
}

impl VersionRouterContext {
    /// Creates a version selection frame.
    #[must_use]
    pub const fn new(requested: Option<Version>, selected: Version) -> Self {
        Self {
            requested,
            selected,
        }
    }

    /// The version requested by the client, if any.
    #[must_use]
    pub const fn requested(&self) -> Option<Version> {
        self.requested
    }

    /// The version of the handler that serves the request.
    #[must_use]
    pub const fn selected(&self) -> Version {
        self.selected
    }

    /// True when the version came from the default policy.
    #[must_use]
    pub const fn is_defaulted(&self) -> bool {
        self.requested.is_none()
    }
}

/// Free-form attributes under a caller-chosen frame name.
#[derive(Debug, Clone, Serialize)]
pub struct AttributesContext {
    #[serde(rename = "attributes_name")]
    name: String,
    attributes: Map<String, Value>,
}

impl AttributesContext {
    /// Creates an empty attribute frame named `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Map::new(),
        }
    }

    /// Returns this frame with an attribute added.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// The name of this frame.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns an attribute by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// All attributes.
    #[must_use]
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn routed(parent: &Context, matched: &str, remaining: &str) -> Context {
        let mut vars = Params::new();
        vars.push("id", "42");
        parent.push(RouterContext::new(parent, matched, remaining, vars))
    }

    #[test]
    fn test_lookup_by_type_walks_to_root() {
        let root = Context::root();
        let ctx = root
            .push(ApiVersionContext::resource(Version::new(1, 1)))
            .push(AttributesContext::new("audit"));
        let ctx = routed(&ctx, "users/42", "");

        let version = ctx.as_context::<ApiVersionContext>().unwrap();
        assert_eq!(version.resource_version(), Some(Version::new(1, 1)));
        assert!(ctx.contains::<RootContext>());
        assert!(!ctx.contains::<VersionRouterContext>());
    }

    #[test]
    fn test_lookup_failure_is_internal_error() {
        let ctx = Context::root();
        let err = ctx.as_context::<RouterContext>().unwrap_err();
        assert!(err.to_string().contains("router"));
        assert!(ctx.context("missing").is_err());
    }

    #[test]
    fn test_lookup_by_name() {
        let ctx = Context::root()
            .push(AttributesContext::new("client").with("ip", "10.0.0.1"))
            .push(AttributesContext::new("audit").with("enabled", true));

        let client = ctx.context("client").unwrap();
        assert_eq!(client.name(), "client");
        assert!(ctx.contains_context("root"));
        assert!(!ctx.contains_context("router"));
    }

    #[test]
    fn test_nearest_frame_wins() {
        let root = Context::root();
        let outer = routed(&root, "realms/a", "users/42");
        let inner = routed(&outer, "users/42", "");

        let frame = inner.as_context::<RouterContext>().unwrap();
        assert_eq!(frame.matched_path(), "users/42");
        assert_eq!(frame.base_path(), "realms/a/users/42");
    }

    #[test]
    fn test_ids_are_lazy_and_stable() {
        let ctx = Context::root().push(AttributesContext::new("a"));
        let first = ctx.id().to_string();
        assert_eq!(ctx.id(), first);
        assert_ne!(ctx.parent().unwrap().id(), first);

        let root = Context::root_with_id("fixed");
        assert_eq!(root.id(), "fixed");
    }

    #[test]
    fn test_parent_is_never_mutated() {
        let root = Context::root();
        let _child = root.push(AttributesContext::new("child"));
        assert!(root.is_root());
        assert_eq!(root.ancestors().count(), 1);
    }

    #[test]
    fn test_to_json_nests_parents() {
        let ctx = Context::root_with_id("r").push(ApiVersionContext::resource(Version::new(2, 0)));
        let json = ctx.to_json();

        assert_eq!(json["name"], "api-version");
        assert_eq!(json["requested"]["resource"], "2.0");
        assert_eq!(json["parent"]["name"], "root");
        assert_eq!(json["parent"]["id"], "r");
        assert!(json["parent"]["parent"].is_null());
    }
}
