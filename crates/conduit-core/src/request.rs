//! Request types.
//!
//! A [`Request`] is one of seven typed operations against a resource path.
//! Requests are plain values: routers that rewrite the path for the next hop
//! produce a modified copy through [`Request::with_resource_path`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ResourceError, ResourceResult};

/// Strips leading and trailing slashes from a resource path.
///
/// # Example
///
/// ```
/// use conduit_core::normalize_path;
///
/// assert_eq!(normalize_path("/users/42/"), "users/42");
/// assert_eq!(normalize_path("/"), "");
/// ```
#[must_use]
pub fn normalize_path(path: &str) -> String {
    path.trim_matches('/').to_string()
}

/// The type of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    /// Create a new resource.
    Create,
    /// Read a single resource.
    Read,
    /// Replace the content of a resource.
    Update,
    /// Delete a resource.
    Delete,
    /// Apply a list of patch operations to a resource.
    Patch,
    /// Search a collection.
    Query,
    /// Perform a named action.
    Action,
}

impl RequestType {
    /// Returns the lowercase name of the request type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Patch => "patch",
            Self::Query => "query",
            Self::Action => "action",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to create a resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateRequest {
    /// Path of the collection (or of the resource itself when client-assigned).
    pub resource_path: String,
    /// Client-assigned identifier, if any.
    pub new_resource_id: Option<String>,
    /// Content of the new resource.
    pub content: Value,
    /// Fields to return in the response.
    pub fields: Vec<String>,
    /// Free-form request parameters.
    pub additional_parameters: BTreeMap<String, String>,
}

impl CreateRequest {
    /// Creates a request to add `content` to the collection at `path`.
    #[must_use]
    pub fn new(path: &str, content: Value) -> Self {
        Self {
            resource_path: normalize_path(path),
            content,
            ..Self::default()
        }
    }

    /// Sets the client-assigned identifier.
    #[must_use]
    pub fn with_new_resource_id(mut self, id: impl Into<String>) -> Self {
        self.new_resource_id = Some(id.into());
        self
    }
}

/// A request to read a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadRequest {
    /// Path of the resource.
    pub resource_path: String,
    /// Fields to return in the response.
    pub fields: Vec<String>,
    /// Free-form request parameters.
    pub additional_parameters: BTreeMap<String, String>,
}

impl ReadRequest {
    /// Creates a request to read the resource at `path`.
    #[must_use]
    pub fn new(path: &str) -> Self {
        Self {
            resource_path: normalize_path(path),
            ..Self::default()
        }
    }
}

/// A request to replace the content of a resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateRequest {
    /// Path of the resource.
    pub resource_path: String,
    /// Replacement content.
    pub content: Value,
    /// Expected revision (MVCC).
    pub revision: Option<String>,
    /// Fields to return in the response.
    pub fields: Vec<String>,
    /// Free-form request parameters.
    pub additional_parameters: BTreeMap<String, String>,
}

impl UpdateRequest {
    /// Creates a request to replace the resource at `path` with `content`.
    #[must_use]
    pub fn new(path: &str, content: Value) -> Self {
        Self {
            resource_path: normalize_path(path),
            content,
            ..Self::default()
        }
    }

    /// Sets the expected revision.
    #[must_use]
    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }
}

/// A request to delete a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRequest {
    /// Path of the resource.
    pub resource_path: String,
    /// Expected revision (MVCC).
    pub revision: Option<String>,
    /// Fields to return in the response.
    pub fields: Vec<String>,
    /// Free-form request parameters.
    pub additional_parameters: BTreeMap<String, String>,
}

impl DeleteRequest {
    /// Creates a request to delete the resource at `path`.
    #[must_use]
    pub fn new(path: &str) -> Self {
        Self {
            resource_path: normalize_path(path),
            ..Self::default()
        }
    }

    /// Sets the expected revision.
    #[must_use]
    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }
}

/// The kind of a single patch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    /// Add a value to a field.
    Add,
    /// Remove a field, or a value from a field.
    Remove,
    /// Replace the value of a field.
    Replace,
    /// Increment a numeric field.
    Increment,
    /// Copy the value of `from` into `field`.
    Copy,
    /// Move the value of `from` into `field`.
    Move,
    /// Apply a transformation to a field.
    Transform,
}

/// A single operation of a patch request.
///
/// Evaluating operations is the business of leaf handlers; the dispatch core
/// only carries them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    /// The operation to perform.
    #[serde(rename = "operation")]
    pub op: PatchOp,
    /// JSON pointer of the target field.
    pub field: String,
    /// JSON pointer of the source field for copy and move.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Operand value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl PatchOperation {
    /// Creates an `add` operation.
    #[must_use]
    pub fn add(field: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchOp::Add,
            field: field.into(),
            from: None,
            value: Some(value),
        }
    }

    /// Creates a `remove` operation.
    #[must_use]
    pub fn remove(field: impl Into<String>) -> Self {
        Self {
            op: PatchOp::Remove,
            field: field.into(),
            from: None,
            value: None,
        }
    }

    /// Creates a `replace` operation.
    #[must_use]
    pub fn replace(field: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchOp::Replace,
            field: field.into(),
            from: None,
            value: Some(value),
        }
    }

    /// Creates an `increment` operation.
    #[must_use]
    pub fn increment(field: impl Into<String>, amount: Value) -> Self {
        Self {
            op: PatchOp::Increment,
            field: field.into(),
            from: None,
            value: Some(amount),
        }
    }

    /// Creates a `move` operation.
    #[must_use]
    pub fn move_field(from: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            op: PatchOp::Move,
            field: field.into(),
            from: Some(from.into()),
            value: None,
        }
    }

    /// Creates a `copy` operation.
    #[must_use]
    pub fn copy_field(from: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            op: PatchOp::Copy,
            field: field.into(),
            from: Some(from.into()),
            value: None,
        }
    }
}

/// A request to patch a resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatchRequest {
    /// Path of the resource.
    pub resource_path: String,
    /// Operations to apply in order.
    pub operations: Vec<PatchOperation>,
    /// Expected revision (MVCC).
    pub revision: Option<String>,
    /// Fields to return in the response.
    pub fields: Vec<String>,
    /// Free-form request parameters.
    pub additional_parameters: BTreeMap<String, String>,
}

impl PatchRequest {
    /// Creates a request to patch the resource at `path`.
    #[must_use]
    pub fn new(path: &str, operations: Vec<PatchOperation>) -> Self {
        Self {
            resource_path: normalize_path(path),
            operations,
            ..Self::default()
        }
    }
}

/// A sort key of a query request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortKey {
    /// JSON pointer of the field to sort on.
    pub field: String,
    /// Whether the sort is ascending.
    pub ascending: bool,
}

impl SortKey {
    /// Parses `+field`, `-field` or `field` (ascending).
    pub fn parse(spec: &str) -> ResourceResult<Self> {
        let (ascending, field) = match spec.as_bytes().first() {
            Some(b'-') => (false, &spec[1..]),
            Some(b'+') => (true, &spec[1..]),
            _ => (true, spec),
        };
        if field.is_empty() {
            return Err(ResourceError::bad_request(format!(
                "sort key '{spec}' does not name a field"
            )));
        }
        Ok(Self {
            field: field.to_string(),
            ascending,
        })
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.ascending { '+' } else { '-' };
        write!(f, "{sign}{}", self.field)
    }
}

/// A request to search a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Path of the collection.
    pub resource_path: String,
    /// Filter expression, evaluated by the leaf handler.
    pub query_filter: Option<String>,
    /// Identifier of a predefined query.
    pub query_id: Option<String>,
    /// Native query expression.
    pub query_expression: Option<String>,
    /// Result ordering.
    pub sort_keys: Vec<SortKey>,
    /// Maximum number of results per page (0 means unpaged).
    pub page_size: u32,
    /// Opaque cookie identifying the next page.
    pub paged_results_cookie: Option<String>,
    /// Index of the first result to return.
    pub paged_results_offset: u32,
    /// Fields to return for each result.
    pub fields: Vec<String>,
    /// Free-form request parameters.
    pub additional_parameters: BTreeMap<String, String>,
}

impl QueryRequest {
    /// Creates a query against the collection at `path`.
    #[must_use]
    pub fn new(path: &str) -> Self {
        Self {
            resource_path: normalize_path(path),
            ..Self::default()
        }
    }

    /// Sets the filter expression.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.query_filter = Some(filter.into());
        self
    }

    /// Sets the page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Appends a sort key.
    #[must_use]
    pub fn with_sort_key(mut self, key: SortKey) -> Self {
        self.sort_keys.push(key);
        self
    }
}

/// A request to perform a named action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Path of the resource or collection.
    pub resource_path: String,
    /// Name of the action.
    pub action_id: String,
    /// Action payload.
    pub content: Option<Value>,
    /// Fields to return in the response.
    pub fields: Vec<String>,
    /// Free-form request parameters.
    pub additional_parameters: BTreeMap<String, String>,
}

impl ActionRequest {
    /// Creates a request to perform `action_id` on `path`.
    #[must_use]
    pub fn new(path: &str, action_id: impl Into<String>) -> Self {
        Self {
            resource_path: normalize_path(path),
            action_id: action_id.into(),
            ..Self::default()
        }
    }

    /// Sets the action payload.
    #[must_use]
    pub fn with_content(mut self, content: Value) -> Self {
        self.content = Some(content);
        self
    }
}

/// A request of any type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Request {
    /// Create request.
    Create(CreateRequest),
    /// Read request.
    Read(ReadRequest),
    /// Update request.
    Update(UpdateRequest),
    /// Delete request.
    Delete(DeleteRequest),
    /// Patch request.
    Patch(PatchRequest),
    /// Query request.
    Query(QueryRequest),
    /// Action request.
    Action(ActionRequest),
}

impl Request {
    /// Returns the type of this request.
    #[must_use]
    pub const fn request_type(&self) -> RequestType {
        match self {
            Self::Create(_) => RequestType::Create,
            Self::Read(_) => RequestType::Read,
            Self::Update(_) => RequestType::Update,
            Self::Delete(_) => RequestType::Delete,
            Self::Patch(_) => RequestType::Patch,
            Self::Query(_) => RequestType::Query,
            Self::Action(_) => RequestType::Action,
        }
    }

    /// Returns the resource path.
    #[must_use]
    pub fn resource_path(&self) -> &str {
        match self {
            Self::Create(r) => &r.resource_path,
            Self::Read(r) => &r.resource_path,
            Self::Update(r) => &r.resource_path,
            Self::Delete(r) => &r.resource_path,
            Self::Patch(r) => &r.resource_path,
            Self::Query(r) => &r.resource_path,
            Self::Action(r) => &r.resource_path,
        }
    }

    /// Returns the field filter.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        match self {
            Self::Create(r) => &r.fields,
            Self::Read(r) => &r.fields,
            Self::Update(r) => &r.fields,
            Self::Delete(r) => &r.fields,
            Self::Patch(r) => &r.fields,
            Self::Query(r) => &r.fields,
            Self::Action(r) => &r.fields,
        }
    }

    /// Returns the additional parameters.
    #[must_use]
    pub fn additional_parameters(&self) -> &BTreeMap<String, String> {
        match self {
            Self::Create(r) => &r.additional_parameters,
            Self::Read(r) => &r.additional_parameters,
            Self::Update(r) => &r.additional_parameters,
            Self::Delete(r) => &r.additional_parameters,
            Self::Patch(r) => &r.additional_parameters,
            Self::Query(r) => &r.additional_parameters,
            Self::Action(r) => &r.additional_parameters,
        }
    }

    /// Returns this request with its resource path replaced.
    ///
    /// The path is normalised; the original value is consumed, so callers
    /// that need to keep it clone first.
    #[must_use]
    pub fn with_resource_path(mut self, path: &str) -> Self {
        let path = normalize_path(path);
        match &mut self {
            Self::Create(r) => r.resource_path = path,
            Self::Read(r) => r.resource_path = path,
            Self::Update(r) => r.resource_path = path,
            Self::Delete(r) => r.resource_path = path,
            Self::Patch(r) => r.resource_path = path,
            Self::Query(r) => r.resource_path = path,
            Self::Action(r) => r.resource_path = path,
        }
        self
    }

    /// Returns this request with a field filter appended.
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        match &mut self {
            Self::Create(r) => r.fields.push(field),
            Self::Read(r) => r.fields.push(field),
            Self::Update(r) => r.fields.push(field),
            Self::Delete(r) => r.fields.push(field),
            Self::Patch(r) => r.fields.push(field),
            Self::Query(r) => r.fields.push(field),
            Self::Action(r) => r.fields.push(field),
        }
        self
    }
}

impl From<CreateRequest> for Request {
    fn from(r: CreateRequest) -> Self {
        Self::Create(r)
    }
}

impl From<ReadRequest> for Request {
    fn from(r: ReadRequest) -> Self {
        Self::Read(r)
    }
}

impl From<UpdateRequest> for Request {
    fn from(r: UpdateRequest) -> Self {
        Self::Update(r)
    }
}

impl From<DeleteRequest> for Request {
    fn from(r: DeleteRequest) -> Self {
        Self::Delete(r)
    }
}

impl From<PatchRequest> for Request {
    fn from(r: PatchRequest) -> Self {
        Self::Patch(r)
    }
}

impl From<QueryRequest> for Request {
    fn from(r: QueryRequest) -> Self {
        Self::Query(r)
    }
}

impl From<ActionRequest> for Request {
    fn from(r: ActionRequest) -> Self {
        Self::Action(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_paths_are_normalised() {
        assert_eq!(ReadRequest::new("/users/1/").resource_path, "users/1");
        assert_eq!(ReadRequest::new("").resource_path, "");
    }

    #[test]
    fn test_with_resource_path_copies() {
        let original: Request = ReadRequest::new("users/1").into();
        let routed = original.clone().with_resource_path("1");

        assert_eq!(original.resource_path(), "users/1");
        assert_eq!(routed.resource_path(), "1");
        assert_eq!(routed.request_type(), RequestType::Read);
    }

    #[test]
    fn test_request_type_names() {
        let request: Request = ActionRequest::new("users", "reset").into();
        assert_eq!(request.request_type().to_string(), "action");
    }

    #[test]
    fn test_sort_key_parse() {
        let key = SortKey::parse("-name").unwrap();
        assert!(!key.ascending);
        assert_eq!(key.field, "name");
        assert_eq!(SortKey::parse("age").unwrap().to_string(), "+age");
        assert!(SortKey::parse("-").unwrap_err().is_bad_request());
    }

    #[test]
    fn test_patch_operation_serialization() {
        let op = PatchOperation::replace("/name", json!("alice"));
        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(
            value,
            json!({ "operation": "replace", "field": "/name", "value": "alice" })
        );
    }

    #[test]
    fn test_with_field_appends() {
        let request: Request = QueryRequest::new("users").with_page_size(10).into();
        let request = request.with_field("name").with_field("email");
        assert_eq!(request.fields(), ["name", "email"]);
    }
}
