//! Resources and responses.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::hash::{Hash, Hasher};

use crate::error::{ResourceError, ResourceResult};

/// A resource: identifier, revision and JSON content.
///
/// Two resources are equal when their identifier and revision are equal; the
/// content is not compared.
///
/// # Example
///
/// ```
/// use conduit_core::Resource;
/// use serde_json::json;
///
/// let a = Resource::new(Some("1"), Some("r1"), json!({ "name": "alice" }));
/// let b = Resource::new(Some("1"), Some("r1"), json!({ "name": "bob" }));
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    /// Resource identifier.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Resource revision.
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    /// Resource content.
    pub content: Value,
}

impl Resource {
    /// Creates a resource.
    #[must_use]
    pub fn new(id: Option<&str>, revision: Option<&str>, content: Value) -> Self {
        Self {
            id: id.map(ToString::to_string),
            revision: revision.map(ToString::to_string),
            content,
        }
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.revision == other.revision
    }
}

impl Eq for Resource {}

impl Hash for Resource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.revision.hash(state);
    }
}

/// The result of a query request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Matching resources, in result order.
    pub resources: Vec<Resource>,
    /// Cookie for the next page, if more results remain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paged_results_cookie: Option<String>,
    /// Estimated number of remaining results, `-1` when unknown.
    pub remaining_paged_results: i64,
}

impl QueryResponse {
    /// Creates an unpaged query response.
    #[must_use]
    pub fn new(resources: Vec<Resource>) -> Self {
        Self {
            resources,
            paged_results_cookie: None,
            remaining_paged_results: -1,
        }
    }
}

/// The result of any request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    /// Create, read, update, delete and patch produce a resource.
    Resource(Resource),
    /// Query produces a list of resources.
    Query(QueryResponse),
    /// Action produces arbitrary JSON.
    Action(Value),
}

impl Response {
    /// Returns the resource if this is a resource response.
    #[must_use]
    pub fn as_resource(&self) -> Option<&Resource> {
        match self {
            Self::Resource(r) => Some(r),
            _ => None,
        }
    }

    /// Returns the query result if this is a query response.
    #[must_use]
    pub fn as_query(&self) -> Option<&QueryResponse> {
        match self {
            Self::Query(q) => Some(q),
            _ => None,
        }
    }

    /// Returns the action result if this is an action response.
    #[must_use]
    pub fn as_action(&self) -> Option<&Value> {
        match self {
            Self::Action(v) => Some(v),
            _ => None,
        }
    }

    /// Converts into a resource, failing if the handler answered with
    /// another kind of response.
    pub fn into_resource(self) -> ResourceResult<Resource> {
        match self {
            Self::Resource(r) => Ok(r),
            other => Err(other.mismatch("resource")),
        }
    }

    /// Converts into a query result.
    pub fn into_query(self) -> ResourceResult<QueryResponse> {
        match self {
            Self::Query(q) => Ok(q),
            other => Err(other.mismatch("query")),
        }
    }

    /// Converts into an action result.
    pub fn into_action(self) -> ResourceResult<Value> {
        match self {
            Self::Action(v) => Ok(v),
            other => Err(other.mismatch("action")),
        }
    }

    fn mismatch(&self, expected: &str) -> ResourceError {
        let actual = match self {
            Self::Resource(_) => "resource",
            Self::Query(_) => "query",
            Self::Action(_) => "action",
        };
        ResourceError::internal(format!(
            "handler returned a {actual} response where a {expected} response was expected"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_equality_ignores_content() {
        let a = Resource::new(Some("1"), Some("1"), json!({ "a": 1 }));
        let b = Resource::new(Some("1"), Some("2"), json!({ "a": 1 }));
        assert_ne!(a, b);

        let mut set = HashSet::new();
        set.insert(a.clone());
        set.insert(Resource::new(Some("1"), Some("1"), json!(null)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_resource_serialization() {
        let resource = Resource::new(Some("42"), None, json!({ "name": "alice" }));
        let value = serde_json::to_value(&resource).unwrap();
        assert_eq!(value, json!({ "_id": "42", "content": { "name": "alice" } }));
    }

    #[test]
    fn test_response_accessors() {
        let response = Response::Query(QueryResponse::new(vec![]));
        assert!(response.as_query().is_some());
        assert!(response.as_resource().is_none());
        assert_eq!(response.as_query().unwrap().remaining_paged_results, -1);
    }
}
