//! Filter conditions.
//!
//! A [`FilterCondition`] decides from the context and request whether a
//! [`ConditionalFilter`] should apply its sub-filter. Conditions compose with
//! [`and`], [`or`] and [`not`]; the two built-in matchers select by request
//! type and by resource path.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use conduit_core::{
    BoxFuture, Context, Request, RequestType, ResourceError, ResourceResult, Response,
};
use regex::Regex;

use crate::filter::{Filter, Next, SharedFilter};

/// A predicate over a dispatch.
pub trait FilterCondition: Send + Sync {
    /// Returns true if the condition holds for this request.
    fn matches(&self, ctx: &Context, request: &Request) -> bool;
}

impl<F> FilterCondition for F
where
    F: Fn(&Context, &Request) -> bool + Send + Sync,
{
    fn matches(&self, ctx: &Context, request: &Request) -> bool {
        self(ctx, request)
    }
}

/// A shared, type-erased condition.
pub type SharedCondition = Arc<dyn FilterCondition>;

/// Holds when every condition holds. An empty list always holds.
#[must_use]
pub fn and(conditions: impl IntoIterator<Item = SharedCondition>) -> SharedCondition {
    let conditions: Vec<_> = conditions.into_iter().collect();
    Arc::new(move |ctx: &Context, request: &Request| {
        conditions.iter().all(|c| c.matches(ctx, request))
    })
}

/// Holds when any condition holds. An empty list never holds.
#[must_use]
pub fn or(conditions: impl IntoIterator<Item = SharedCondition>) -> SharedCondition {
    let conditions: Vec<_> = conditions.into_iter().collect();
    Arc::new(move |ctx: &Context, request: &Request| {
        conditions.iter().any(|c| c.matches(ctx, request))
    })
}

/// Inverts a condition.
#[must_use]
pub fn not(condition: SharedCondition) -> SharedCondition {
    Arc::new(move |ctx: &Context, request: &Request| !condition.matches(ctx, request))
}

/// Holds for requests of any of the given types.
#[must_use]
pub fn match_request_type(types: impl IntoIterator<Item = RequestType>) -> SharedCondition {
    let types: HashSet<RequestType> = types.into_iter().collect();
    Arc::new(move |_: &Context, request: &Request| types.contains(&request.request_type()))
}

/// Holds when the whole resource path matches `pattern`.
///
/// The pattern is anchored at both ends.
///
/// # Errors
///
/// Returns `BadRequest` if `pattern` is not a valid regular expression.
///
/// # Example
///
/// ```rust
/// use conduit_core::{Context, ReadRequest};
/// use conduit_middleware::{match_resource_path, FilterCondition};
///
/// let users = match_resource_path("users/[^/]+").unwrap();
/// assert!(users.matches(&Context::root(), &ReadRequest::new("users/42").into()));
/// assert!(!users.matches(&Context::root(), &ReadRequest::new("users/42/devices").into()));
/// ```
pub fn match_resource_path(pattern: &str) -> ResourceResult<SharedCondition> {
    let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| {
        ResourceError::bad_request(format!("Invalid resource path pattern '{pattern}': {e}"))
    })?;
    Ok(Arc::new(move |_: &Context, request: &Request| {
        regex.is_match(request.resource_path())
    }))
}

/// Applies a sub-filter only when a condition holds.
///
/// When the condition does not hold the request goes straight to the next
/// stage, as if the sub-filter were absent.
pub struct ConditionalFilter {
    name: String,
    condition: SharedCondition,
    filter: SharedFilter,
}

impl ConditionalFilter {
    /// Wraps `filter` so that it only runs when `condition` holds.
    #[must_use]
    pub fn new(condition: SharedCondition, filter: SharedFilter) -> Self {
        Self {
            name: format!("conditional:{}", filter.name()),
            condition,
            filter,
        }
    }

    /// The wrapped filter.
    #[must_use]
    pub const fn inner(&self) -> &SharedFilter {
        &self.filter
    }
}

impl Filter for ConditionalFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn filter<'a>(
        &'a self,
        ctx: Context,
        request: Request,
        next: Next,
    ) -> BoxFuture<'a, ResourceResult<Response>> {
        if self.condition.matches(&ctx, &request) {
            self.filter.filter(ctx, request, next)
        } else {
            next.run(ctx, request)
        }
    }
}

impl fmt::Debug for ConditionalFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionalFilter")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_core::{DeleteRequest, QueryRequest, ReadRequest};

    fn always(value: bool) -> SharedCondition {
        Arc::new(move |_: &Context, _: &Request| value)
    }

    fn read(path: &str) -> Request {
        ReadRequest::new(path).into()
    }

    #[test]
    fn test_combinators() {
        let ctx = Context::root();
        let req = read("x");

        assert!(and([always(true), always(true)]).matches(&ctx, &req));
        assert!(!and([always(true), always(false)]).matches(&ctx, &req));
        assert!(and(Vec::new()).matches(&ctx, &req));

        assert!(or([always(false), always(true)]).matches(&ctx, &req));
        assert!(!or(Vec::new()).matches(&ctx, &req));

        assert!(not(always(false)).matches(&ctx, &req));
    }

    #[test]
    fn test_match_request_type() {
        let ctx = Context::root();
        let reads = match_request_type([RequestType::Read, RequestType::Query]);

        assert!(reads.matches(&ctx, &read("a")));
        assert!(reads.matches(&ctx, &QueryRequest::new("a").into()));
        assert!(!reads.matches(&ctx, &DeleteRequest::new("a").into()));
    }

    #[test]
    fn test_match_resource_path_is_anchored() {
        let ctx = Context::root();
        let cond = match_resource_path("users|groups").unwrap();

        assert!(cond.matches(&ctx, &read("users")));
        assert!(cond.matches(&ctx, &read("groups")));
        assert!(!cond.matches(&ctx, &read("users/1")));
        assert!(!cond.matches(&ctx, &read("allusers")));
    }

    #[test]
    fn test_invalid_pattern() {
        let result = match_resource_path("users/(");
        assert!(matches!(result, Err(e) if e.is_bad_request()));
    }
}
