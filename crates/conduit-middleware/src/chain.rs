//! The filter chain.
//!
//! A [`FilterChain`] holds an ordered list of filters and a target handler,
//! each in its own `ArcSwap` cell. A dispatch loads both once and runs
//! against that snapshot until it completes. Writers publish replacements
//! with read-copy-update, so adding, removing or reordering filters never
//! waits on in-flight requests and never changes what they see.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use conduit_core::{BoxFuture, Context, Request, RequestHandler, ResourceResult, Response, SharedHandler};

use crate::filter::{Next, SharedFilter};

/// An ordered, runtime-mutable list of filters in front of a target.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use conduit_core::{Context, FnHandler, ReadRequest, RequestHandler, Resource, Response};
/// use conduit_middleware::{FilterChain, FnFilter};
/// use serde_json::json;
///
/// let chain = FilterChain::new(Arc::new(FnHandler::new(|_ctx, _req| async {
///     Ok(Response::Resource(Resource::new(None, None, json!("target"))))
/// })));
///
/// let audit = chain.add_filter(Arc::new(FnFilter::new("audit", |ctx, req, next| next.run(ctx, req))));
/// assert_eq!(chain.len(), 1);
///
/// assert!(chain.remove_filter(&audit));
/// assert!(chain.is_empty());
/// ```
pub struct FilterChain {
    filters: ArcSwap<Vec<SharedFilter>>,
    target: ArcSwap<SharedHandler>,
}

impl FilterChain {
    /// Creates an empty chain in front of `target`.
    #[must_use]
    pub fn new(target: SharedHandler) -> Self {
        Self {
            filters: ArcSwap::from_pointee(Vec::new()),
            target: ArcSwap::from_pointee(target),
        }
    }

    /// Creates a chain with an initial list of filters.
    #[must_use]
    pub fn with_filters(target: SharedHandler, filters: Vec<SharedFilter>) -> Self {
        Self {
            filters: ArcSwap::from_pointee(filters),
            target: ArcSwap::from_pointee(target),
        }
    }

    /// Appends a filter and returns it, for later removal.
    pub fn add_filter(&self, filter: SharedFilter) -> SharedFilter {
        self.filters.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(Arc::clone(&filter));
            next
        });
        tracing::debug!(filter = filter.name(), "filter added");
        filter
    }

    /// Inserts a filter at `index`, or at the end if `index` is past it.
    pub fn insert_filter(&self, index: usize, filter: SharedFilter) -> SharedFilter {
        self.filters.rcu(|current| {
            let mut next: Vec<_> = current.iter().cloned().collect();
            next.insert(index.min(next.len()), Arc::clone(&filter));
            next
        });
        tracing::debug!(filter = filter.name(), index, "filter inserted");
        filter
    }

    /// Removes a filter previously added to this chain.
    ///
    /// Filters are compared by identity. Returns true if it was present.
    pub fn remove_filter(&self, filter: &SharedFilter) -> bool {
        let mut removed = false;
        self.filters.rcu(|current| {
            let next: Vec<_> = current
                .iter()
                .filter(|f| !Arc::ptr_eq(f, filter))
                .cloned()
                .collect();
            removed = next.len() != current.len();
            next
        });
        if removed {
            tracing::debug!(filter = filter.name(), "filter removed");
        }
        removed
    }

    /// Removes every filter called `name` and returns how many were removed.
    pub fn remove_filter_named(&self, name: &str) -> usize {
        let mut removed = 0;
        self.filters.rcu(|current| {
            let next: Vec<_> = current
                .iter()
                .filter(|f| f.name() != name)
                .cloned()
                .collect();
            removed = current.len() - next.len();
            next
        });
        if removed > 0 {
            tracing::debug!(filter = name, removed, "filters removed");
        }
        removed
    }

    /// Replaces the whole list, e.g. to reorder it.
    pub fn set_filters(&self, filters: Vec<SharedFilter>) {
        self.filters.store(Arc::new(filters));
    }

    /// Removes every filter.
    pub fn clear_filters(&self) {
        self.filters.store(Arc::new(Vec::new()));
    }

    /// Returns a snapshot of the filters in order.
    #[must_use]
    pub fn filters(&self) -> Vec<SharedFilter> {
        self.filters.load().iter().cloned().collect()
    }

    /// Returns the number of filters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.load().len()
    }

    /// Returns true if the chain has no filters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.load().is_empty()
    }

    /// Replaces the target handler.
    pub fn set_target(&self, target: SharedHandler) {
        self.target.store(Arc::new(target));
    }

    /// Returns the current target handler.
    #[must_use]
    pub fn target(&self) -> SharedHandler {
        SharedHandler::clone(&self.target.load())
    }

    /// Returns a cursor over the current snapshot.
    #[must_use]
    pub fn cursor(&self) -> Next {
        Next::new(self.filters.load_full(), self.target())
    }
}

impl RequestHandler for FilterChain {
    fn handle<'a>(
        &'a self,
        ctx: Context,
        request: Request,
    ) -> BoxFuture<'a, ResourceResult<Response>> {
        self.cursor().run(ctx, request)
    }
}

impl fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .filters
            .load()
            .iter()
            .map(|f| f.name().to_string())
            .collect();
        f.debug_struct("FilterChain")
            .field("filters", &names)
            .finish_non_exhaustive()
    }
}
