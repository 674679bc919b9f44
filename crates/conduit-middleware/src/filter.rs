//! Core filter trait and cursor.
//!
//! A [`Filter`] sits in front of a target handler. It receives the context,
//! the request and a [`Next`] cursor over the rest of the chain, and decides
//! whether to forward the request, rewrite it first, or answer on its own.
//!
//! # Example
//!
//! ```rust
//! use conduit_core::{BoxFuture, Context, Request, ResourceError, ResourceResult, Response};
//! use conduit_middleware::{Filter, Next};
//!
//! struct ReadOnly;
//!
//! impl Filter for ReadOnly {
//!     fn name(&self) -> &str {
//!         "read-only"
//!     }
//!
//!     fn filter<'a>(
//!         &'a self,
//!         ctx: Context,
//!         request: Request,
//!         next: Next,
//!     ) -> BoxFuture<'a, ResourceResult<Response>> {
//!         match request {
//!             Request::Read(_) | Request::Query(_) => next.run(ctx, request),
//!             other => Box::pin(async move {
//!                 Err(ResourceError::forbidden(format!(
//!                     "{} requests are not allowed",
//!                     other.request_type()
//!                 )))
//!             }),
//!         }
//!     }
//! }
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use conduit_core::{BoxFuture, Context, Request, RequestHandler, ResourceResult, Response, SharedHandler};

/// A shared, type-erased filter.
pub type SharedFilter = Arc<dyn Filter>;

/// A stage in a [`FilterChain`](crate::FilterChain).
///
/// A filter forwards the request by calling [`Next::run`].
/// Returning without calling it short-circuits the chain: neither the
/// remaining filters nor the target see the request.
pub trait Filter: Send + Sync {
    /// Returns the name of this filter, used for logging and removal by name.
    fn name(&self) -> &str;

    /// Processes the request.
    fn filter<'a>(
        &'a self,
        ctx: Context,
        request: Request,
        next: Next,
    ) -> BoxFuture<'a, ResourceResult<Response>>;
}

impl<F: Filter + ?Sized> Filter for Arc<F> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn filter<'a>(
        &'a self,
        ctx: Context,
        request: Request,
        next: Next,
    ) -> BoxFuture<'a, ResourceResult<Response>> {
        (**self).filter(ctx, request, next)
    }
}

/// Cursor over the remainder of one dispatch.
///
/// The cursor owns the filter snapshot and the target that were current when
/// the dispatch began, so changes made to the chain while a request is in
/// flight never affect it.
#[derive(Clone)]
pub struct Next {
    filters: Arc<Vec<SharedFilter>>,
    position: usize,
    target: SharedHandler,
}

impl Next {
    /// Creates a cursor positioned before the first filter of `filters`.
    #[must_use]
    pub const fn new(filters: Arc<Vec<SharedFilter>>, target: SharedHandler) -> Self {
        Self {
            filters,
            position: 0,
            target,
        }
    }

    /// Creates a cursor that goes straight to `target`.
    #[must_use]
    pub fn target_only(target: SharedHandler) -> Self {
        Self::new(Arc::new(Vec::new()), target)
    }

    /// Index of the filter this cursor will invoke next.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Number of filters left before the target.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.filters.len().saturating_sub(self.position)
    }

    /// Invokes the next filter, or the target once the filters are exhausted.
    ///
    /// A cursor is `Clone`, so a filter may run the rest of the chain more
    /// than once (to retry, for example) by cloning `next` first.
    pub fn run(self, ctx: Context, request: Request) -> BoxFuture<'static, ResourceResult<Response>> {
        Box::pin(async move {
            match self.filters.get(self.position).cloned() {
                Some(filter) => {
                    tracing::trace!(filter = filter.name(), position = self.position, "filter");
                    let next = Self {
                        filters: Arc::clone(&self.filters),
                        position: self.position + 1,
                        target: Arc::clone(&self.target),
                    };
                    filter.filter(ctx, request, next).await
                }
                None => self.target.handle(ctx, request).await,
            }
        })
    }
}

impl RequestHandler for Next {
    fn handle<'a>(
        &'a self,
        ctx: Context,
        request: Request,
    ) -> BoxFuture<'a, ResourceResult<Response>> {
        self.clone().run(ctx, request)
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("position", &self.position)
            .field("remaining", &self.remaining())
            .finish_non_exhaustive()
    }
}

/// A filter built from an async function.
///
/// # Example
///
/// ```rust
/// use conduit_middleware::{Filter, FnFilter};
///
/// let passthrough = FnFilter::new("passthrough", |ctx, request, next| next.run(ctx, request));
/// assert_eq!(passthrough.name(), "passthrough");
/// ```
pub struct FnFilter<F> {
    name: String,
    func: F,
}

impl<F, Fut> FnFilter<F>
where
    F: Fn(Context, Request, Next) -> Fut + Send + Sync,
    Fut: Future<Output = ResourceResult<Response>> + Send + 'static,
{
    /// Creates a new function-based filter.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F, Fut> Filter for FnFilter<F>
where
    F: Fn(Context, Request, Next) -> Fut + Send + Sync,
    Fut: Future<Output = ResourceResult<Response>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn filter<'a>(
        &'a self,
        ctx: Context,
        request: Request,
        next: Next,
    ) -> BoxFuture<'a, ResourceResult<Response>> {
        Box::pin((self.func)(ctx, request, next))
    }
}

impl<F> fmt::Debug for FnFilter<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFilter").field("name", &self.name).finish_non_exhaustive()
    }
}
