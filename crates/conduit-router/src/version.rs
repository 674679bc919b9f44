//! API version selection.
//!
//! A [`VersionRouter`] holds several handlers of the same resource keyed by
//! [`Version`]. The requested resource version is read from the
//! [`ApiVersionContext`] frame of the incoming context; the
//! [`VersionSelector`] picks the smallest registered version compatible with
//! it, or applies the default policy when none was requested.
//!
//! | Registered | Requested | Policy | Selected |
//! |------------|-----------|--------|----------|
//! | 1.0, 1.2, 2.0 | 1.1 | - | 1.2 |
//! | 1.0, 1.2, 2.0 | 1.5 | - | `NotFound` |
//! | 1.0, 1.2, 2.0 | - | `Latest` | 2.0 |
//! | 1.0, 1.2, 2.0 | - | `Oldest` | 1.0 |
//! | 1.0, 1.2, 2.0 | - | `None` | `NotFound` |

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use conduit_core::{
    ApiVersionContext, BoxFuture, Context, DefaultVersionBehaviour, Request, RequestHandler,
    ResourceError, ResourceResult, Response, SharedHandler, Version, VersionRouterContext,
};
use conduit_telemetry::metrics::record_version_selected;

/// Chooses a version among registered bindings.
///
/// The default policy is held in an atomic and may be changed at any time;
/// a change applies to selections that start afterwards.
#[derive(Debug)]
pub struct VersionSelector {
    behaviour: AtomicU8,
}

impl Default for VersionSelector {
    fn default() -> Self {
        Self::new(DefaultVersionBehaviour::default())
    }
}

impl VersionSelector {
    /// Creates a selector with the given default policy.
    #[must_use]
    pub const fn new(behaviour: DefaultVersionBehaviour) -> Self {
        Self {
            behaviour: AtomicU8::new(encode(behaviour)),
        }
    }

    /// Returns the current default policy.
    #[must_use]
    pub fn default_behaviour(&self) -> DefaultVersionBehaviour {
        decode(self.behaviour.load(Ordering::Acquire))
    }

    /// Replaces the default policy.
    pub fn set_default_behaviour(&self, behaviour: DefaultVersionBehaviour) {
        self.behaviour.store(encode(behaviour), Ordering::Release);
        tracing::debug!(?behaviour, "default version behaviour changed");
    }

    /// Selects a binding.
    ///
    /// With a requested version `R`, returns the smallest registered `V`
    /// with `V.major == R.major` and `V.minor >= R.minor`. Without one,
    /// applies the default policy.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when no binding is compatible, when `bindings` is
    /// empty, or when no version was requested and the policy is `None`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::collections::BTreeMap;
    /// use conduit_core::{DefaultVersionBehaviour, Version};
    /// use conduit_router::VersionSelector;
    ///
    /// let bindings: BTreeMap<_, _> = [
    ///     (Version::new(1, 0), "a"),
    ///     (Version::new(1, 2), "b"),
    ///     (Version::new(2, 0), "c"),
    /// ]
    /// .into_iter()
    /// .collect();
    ///
    /// let selector = VersionSelector::new(DefaultVersionBehaviour::Latest);
    /// assert_eq!(selector.select(Some(Version::new(1, 1)), &bindings).unwrap().1, &"b");
    /// assert_eq!(selector.select(None, &bindings).unwrap().1, &"c");
    /// ```
    pub fn select<'m, H>(
        &self,
        requested: Option<Version>,
        bindings: &'m BTreeMap<Version, H>,
    ) -> ResourceResult<(Version, &'m H)> {
        let selected = match requested {
            Some(r) => bindings
                .range(r..=Version::new(r.major, u32::MAX))
                .next()
                .ok_or_else(|| {
                    ResourceError::not_found(format!(
                        "No compatible version found for requested version {r}"
                    ))
                })?,
            None => {
                let candidate = match self.default_behaviour() {
                    DefaultVersionBehaviour::Latest => bindings.iter().next_back(),
                    DefaultVersionBehaviour::Oldest => bindings.iter().next(),
                    DefaultVersionBehaviour::None => {
                        return Err(ResourceError::not_found(
                            "No version requested and no default version behaviour is configured",
                        ))
                    }
                };
                candidate
                    .ok_or_else(|| ResourceError::not_found("No versions are registered"))?
            }
        };
        Ok((*selected.0, selected.1))
    }
}

const fn encode(behaviour: DefaultVersionBehaviour) -> u8 {
    match behaviour {
        DefaultVersionBehaviour::Latest => 0,
        DefaultVersionBehaviour::Oldest => 1,
        DefaultVersionBehaviour::None => 2,
    }
}

const fn decode(value: u8) -> DefaultVersionBehaviour {
    match value {
        1 => DefaultVersionBehaviour::Oldest,
        2 => DefaultVersionBehaviour::None,
        _ => DefaultVersionBehaviour::Latest,
    }
}

/// Receives version advice so callers can tell clients which version was
/// used, and warn those that did not ask for one.
pub trait VersionAdvice: Send + Sync {
    /// Called when a request named no resource version.
    fn version_missing(&self, ctx: &Context);

    /// Called with the version that serves the request. `ctx` already
    /// carries the [`VersionRouterContext`] frame.
    fn version_selected(&self, ctx: &Context, version: Version);
}

/// Version advice written to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAdvice {
    warn_on_missing: bool,
}

impl TracingAdvice {
    /// Creates advice that logs missing versions at `warn` when
    /// `warn_on_missing` is set, `debug` otherwise.
    #[must_use]
    pub const fn new(warn_on_missing: bool) -> Self {
        Self { warn_on_missing }
    }
}

impl VersionAdvice for TracingAdvice {
    fn version_missing(&self, ctx: &Context) {
        if self.warn_on_missing {
            tracing::warn!(context_id = %ctx.id(), "request did not specify a resource version");
        } else {
            tracing::debug!(context_id = %ctx.id(), "request did not specify a resource version");
        }
    }

    fn version_selected(&self, ctx: &Context, version: Version) {
        tracing::debug!(context_id = %ctx.id(), %version, "resource version selected");
    }
}

/// Routes requests to one of several versions of the same resource.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use conduit_core::{ApiVersionContext, Context, FnHandler, ReadRequest, RequestHandler, Resource, Response, Version};
/// use conduit_router::VersionRouter;
/// use serde_json::json;
///
/// let router = VersionRouter::new();
/// for (major, minor) in [(1, 0), (1, 2)] {
///     router
///         .add_version(
///             Version::new(major, minor),
///             Arc::new(FnHandler::new(move |_ctx, _req| async move {
///                 Ok(Response::Resource(Resource::new(None, None, json!(format!("{major}.{minor}")))))
///             })),
///         )
///         .unwrap();
/// }
///
/// let ctx = Context::root().push(ApiVersionContext::resource(Version::new(1, 1)));
/// # tokio_test::block_on(async {
/// let resource = router.handle_read(ctx, ReadRequest::new("")).await.unwrap();
/// assert_eq!(resource.content, json!("1.2"));
/// # });
/// ```
pub struct VersionRouter {
    versions: ArcSwap<BTreeMap<Version, SharedHandler>>,
    selector: Arc<VersionSelector>,
    advice: Arc<dyn VersionAdvice>,
}

impl Default for VersionRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for VersionRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionRouter")
            .field("versions", &self.versions())
            .field("selector", &self.selector)
            .finish_non_exhaustive()
    }
}

impl VersionRouter {
    /// Creates a version router with its own selector and logging advice.
    #[must_use]
    pub fn new() -> Self {
        Self::with_selector(Arc::new(VersionSelector::default()))
    }

    /// Creates a version router sharing `selector`, so that one policy
    /// change reaches every router holding it.
    #[must_use]
    pub fn with_selector(selector: Arc<VersionSelector>) -> Self {
        Self {
            versions: ArcSwap::from_pointee(BTreeMap::new()),
            selector,
            advice: Arc::new(TracingAdvice::default()),
        }
    }

    /// Replaces the advice sink.
    #[must_use]
    pub fn with_advice(mut self, advice: Arc<dyn VersionAdvice>) -> Self {
        self.advice = advice;
        self
    }

    /// The selector holding the default policy.
    #[must_use]
    pub const fn selector(&self) -> &Arc<VersionSelector> {
        &self.selector
    }

    /// Registers a handler for an exact version.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` if a handler is already registered for `version`.
    pub fn add_version(&self, version: Version, handler: SharedHandler) -> ResourceResult<()> {
        let mut duplicate = false;
        self.versions.rcu(|current| {
            duplicate = current.contains_key(&version);
            if duplicate {
                return Arc::clone(current);
            }
            let mut next = BTreeMap::clone(current);
            next.insert(version, Arc::clone(&handler));
            Arc::new(next)
        });

        if duplicate {
            return Err(ResourceError::bad_request(format!(
                "A handler for version {version} is already registered"
            )));
        }
        tracing::debug!(%version, "version added");
        Ok(())
    }

    /// Removes the handler for `version`, returning it if present.
    pub fn remove_version(&self, version: Version) -> Option<SharedHandler> {
        let mut removed = None;
        self.versions.rcu(|current| {
            let mut next = BTreeMap::clone(current);
            removed = next.remove(&version);
            next
        });
        removed
    }

    /// Registered versions in ascending order.
    #[must_use]
    pub fn versions(&self) -> Vec<Version> {
        self.versions.load().keys().copied().collect()
    }

    /// Selects the handler for a request arriving with `ctx`.
    ///
    /// Returns the handler and a child context carrying the
    /// [`VersionRouterContext`] frame.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no registered version is acceptable.
    pub fn select(&self, ctx: &Context) -> ResourceResult<(SharedHandler, Context)> {
        let requested = ctx
            .find::<ApiVersionContext>()
            .and_then(ApiVersionContext::resource_version);
        if requested.is_none() {
            self.advice.version_missing(ctx);
        }

        let versions = self.versions.load();
        let (version, handler) = self.selector.select(requested, &versions)?;

        let child = ctx.push(VersionRouterContext::new(requested, version));
        self.advice.version_selected(&child, version);
        record_version_selected(&version.to_string(), requested.is_none());
        Ok((Arc::clone(handler), child))
    }
}

impl RequestHandler for VersionRouter {
    fn handle<'a>(
        &'a self,
        ctx: Context,
        request: Request,
    ) -> BoxFuture<'a, ResourceResult<Response>> {
        match self.select(&ctx) {
            Ok((handler, child)) => Box::pin(async move { handler.handle(child, request).await }),
            Err(e) => Box::pin(std::future::ready(Err(e))),
        }
    }
}
