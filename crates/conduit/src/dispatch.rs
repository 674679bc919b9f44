//! The assembled dispatch pipeline.

use std::fmt;
use std::sync::Arc;

use conduit_config::ConduitConfig;
use conduit_core::{
    BoxFuture, Context, DefaultVersionBehaviour, Request, RequestHandler, ResourceResult,
    Response, SharedHandler,
};
use conduit_middleware::{FilterChain, LoggingFilter};
use conduit_router::{Router, TracingAdvice, VersionAdvice, VersionRouter, VersionSelector};

/// A filter chain in front of a root [`Router`].
///
/// Every dispatch runs `filters -> router -> matched handler`. Version
/// routers created through [`DispatchPipeline::version_router`] share the
/// pipeline's [`VersionSelector`], so changing the default version
/// behaviour here affects all of them at once.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use conduit::prelude::*;
/// use serde_json::json;
///
/// let pipeline = DispatchPipeline::new();
///
/// let users = pipeline.version_router();
/// users
///     .add_version(
///         Version::new(1, 0),
///         Arc::new(FnHandler::new(|_ctx, _req| async {
///             Ok(Response::Resource(Resource::new(None, None, json!("v1"))))
///         })),
///     )
///     .unwrap();
/// pipeline
///     .router()
///     .add_route(RoutingMode::StartsWith, "users", Arc::new(users))
///     .unwrap();
///
/// # tokio_test::block_on(async {
/// let resource = pipeline.handle_read(Context::root(), ReadRequest::new("users")).await.unwrap();
/// assert_eq!(resource.content, json!("v1"));
/// # });
/// ```
pub struct DispatchPipeline {
    filters: FilterChain,
    router: Arc<Router>,
    selector: Arc<VersionSelector>,
    advice: Arc<dyn VersionAdvice>,
}

impl DispatchPipeline {
    /// Creates a pipeline with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(&ConduitConfig::default())
    }

    /// Creates a pipeline from configuration.
    ///
    /// When logging is enabled the chain starts with a [`LoggingFilter`].
    #[must_use]
    pub fn from_config(config: &ConduitConfig) -> Self {
        let router = Arc::new(Router::new());
        let filters = FilterChain::new(Arc::clone(&router) as SharedHandler);
        if config.logging.enabled {
            filters.add_filter(Arc::new(LoggingFilter::new()));
        }

        tracing::debug!(
            default_version_behaviour = ?config.versioning.default_behaviour,
            warn_on_missing_version = config.versioning.warn_on_missing_version,
            "dispatch pipeline created"
        );

        Self {
            filters,
            router,
            selector: Arc::new(VersionSelector::new(config.versioning.default_behaviour)),
            advice: Arc::new(TracingAdvice::new(config.versioning.warn_on_missing_version)),
        }
    }

    /// Replaces the advice given to version routers created afterwards.
    #[must_use]
    pub fn with_version_advice(mut self, advice: Arc<dyn VersionAdvice>) -> Self {
        self.advice = advice;
        self
    }

    /// The filter chain. Its target is the root router.
    #[must_use]
    pub const fn filters(&self) -> &FilterChain {
        &self.filters
    }

    /// The root router.
    #[must_use]
    pub const fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// The version selector shared by this pipeline's version routers.
    #[must_use]
    pub const fn selector(&self) -> &Arc<VersionSelector> {
        &self.selector
    }

    /// Creates an empty version router bound to the pipeline's selector.
    #[must_use]
    pub fn version_router(&self) -> VersionRouter {
        VersionRouter::with_selector(Arc::clone(&self.selector))
            .with_advice(Arc::clone(&self.advice))
    }

    /// The behaviour used when a request names no resource version.
    #[must_use]
    pub fn default_version_behaviour(&self) -> DefaultVersionBehaviour {
        self.selector.default_behaviour()
    }

    /// Changes the default version behaviour for subsequent dispatches.
    pub fn set_default_version_behaviour(&self, behaviour: DefaultVersionBehaviour) {
        self.selector.set_default_behaviour(behaviour);
    }
}

impl Default for DispatchPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DispatchPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchPipeline")
            .field("filters", &self.filters)
            .field("router", &self.router)
            .field("selector", &self.selector)
            .finish_non_exhaustive()
    }
}

impl RequestHandler for DispatchPipeline {
    fn handle<'a>(
        &'a self,
        ctx: Context,
        request: Request,
    ) -> BoxFuture<'a, ResourceResult<Response>> {
        self.filters.handle(ctx, request)
    }
}
