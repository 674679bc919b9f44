//! Path router.
//!
//! The [`Router`] owns a table of `(template, mode, handler)` bindings and an
//! optional default handler. Both are held in `ArcSwap` cells: a dispatch
//! loads one snapshot of the table and matches against it, while writers
//! publish a new table with read-copy-update. Readers never block.

use std::cmp::Reverse;
use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use conduit_core::{
    normalize_path, BoxFuture, Context, Params, Request, RequestHandler, ResourceError,
    ResourceResult, Response, RouterContext, SharedHandler,
};
use conduit_telemetry::metrics::record_route_miss;

use crate::template::{RoutingMode, TemplateMatch, UriTemplate};

/// A registered binding.
pub struct Route {
    template: UriTemplate,
    handler: SharedHandler,
}

impl Route {
    /// Compiles a binding.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` if the template is malformed.
    pub fn new(mode: RoutingMode, template: &str, handler: SharedHandler) -> ResourceResult<Self> {
        Ok(Self {
            template: UriTemplate::compile(mode, template)?,
            handler,
        })
    }

    /// The routing mode.
    #[must_use]
    pub const fn mode(&self) -> RoutingMode {
        self.template.mode()
    }

    /// The compiled template.
    #[must_use]
    pub const fn template(&self) -> &UriTemplate {
        &self.template
    }

    /// The bound handler.
    #[must_use]
    pub const fn handler(&self) -> &SharedHandler {
        &self.handler
    }

    // Higher ranks win: longer consumed prefix, then Equals, then fewer
    // captured variables.
    fn rank(&self, m: &TemplateMatch) -> (usize, bool, Reverse<usize>) {
        (
            m.consumed,
            self.mode() == RoutingMode::Equals,
            Reverse(m.variables.len()),
        )
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("mode", &self.mode())
            .field("template", &self.template.template())
            .finish_non_exhaustive()
    }
}

/// The outcome of a routing decision.
pub struct RouteMatch {
    /// Handler the request is forwarded to.
    pub handler: SharedHandler,
    /// Child of the caller's context carrying the new router frame.
    pub context: Context,
    /// Path left for the next routing stage.
    pub remaining: String,
    /// The matched binding, or `None` when the default route was used.
    pub route: Option<Arc<Route>>,
}

impl fmt::Debug for RouteMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteMatch")
            .field("route", &self.route)
            .field("remaining", &self.remaining)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// A router over a runtime-mutable table of URI template bindings.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use conduit_core::{
///     Context, FnHandler, ReadRequest, RequestHandler, Resource, ResourceError, Response,
///     RouterContext,
/// };
/// use conduit_router::{Router, RoutingMode};
/// use serde_json::json;
///
/// let router = Router::new();
/// router
///     .add_route(
///         RoutingMode::Equals,
///         "users/{id}",
///         Arc::new(FnHandler::new(|ctx: Context, _req| async move {
///             let id = ctx.as_context::<RouterContext>()?.variable("id").map(str::to_owned);
///             Ok::<_, ResourceError>(Response::Resource(Resource::new(id.as_deref(), None, json!({}))))
///         })),
///     )
///     .unwrap();
///
/// # tokio_test::block_on(async {
/// let user = router.handle_read(Context::root(), ReadRequest::new("users/42")).await.unwrap();
/// assert_eq!(user.id.as_deref(), Some("42"));
/// # });
/// ```
pub struct Router {
    routes: ArcSwap<Vec<Arc<Route>>>,
    default_route: ArcSwap<Option<SharedHandler>>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes.load())
            .field("has_default_route", &self.default_route().is_some())
            .finish()
    }
}

impl Router {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            routes: ArcSwap::from_pointee(Vec::new()),
            default_route: ArcSwap::from_pointee(None),
        }
    }

    /// Registers a binding and returns it, for later removal.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` if the template is malformed, or if a binding
    /// with the same mode and an equivalent template is already registered.
    pub fn add_route(
        &self,
        mode: RoutingMode,
        template: &str,
        handler: SharedHandler,
    ) -> ResourceResult<Arc<Route>> {
        let route = Arc::new(Route::new(mode, template, handler)?);
        self.insert_all(std::slice::from_ref(&route))?;
        tracing::debug!(route = %route.template, mode = %mode, "route added");
        Ok(route)
    }

    /// Registers every binding of `other`, keeping their order.
    ///
    /// The default route of `other` is not copied. Nothing is registered if
    /// any binding conflicts.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` on the first conflicting binding.
    pub fn add_all_routes(&self, other: &Self) -> ResourceResult<()> {
        let routes = other.routes.load_full();
        self.insert_all(&routes)
    }

    fn insert_all(&self, added: &[Arc<Route>]) -> ResourceResult<()> {
        let mut conflict = None;
        self.routes.rcu(|current| {
            conflict = None;
            let mut next = Vec::with_capacity(current.len() + added.len());
            next.extend(current.iter().cloned());
            for route in added {
                if next
                    .iter()
                    .any(|r: &Arc<Route>| r.template.same_matcher(&route.template))
                {
                    conflict = Some(Arc::clone(route));
                    return Arc::clone(current);
                }
                next.push(Arc::clone(route));
            }
            Arc::new(next)
        });

        match conflict {
            Some(route) => Err(ResourceError::bad_request(format!(
                "A route for '{}' ({}) is already registered",
                route.template,
                route.mode()
            ))),
            None => Ok(()),
        }
    }

    /// Removes a binding previously returned by [`Router::add_route`].
    ///
    /// Dispatches that already loaded the table are unaffected. Returns
    /// true if the binding was registered.
    pub fn remove_route(&self, route: &Arc<Route>) -> bool {
        let mut removed = false;
        self.routes.rcu(|current| {
            let next: Vec<_> = current
                .iter()
                .filter(|r| !Arc::ptr_eq(r, route))
                .cloned()
                .collect();
            removed = next.len() != current.len();
            next
        });
        if removed {
            tracing::debug!(route = %route.template, "route removed");
        }
        removed
    }

    /// Removes every binding. The default route is kept.
    pub fn remove_all_routes(&self) {
        self.routes.store(Arc::new(Vec::new()));
    }

    /// Returns a snapshot of the bindings in registration order.
    #[must_use]
    pub fn routes(&self) -> Vec<Arc<Route>> {
        self.routes.load().iter().cloned().collect()
    }

    /// Returns the number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.load().len()
    }

    /// Returns true if no bindings are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.load().is_empty()
    }

    /// Sets the handler used when no binding matches.
    pub fn set_default_route(&self, handler: SharedHandler) {
        self.default_route.store(Arc::new(Some(handler)));
    }

    /// Removes the default handler.
    pub fn clear_default_route(&self) {
        self.default_route.store(Arc::new(None));
    }

    /// Returns the default handler, if any.
    #[must_use]
    pub fn default_route(&self) -> Option<SharedHandler> {
        Option::clone(&self.default_route.load())
    }

    /// Finds the best binding for `path`.
    ///
    /// Every binding in the current table is tried. Among those that match,
    /// the winner consumed the longest prefix; ties go to `Equals` over
    /// `StartsWith`, then to fewer captured variables, then to the earliest
    /// registered binding. Without a match the default route receives the
    /// whole path as remainder.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if nothing matches and no default route is set.
    pub fn route(&self, ctx: &Context, path: &str) -> ResourceResult<RouteMatch> {
        let path = normalize_path(path);
        let routes = self.routes.load();

        let mut best: Option<(&Arc<Route>, TemplateMatch)> = None;
        for route in routes.iter() {
            let Some(candidate) = route.template.matches(&path) else {
                continue;
            };
            let better = match &best {
                None => true,
                Some((current, current_match)) => {
                    route.rank(&candidate) > current.rank(current_match)
                }
            };
            if better {
                best = Some((route, candidate));
            }
        }

        if let Some((route, m)) = best {
            tracing::trace!(
                route = %route.template,
                resource_path = %path,
                remaining = %m.remaining,
                "route matched"
            );
            let TemplateMatch {
                matched,
                remaining,
                variables,
                ..
            } = m;
            let frame = RouterContext::new(ctx, matched, remaining.clone(), variables);
            return Ok(RouteMatch {
                handler: Arc::clone(&route.handler),
                context: ctx.push(frame),
                remaining,
                route: Some(Arc::clone(route)),
            });
        }

        if let Some(handler) = self.default_route() {
            tracing::trace!(resource_path = %path, "default route selected");
            let frame = RouterContext::new(ctx, "", path.clone(), Params::new());
            return Ok(RouteMatch {
                handler,
                context: ctx.push(frame),
                remaining: path,
                route: None,
            });
        }

        record_route_miss();
        tracing::debug!(resource_path = %path, "no route matched");
        Err(ResourceError::not_found_path(path))
    }
}

impl RequestHandler for Router {
    fn handle<'a>(
        &'a self,
        ctx: Context,
        request: Request,
    ) -> BoxFuture<'a, ResourceResult<Response>> {
        match self.route(&ctx, request.resource_path()) {
            Ok(m) => {
                let request = request.with_resource_path(&m.remaining);
                Box::pin(async move { m.handler.handle(m.context, request).await })
            }
            Err(e) => Box::pin(std::future::ready(Err(e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_core::{FnHandler, ReadRequest, Resource};
    use serde_json::json;

    /// A handler that answers with its own name and the path it received.
    fn named(name: &'static str) -> SharedHandler {
        Arc::new(FnHandler::new(move |ctx: Context, request: Request| async move {
            let vars = ctx
                .find::<RouterContext>()
                .map(|r| serde_json::to_value(r.variables()).unwrap_or_default());
            Ok(Response::Resource(Resource::new(
                Some(name),
                None,
                json!({ "path": request.resource_path(), "vars": vars }),
            )))
        }))
    }

    async fn read(router: &Router, path: &str) -> ResourceResult<Resource> {
        router
            .handle_read(Context::root(), ReadRequest::new(path))
            .await
    }

    fn winner(router: &Router, path: &str) -> Option<String> {
        router
            .route(&Context::root(), path)
            .ok()
            .and_then(|m| m.route)
            .map(|r| r.template().template().to_string())
    }

    #[test]
    fn test_literal_beats_variable() {
        let router = Router::new();
        router.add_route(RoutingMode::Equals, "a/{x}", named("var")).unwrap();
        router.add_route(RoutingMode::Equals, "a/b", named("lit")).unwrap();

        assert_eq!(winner(&router, "a/b").as_deref(), Some("a/b"));
        assert_eq!(winner(&router, "a/c").as_deref(), Some("a/{x}"));
    }

    #[test]
    fn test_equals_only_matches_without_remainder() {
        let router = Router::new();
        router.add_route(RoutingMode::StartsWith, "a", named("prefix")).unwrap();
        router.add_route(RoutingMode::Equals, "a/b", named("exact")).unwrap();

        assert_eq!(winner(&router, "a/b/c").as_deref(), Some("a"));
        assert_eq!(winner(&router, "a/b").as_deref(), Some("a/b"));
    }

    #[test]
    fn test_longest_prefix_wins() {
        let router = Router::new();
        router.add_route(RoutingMode::StartsWith, "a", named("short")).unwrap();
        router.add_route(RoutingMode::StartsWith, "a/{b}", named("long")).unwrap();

        let m = router.route(&Context::root(), "a/x/y").unwrap();
        assert_eq!(m.remaining, "y");
        assert_eq!(m.route.unwrap().template().template(), "a/{b}");
    }

    #[test]
    fn test_equals_beats_starts_with_on_same_length() {
        let router = Router::new();
        router.add_route(RoutingMode::StartsWith, "a/b", named("prefix")).unwrap();
        router.add_route(RoutingMode::Equals, "a/b", named("exact")).unwrap();

        let m = router.route(&Context::root(), "a/b").unwrap();
        assert_eq!(m.route.unwrap().mode(), RoutingMode::Equals);
    }

    #[test]
    fn test_full_tie_keeps_registration_order() {
        let router = Router::new();
        router.add_route(RoutingMode::StartsWith, "{x}/b", named("first")).unwrap();
        router.add_route(RoutingMode::StartsWith, "a/{y}", named("second")).unwrap();

        assert_eq!(winner(&router, "a/b/c").as_deref(), Some("{x}/b"));
    }

    #[test]
    fn test_duplicate_binding_rejected() {
        let router = Router::new();
        router.add_route(RoutingMode::Equals, "users/{id}", named("a")).unwrap();
        let err = router
            .add_route(RoutingMode::Equals, "users/{userId}", named("b"))
            .unwrap_err();
        assert!(err.is_bad_request());
        assert_eq!(router.len(), 1);

        router
            .add_route(RoutingMode::StartsWith, "users/{id}", named("c"))
            .unwrap();
        assert_eq!(router.len(), 2);
    }

    #[test]
    fn test_malformed_template_rejected_at_registration() {
        let router = Router::new();
        let err = router
            .add_route(RoutingMode::Equals, "users/{id", named("a"))
            .unwrap_err();
        assert!(err.is_bad_request());
        assert!(router.is_empty());
    }

    #[test]
    fn test_not_found_without_default() {
        let router = Router::new();
        router.add_route(RoutingMode::Equals, "users", named("users")).unwrap();

        let err = router.route(&Context::root(), "groups").unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_default_route_gets_whole_path() {
        let router = Router::new();
        router.add_route(RoutingMode::Equals, "users", named("users")).unwrap();
        router.set_default_route(named("fallback"));

        let resource = read(&router, "groups/7").await.unwrap();
        assert_eq!(resource.id.as_deref(), Some("fallback"));
        assert_eq!(resource.content["path"], "groups/7");

        router.clear_default_route();
        assert!(read(&router, "groups/7").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_handle_rewrites_path_and_pushes_frame() {
        let router = Router::new();
        router
            .add_route(RoutingMode::StartsWith, "users/{id}", named("user"))
            .unwrap();

        let resource = read(&router, "users/42/devices").await.unwrap();
        assert_eq!(resource.content["path"], "devices");
        assert_eq!(resource.content["vars"], json!({ "id": "42" }));
    }

    #[tokio::test]
    async fn test_nested_routers_accumulate_base_path() {
        let inner = Arc::new(Router::new());
        inner
            .add_route(
                RoutingMode::Equals,
                "users/{id}",
                Arc::new(FnHandler::new(|ctx: Context, _req| async move {
                    let frame = ctx.as_context::<RouterContext>()?;
                    Ok::<_, ResourceError>(Response::Action(json!(frame.base_path())))
                })),
            )
            .unwrap();

        let outer = Router::new();
        outer
            .add_route(RoutingMode::StartsWith, "realms/{realm}", inner)
            .unwrap();

        let response = outer
            .handle(
                Context::root(),
                ReadRequest::new("realms/root/users/42").into(),
            )
            .await
            .unwrap();
        assert_eq!(response, Response::Action(json!("realms/root/users/42")));
    }

    #[test]
    fn test_remove_route_and_add_all() {
        let router = Router::new();
        let a = router.add_route(RoutingMode::Equals, "a", named("a")).unwrap();
        router.add_route(RoutingMode::Equals, "b", named("b")).unwrap();

        let copy = Router::new();
        copy.add_all_routes(&router).unwrap();
        assert_eq!(copy.len(), 2);
        assert!(copy.add_all_routes(&router).unwrap_err().is_bad_request());
        assert_eq!(copy.len(), 2);

        assert!(router.remove_route(&a));
        assert!(!router.remove_route(&a));
        assert_eq!(winner(&router, "a"), None);
        assert_eq!(winner(&copy, "a").as_deref(), Some("a"));

        router.remove_all_routes();
        assert!(router.is_empty());
    }

    #[test]
    fn test_snapshot_survives_removal() {
        let router = Router::new();
        let a = router.add_route(RoutingMode::Equals, "a", named("a")).unwrap();
        let snapshot = router.routes();
        router.remove_route(&a);

        assert_eq!(snapshot.len(), 1);
        assert!(Arc::ptr_eq(&snapshot[0], &a));
        assert!(router.routes().is_empty());
    }

    #[test]
    fn test_concurrent_add_and_remove() {
        let router = Router::new();
        std::thread::scope(|s| {
            for t in 0..8 {
                let router = &router;
                s.spawn(move || {
                    for i in 0..200 {
                        let route = router
                            .add_route(RoutingMode::Equals, &format!("t{t}/r{i}"), named("r"))
                            .unwrap();
                        if i % 2 == 0 {
                            assert!(router.remove_route(&route));
                        }
                    }
                });
            }
        });

        assert_eq!(router.len(), 800);
        assert_eq!(winner(&router, "t3/r7").as_deref(), Some("t3/r7"));
        assert_eq!(winner(&router, "t3/r8"), None);
    }

    #[test]
    fn test_concurrent_duplicates_register_once() {
        let router = Router::new();
        let added: usize = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|t| {
                    let router = &router;
                    s.spawn(move || {
                        router
                            .add_route(RoutingMode::Equals, &format!("shared/{{v{t}}}"), named("s"))
                            .is_ok()
                    })
                })
                .collect();
            handles.into_iter().map(|h| usize::from(h.join().unwrap())).sum()
        });

        assert_eq!(added, 1);
        assert_eq!(router.len(), 1);
    }
}
