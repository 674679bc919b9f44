//! Request handler contract.
//!
//! [`RequestHandler`] is the single interface shared by routers, version
//! routers, filter chains and leaf handlers. Its primitive is
//! [`RequestHandler::handle`]; the typed `handle_*` operations are provided
//! on top of it.
//!
//! Leaf handlers usually implement [`ResourceProvider`] instead, overriding
//! only the operations they support, and are exposed as handlers through
//! [`Provider`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::context::Context;
use crate::error::{ResourceError, ResourceResult};
use crate::request::{
    ActionRequest, CreateRequest, DeleteRequest, PatchRequest, QueryRequest, ReadRequest, Request,
    RequestType, UpdateRequest,
};
use crate::resource::{QueryResponse, Resource, Response};

/// A boxed future that returns a value.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A shared, type-erased request handler.
pub type SharedHandler = Arc<dyn RequestHandler>;

/// Handles requests of every type.
///
/// Each call produces exactly one result. The future may complete
/// immediately or suspend on I/O; the dispatch core makes no assumption
/// about which.
pub trait RequestHandler: Send + Sync {
    /// Handles a request of any type.
    fn handle<'a>(
        &'a self,
        ctx: Context,
        request: Request,
    ) -> BoxFuture<'a, ResourceResult<Response>>;

    /// Handles a create request.
    fn handle_create<'a>(
        &'a self,
        ctx: Context,
        request: CreateRequest,
    ) -> BoxFuture<'a, ResourceResult<Resource>> {
        let fut = self.handle(ctx, request.into());
        Box::pin(async move { fut.await?.into_resource() })
    }

    /// Handles a read request.
    fn handle_read<'a>(
        &'a self,
        ctx: Context,
        request: ReadRequest,
    ) -> BoxFuture<'a, ResourceResult<Resource>> {
        let fut = self.handle(ctx, request.into());
        Box::pin(async move { fut.await?.into_resource() })
    }

    /// Handles an update request.
    fn handle_update<'a>(
        &'a self,
        ctx: Context,
        request: UpdateRequest,
    ) -> BoxFuture<'a, ResourceResult<Resource>> {
        let fut = self.handle(ctx, request.into());
        Box::pin(async move { fut.await?.into_resource() })
    }

    /// Handles a delete request.
    fn handle_delete<'a>(
        &'a self,
        ctx: Context,
        request: DeleteRequest,
    ) -> BoxFuture<'a, ResourceResult<Resource>> {
        let fut = self.handle(ctx, request.into());
        Box::pin(async move { fut.await?.into_resource() })
    }

    /// Handles a patch request.
    fn handle_patch<'a>(
        &'a self,
        ctx: Context,
        request: PatchRequest,
    ) -> BoxFuture<'a, ResourceResult<Resource>> {
        let fut = self.handle(ctx, request.into());
        Box::pin(async move { fut.await?.into_resource() })
    }

    /// Handles a query request.
    fn handle_query<'a>(
        &'a self,
        ctx: Context,
        request: QueryRequest,
    ) -> BoxFuture<'a, ResourceResult<QueryResponse>> {
        let fut = self.handle(ctx, request.into());
        Box::pin(async move { fut.await?.into_query() })
    }

    /// Handles an action request.
    fn handle_action<'a>(
        &'a self,
        ctx: Context,
        request: ActionRequest,
    ) -> BoxFuture<'a, ResourceResult<Value>> {
        let fut = self.handle(ctx, request.into());
        Box::pin(async move { fut.await?.into_action() })
    }
}

impl<H: RequestHandler + ?Sized> RequestHandler for Arc<H> {
    fn handle<'a>(
        &'a self,
        ctx: Context,
        request: Request,
    ) -> BoxFuture<'a, ResourceResult<Response>> {
        (**self).handle(ctx, request)
    }
}

fn unsupported<'a, T: Send + 'a>(request_type: RequestType) -> BoxFuture<'a, ResourceResult<T>> {
    Box::pin(std::future::ready(Err(ResourceError::not_supported(
        format!("{request_type} requests are not supported by this resource"),
    ))))
}

/// A leaf resource implementation.
///
/// Every operation defaults to a `NotSupported` error, so implementors only
/// override what the resource actually offers.
///
/// # Example
///
/// ```
/// use conduit_core::{
///     BoxFuture, Context, Provider, ReadRequest, RequestHandler, Resource, ResourceProvider,
///     ResourceResult,
/// };
/// use serde_json::json;
///
/// struct Greeting;
///
/// impl ResourceProvider for Greeting {
///     fn read<'a>(&'a self, _ctx: Context, request: ReadRequest) -> BoxFuture<'a, ResourceResult<Resource>> {
///         Box::pin(async move {
///             Ok(Resource::new(Some(&request.resource_path), None, json!({ "hello": "world" })))
///         })
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let handler = Provider::new(Greeting);
/// let resource = handler.handle_read(Context::root(), ReadRequest::new("earth")).await.unwrap();
/// assert_eq!(resource.id.as_deref(), Some("earth"));
/// # });
/// ```
pub trait ResourceProvider: Send + Sync {
    /// Creates a resource.
    fn create<'a>(
        &'a self,
        _ctx: Context,
        _request: CreateRequest,
    ) -> BoxFuture<'a, ResourceResult<Resource>> {
        unsupported(RequestType::Create)
    }

    /// Reads a resource.
    fn read<'a>(
        &'a self,
        _ctx: Context,
        _request: ReadRequest,
    ) -> BoxFuture<'a, ResourceResult<Resource>> {
        unsupported(RequestType::Read)
    }

    /// Replaces a resource.
    fn update<'a>(
        &'a self,
        _ctx: Context,
        _request: UpdateRequest,
    ) -> BoxFuture<'a, ResourceResult<Resource>> {
        unsupported(RequestType::Update)
    }

    /// Deletes a resource.
    fn delete<'a>(
        &'a self,
        _ctx: Context,
        _request: DeleteRequest,
    ) -> BoxFuture<'a, ResourceResult<Resource>> {
        unsupported(RequestType::Delete)
    }

    /// Patches a resource.
    fn patch<'a>(
        &'a self,
        _ctx: Context,
        _request: PatchRequest,
    ) -> BoxFuture<'a, ResourceResult<Resource>> {
        unsupported(RequestType::Patch)
    }

    /// Queries a collection.
    fn query<'a>(
        &'a self,
        _ctx: Context,
        _request: QueryRequest,
    ) -> BoxFuture<'a, ResourceResult<QueryResponse>> {
        unsupported(RequestType::Query)
    }

    /// Performs an action.
    fn action<'a>(
        &'a self,
        _ctx: Context,
        _request: ActionRequest,
    ) -> BoxFuture<'a, ResourceResult<Value>> {
        unsupported(RequestType::Action)
    }
}

/// Exposes a [`ResourceProvider`] as a [`RequestHandler`].
#[derive(Debug, Clone, Default)]
pub struct Provider<P> {
    inner: P,
}

impl<P: ResourceProvider> Provider<P> {
    /// Wraps a provider.
    #[must_use]
    pub const fn new(inner: P) -> Self {
        Self { inner }
    }

    /// Wraps a provider into a shared handler.
    #[must_use]
    pub fn shared(inner: P) -> SharedHandler
    where
        P: 'static,
    {
        Arc::new(Self::new(inner))
    }

    /// Returns the wrapped provider.
    #[must_use]
    pub const fn get_ref(&self) -> &P {
        &self.inner
    }
}

impl<P: ResourceProvider> RequestHandler for Provider<P> {
    fn handle<'a>(
        &'a self,
        ctx: Context,
        request: Request,
    ) -> BoxFuture<'a, ResourceResult<Response>> {
        match request {
            Request::Create(r) => map(self.inner.create(ctx, r), Response::Resource),
            Request::Read(r) => map(self.inner.read(ctx, r), Response::Resource),
            Request::Update(r) => map(self.inner.update(ctx, r), Response::Resource),
            Request::Delete(r) => map(self.inner.delete(ctx, r), Response::Resource),
            Request::Patch(r) => map(self.inner.patch(ctx, r), Response::Resource),
            Request::Query(r) => map(self.inner.query(ctx, r), Response::Query),
            Request::Action(r) => map(self.inner.action(ctx, r), Response::Action),
        }
    }
}

fn map<'a, T: Send + 'a>(
    fut: BoxFuture<'a, ResourceResult<T>>,
    f: fn(T) -> Response,
) -> BoxFuture<'a, ResourceResult<Response>> {
    Box::pin(async move { fut.await.map(f) })
}

/// A handler built from an async function.
///
/// # Example
///
/// ```
/// use conduit_core::{FnHandler, ReadRequest, RequestHandler, Resource, Response};
/// use serde_json::json;
///
/// let handler = FnHandler::new(|_ctx, request| async move {
///     Ok(Response::Resource(Resource::new(None, None, json!(request.resource_path()))))
/// });
/// # tokio_test::block_on(async {
/// let resource = handler
///     .handle_read(conduit_core::Context::root(), ReadRequest::new("a/b"))
///     .await
///     .unwrap();
/// assert_eq!(resource.content, json!("a/b"));
/// # });
/// ```
pub struct FnHandler<F> {
    func: F,
}

impl<F, Fut> FnHandler<F>
where
    F: Fn(Context, Request) -> Fut + Send + Sync,
    Fut: Future<Output = ResourceResult<Response>> + Send + 'static,
{
    /// Creates a new function-based handler.
    pub const fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F, Fut> RequestHandler for FnHandler<F>
where
    F: Fn(Context, Request) -> Fut + Send + Sync,
    Fut: Future<Output = ResourceResult<Response>> + Send + 'static,
{
    fn handle<'a>(
        &'a self,
        ctx: Context,
        request: Request,
    ) -> BoxFuture<'a, ResourceResult<Response>> {
        Box::pin((self.func)(ctx, request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct ReadOnly;

    impl ResourceProvider for ReadOnly {
        fn read<'a>(
            &'a self,
            _ctx: Context,
            request: ReadRequest,
        ) -> BoxFuture<'a, ResourceResult<Resource>> {
            Box::pin(async move {
                Ok(Resource::new(
                    Some(&request.resource_path),
                    Some("1"),
                    json!({}),
                ))
            })
        }
    }

    #[tokio::test]
    async fn test_provider_dispatches_by_type() {
        let handler = Provider::new(ReadOnly);
        let resource = handler
            .handle_read(Context::root(), ReadRequest::new("42"))
            .await
            .unwrap();
        assert_eq!(resource.id.as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn test_unimplemented_operations_are_not_supported() {
        let handler = Provider::new(ReadOnly);
        let err = handler
            .handle_delete(Context::root(), DeleteRequest::new("42"))
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::NotSupported { .. }));
        assert!(err.to_string().contains("delete"));
    }

    #[tokio::test]
    async fn test_mismatched_response_is_internal_error() {
        let handler = FnHandler::new(|_ctx, _req| async { Ok(Response::Action(json!(1))) });
        let err = handler
            .handle_read(Context::root(), ReadRequest::new("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::Internal { .. }));
    }

    #[tokio::test]
    async fn test_shared_handler_delegates() {
        let handler: SharedHandler = Provider::shared(ReadOnly);
        let response = handler
            .handle(Context::root(), ReadRequest::new("7").into())
            .await
            .unwrap();
        assert_eq!(response.as_resource().unwrap().id.as_deref(), Some("7"));
    }
}
