//! Integration tests for filter ordering, short-circuiting and snapshot
//! isolation.

use std::sync::{Arc, Mutex};

use conduit_core::{
    Context, FnHandler, ReadRequest, Request, RequestHandler, RequestType, Resource,
    ResourceError, Response, SharedHandler,
};
use conduit_middleware::{
    match_request_type, match_resource_path, ConditionalFilter, FilterChain, FnFilter, Next,
    SharedFilter,
};
use serde_json::json;
use tokio::sync::{oneshot, Notify};

type Trace = Arc<Mutex<Vec<String>>>;

fn recording_target(trace: &Trace) -> SharedHandler {
    let trace = Arc::clone(trace);
    Arc::new(FnHandler::new(move |_ctx, request: Request| {
        let trace = Arc::clone(&trace);
        async move {
            trace.lock().unwrap().push("T".to_string());
            Ok(Response::Resource(Resource::new(
                None,
                None,
                json!(request.resource_path()),
            )))
        }
    }))
}

fn recording_filter(name: &'static str, trace: &Trace) -> SharedFilter {
    let trace = Arc::clone(trace);
    Arc::new(FnFilter::new(name, move |ctx, request, next: Next| {
        trace.lock().unwrap().push(name.to_string());
        next.run(ctx, request)
    }))
}

fn recorded(trace: &Trace) -> Vec<String> {
    trace.lock().unwrap().clone()
}

#[tokio::test]
async fn filters_run_in_order_before_target() {
    let trace = Trace::default();
    let chain = FilterChain::new(recording_target(&trace));
    chain.add_filter(recording_filter("A", &trace));
    chain.add_filter(recording_filter("B", &trace));

    chain
        .handle_read(Context::root(), ReadRequest::new("x"))
        .await
        .unwrap();

    assert_eq!(recorded(&trace), ["A", "B", "T"]);
}

#[tokio::test]
async fn short_circuit_skips_rest_of_chain() {
    let trace = Trace::default();
    let chain = FilterChain::new(recording_target(&trace));

    let t = Arc::clone(&trace);
    chain.add_filter(Arc::new(FnFilter::new("A", move |_ctx, _req, _next: Next| {
        t.lock().unwrap().push("A".to_string());
        async { Err(ResourceError::forbidden("denied")) }
    })));
    chain.add_filter(recording_filter("B", &trace));

    let err = chain
        .handle_read(Context::root(), ReadRequest::new("x"))
        .await
        .unwrap_err();

    assert!(matches!(err, ResourceError::Forbidden { .. }));
    assert_eq!(recorded(&trace), ["A"]);
}

#[tokio::test]
async fn filter_can_answer_without_target() {
    let trace = Trace::default();
    let chain = FilterChain::new(recording_target(&trace));
    chain.add_filter(Arc::new(FnFilter::new("cache", |_ctx, _req, _next: Next| async {
        Ok(Response::Resource(Resource::new(None, None, json!("cached"))))
    })));

    let resource = chain
        .handle_read(Context::root(), ReadRequest::new("x"))
        .await
        .unwrap();

    assert_eq!(resource.content, json!("cached"));
    assert!(recorded(&trace).is_empty());
}

#[tokio::test]
async fn filter_rewrites_request() {
    let trace = Trace::default();
    let chain = FilterChain::new(recording_target(&trace));
    chain.add_filter(Arc::new(FnFilter::new("alias", |ctx, request: Request, next: Next| {
        let request = if request.resource_path() == "me" {
            request.with_resource_path("users/42")
        } else {
            request
        };
        next.run(ctx, request)
    })));

    let resource = chain
        .handle_read(Context::root(), ReadRequest::new("me"))
        .await
        .unwrap();

    assert_eq!(resource.content, json!("users/42"));
}

#[tokio::test]
async fn removal_during_dispatch_does_not_affect_in_flight_request() {
    let trace = Trace::default();
    let chain = Arc::new(FilterChain::new(recording_target(&trace)));

    let entered = Arc::new(Notify::new());
    let (release_tx, release_rx) = oneshot::channel::<()>();
    let release_rx = Arc::new(Mutex::new(Some(release_rx)));

    let t = Arc::clone(&trace);
    let signal = Arc::clone(&entered);
    chain.add_filter(Arc::new(FnFilter::new("A", move |ctx, request, next: Next| {
        t.lock().unwrap().push("A".to_string());
        let signal = Arc::clone(&signal);
        let release = release_rx.lock().unwrap().take();
        async move {
            signal.notify_one();
            if let Some(release) = release {
                let _ = release.await;
            }
            next.run(ctx, request).await
        }
    })));
    let b = chain.add_filter(recording_filter("B", &trace));

    let in_flight = {
        let chain = Arc::clone(&chain);
        tokio::spawn(async move {
            chain
                .handle_read(Context::root(), ReadRequest::new("x"))
                .await
        })
    };

    entered.notified().await;
    assert!(chain.remove_filter(&b));
    release_tx.send(()).unwrap();

    in_flight.await.unwrap().unwrap();
    assert_eq!(recorded(&trace), ["A", "B", "T"]);

    trace.lock().unwrap().clear();
    chain
        .handle_read(Context::root(), ReadRequest::new("x"))
        .await
        .unwrap();
    assert_eq!(recorded(&trace), ["A", "T"]);
}

#[tokio::test]
async fn conditional_filter_applies_only_when_condition_holds() {
    let trace = Trace::default();
    let chain = FilterChain::new(recording_target(&trace));
    let guarded = recording_filter("audit", &trace);
    chain.add_filter(Arc::new(ConditionalFilter::new(
        match_resource_path("admin/.*").unwrap(),
        guarded,
    )));

    chain
        .handle_read(Context::root(), ReadRequest::new("public/page"))
        .await
        .unwrap();
    assert_eq!(recorded(&trace), ["T"]);

    trace.lock().unwrap().clear();
    chain
        .handle_read(Context::root(), ReadRequest::new("admin/users"))
        .await
        .unwrap();
    assert_eq!(recorded(&trace), ["audit", "T"]);
}

#[tokio::test]
async fn conditional_filter_by_request_type() {
    let trace = Trace::default();
    let chain = FilterChain::new(recording_target(&trace));
    let reject_writes: SharedFilter = Arc::new(FnFilter::new("reject", |_ctx, _req, _next: Next| async {
        Err(ResourceError::forbidden("read only"))
    }));
    chain.add_filter(Arc::new(ConditionalFilter::new(
        match_request_type([RequestType::Create, RequestType::Update, RequestType::Delete]),
        reject_writes,
    )));

    assert!(chain
        .handle_read(Context::root(), ReadRequest::new("x"))
        .await
        .is_ok());
    let err = chain
        .handle_delete(Context::root(), conduit_core::DeleteRequest::new("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, ResourceError::Forbidden { .. }));
}
