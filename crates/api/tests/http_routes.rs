//! HTTP route tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use restock_api::{router, AppContext};
use restock_domain::Config;
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_config(queue_capacity: usize) -> Config {
    let mut config = Config::default();
    config.pipeline.queue_capacity = queue_capacity;
    config.pipeline.workers = 1;
    config.retry.max_attempts = 1;
    config.server.shutdown_grace = Duration::from_secs(2);
    config
}

fn app(context: &Arc<AppContext>) -> Router {
    router(Arc::clone(context))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_event(body: impl Into<Body>) -> Request<Body> {
    Request::post("/api/v1/events")
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

/// Validates the liveness endpoint.
///
/// Assertions:
/// - 200 with `{"status":"healthy"}`.
#[tokio::test]
async fn test_health() {
    let context = Arc::new(AppContext::new(test_config(10)).unwrap());
    let (status, body) = send(app(&context), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "healthy"}));
}

/// Validates an event is accepted and later readable.
///
/// # Test Steps
/// 1. POST `{p1, 10.0, 5}`
/// 2. Shut down to drain the queue
/// 3. GET the product
///
/// Assertions:
/// - 202 with the acceptance message and product id.
/// - The product reads back with the posted values.
#[tokio::test]
async fn test_event_then_product_lookup() {
    let context = Arc::new(AppContext::new(test_config(10)).unwrap());
    context.start().await.unwrap();

    let payload = json!({"product_id": "p1", "price": 10.0, "stock": 5}).to_string();
    let (status, body) = send(app(&context), post_event(payload)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(
        body,
        json!({"message": "Event accepted for processing", "product_id": "p1"})
    );

    context.shutdown().await.unwrap();

    let (status, body) = send(app(&context), get("/api/v1/products/p1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"id": "p1", "price": 10.0, "stock": 5}));
}

/// Validates request validation errors.
///
/// Assertions:
/// - Malformed JSON yields 400 `Invalid JSON payload`.
/// - An empty `product_id` yields 400 `product_id is required`.
#[tokio::test]
async fn test_bad_requests() {
    let context = Arc::new(AppContext::new(test_config(10)).unwrap());

    let (status, body) = send(app(&context), post_event("{ not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Invalid JSON payload"}));

    let payload = json!({"product_id": "", "price": 1.0, "stock": 1}).to_string();
    let (status, body) = send(app(&context), post_event(payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "product_id is required"}));
}

/// Validates overload is reported as 503.
///
/// Assertions:
/// - With workers stopped and capacity 1, the second event gets 503
///   `Queue is full`.
#[tokio::test]
async fn test_full_queue_returns_503() {
    let context = Arc::new(AppContext::new(test_config(1)).unwrap());

    let first = json!({"product_id": "a", "price": 1.0, "stock": 1}).to_string();
    let (status, _) = send(app(&context), post_event(first)).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let second = json!({"product_id": "b", "price": 1.0, "stock": 1}).to_string();
    let (status, body) = send(app(&context), post_event(second)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, json!({"error": "Queue is full"}));

    let (status, body) = send(app(&context), get("/api/v1/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["queue_depth"], json!(1));
    assert_eq!(body["queue_capacity"], json!(1));
}

/// Validates unknown products are reported as 404.
///
/// Assertions:
/// - 404 with `Product not found`.
#[tokio::test]
async fn test_missing_product_returns_404() {
    let context = Arc::new(AppContext::new(test_config(10)).unwrap());
    let (status, body) = send(app(&context), get("/api/v1/products/nope")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Product not found"}));
}

/// Validates intake is refused once shutdown has begun.
///
/// Assertions:
/// - 503 with `Service is shutting down`.
#[tokio::test]
async fn test_event_after_shutdown_returns_503() {
    let context = Arc::new(AppContext::new(test_config(10)).unwrap());
    context.start().await.unwrap();
    context.shutdown().await.unwrap();

    let payload = json!({"product_id": "late", "price": 1.0, "stock": 1}).to_string();
    let (status, body) = send(app(&context), post_event(payload)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, json!({"error": "Service is shutting down"}));
}
