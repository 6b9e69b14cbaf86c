//! Integration tests for the catalog batch client
//!
//! A real axum server stands in for the catalog service so the tests
//! exercise reqwest, the resilience pipeline and the error mapping
//! end to end.

#![allow(clippy::unwrap_used)]

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use supplier_catalog::{
    BackoffConfig, BreakerConfig, CatalogClient, CatalogProducts, CorrelationId, Error,
    PipelineConfig, RemoteProduct,
};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Deserialize)]
struct BatchBody {
    ids: Vec<Uuid>,
}

/// What the mock catalog should answer with
enum Script {
    Products(Vec<RemoteProduct>),
    Status(StatusCode),
    Garbage,
}

struct MockCatalog {
    script: Script,
    request_count: AtomicUsize,
    seen_ids: Mutex<Vec<Vec<Uuid>>>,
    seen_correlation: Mutex<Vec<String>>,
}

impl MockCatalog {
    fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            request_count: AtomicUsize::new(0),
            seen_ids: Mutex::new(Vec::new()),
            seen_correlation: Mutex::new(Vec::new()),
        })
    }
}

async fn handle_batch(
    State(state): State<Arc<MockCatalog>>,
    headers: HeaderMap,
    Json(body): Json<BatchBody>,
) -> axum::response::Response {
    state.request_count.fetch_add(1, Ordering::SeqCst);
    state.seen_ids.lock().await.push(body.ids);
    if let Some(cid) = headers.get("x-correlation-id").and_then(|v| v.to_str().ok()) {
        state.seen_correlation.lock().await.push(cid.to_string());
    }

    use axum::response::IntoResponse;
    match &state.script {
        Script::Products(products) => Json(products.clone()).into_response(),
        Script::Status(code) => (*code, "catalog says no").into_response(),
        Script::Garbage => (StatusCode::OK, "{not json").into_response(),
    }
}

async fn start_mock(state: Arc<MockCatalog>) -> SocketAddr {
    let app = Router::new()
        .route("/v1/products/batch", post(handle_batch))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    addr
}

fn quick_pipeline() -> PipelineConfig {
    PipelineConfig {
        backoff: BackoffConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            multiplier: 2.0,
            jitter: false,
        },
        attempt_timeout: Duration::from_secs(2),
        breaker: BreakerConfig {
            minimum_throughput: 1000, // keep the breaker quiet here
            ..Default::default()
        },
    }
}

fn product(id: Uuid, name: &str) -> RemoteProduct {
    RemoteProduct {
        id,
        sku: format!("{name}-sku"),
        name: name.to_string(),
        description: Some(format!("{name} description")),
        image_main_url: None,
        is_active: true,
        category_ids: vec![],
    }
}

#[tokio::test]
async fn resolves_products_into_a_mapping() {
    let (id1, id2) = (Uuid::new_v4(), Uuid::new_v4());
    let mock = MockCatalog::new(Script::Products(vec![
        product(id1, "Widget"),
        product(id2, "Gadget"),
    ]));
    let addr = start_mock(Arc::clone(&mock)).await;

    let client = CatalogClient::new(format!("http://{addr}"), quick_pipeline()).unwrap();
    let map = client
        .fetch_by_ids(&[id1, id2], &CorrelationId::generate())
        .await
        .unwrap();

    assert_eq!(map.len(), 2);
    assert_eq!(map[&id1].name, "Widget");
    assert_eq!(map[&id2].name, "Gadget");
}

#[tokio::test]
async fn duplicate_ids_produce_one_deduplicated_request() {
    let id = Uuid::new_v4();
    let other = Uuid::new_v4();
    let mock = MockCatalog::new(Script::Products(vec![product(id, "Widget")]));
    let addr = start_mock(Arc::clone(&mock)).await;

    let client = CatalogClient::new(format!("http://{addr}"), quick_pipeline()).unwrap();
    client
        .fetch_by_ids(&[id, other, id, id, other], &CorrelationId::generate())
        .await
        .unwrap();

    assert_eq!(mock.request_count.load(Ordering::SeqCst), 1);
    let seen = mock.seen_ids.lock().await;
    assert_eq!(seen[0].len(), 2, "request must carry the deduplicated set");
}

#[tokio::test]
async fn not_found_is_a_valid_empty_result() {
    let mock = MockCatalog::new(Script::Status(StatusCode::NOT_FOUND));
    let addr = start_mock(Arc::clone(&mock)).await;

    let client = CatalogClient::new(format!("http://{addr}"), quick_pipeline()).unwrap();
    let map = client
        .fetch_by_ids(&[Uuid::new_v4()], &CorrelationId::generate())
        .await
        .unwrap();

    assert!(map.is_empty());
    assert_eq!(mock.request_count.load(Ordering::SeqCst), 1, "404 must not be retried");
}

#[tokio::test]
async fn server_errors_are_retried_then_surface_as_unavailable() {
    let mock = MockCatalog::new(Script::Status(StatusCode::SERVICE_UNAVAILABLE));
    let addr = start_mock(Arc::clone(&mock)).await;

    let client = CatalogClient::new(format!("http://{addr}"), quick_pipeline()).unwrap();
    let err = client
        .fetch_by_ids(&[Uuid::new_v4()], &CorrelationId::generate())
        .await
        .unwrap_err();

    match err {
        Error::DownstreamUnavailable { status, body } => {
            assert_eq!(status, Some(503));
            assert_eq!(body.as_deref(), Some("catalog says no"));
        }
        other => panic!("expected DownstreamUnavailable, got {other:?}"),
    }
    assert_eq!(
        mock.request_count.load(Ordering::SeqCst),
        3,
        "5xx should be retried up to max_attempts"
    );
}

#[tokio::test]
async fn client_errors_are_permanent_and_not_retried() {
    let mock = MockCatalog::new(Script::Status(StatusCode::BAD_REQUEST));
    let addr = start_mock(Arc::clone(&mock)).await;

    let client = CatalogClient::new(format!("http://{addr}"), quick_pipeline()).unwrap();
    let err = client
        .fetch_by_ids(&[Uuid::new_v4()], &CorrelationId::generate())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::DownstreamUnavailable { status: Some(400), .. }
    ));
    assert_eq!(mock.request_count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn garbage_payload_is_bad_response_not_unavailable() {
    let mock = MockCatalog::new(Script::Garbage);
    let addr = start_mock(Arc::clone(&mock)).await;

    let client = CatalogClient::new(format!("http://{addr}"), quick_pipeline()).unwrap();
    let err = client
        .fetch_by_ids(&[Uuid::new_v4()], &CorrelationId::generate())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::DownstreamBadResponse(_)));
    assert_eq!(
        mock.request_count.load(Ordering::SeqCst),
        1,
        "a parse failure is permanent, no retry"
    );
}

#[tokio::test]
async fn correlation_id_is_forwarded() {
    let mock = MockCatalog::new(Script::Products(vec![]));
    let addr = start_mock(Arc::clone(&mock)).await;

    let client = CatalogClient::new(format!("http://{addr}"), quick_pipeline()).unwrap();
    let correlation = CorrelationId::from_header("trace-me-42");
    client
        .fetch_by_ids(&[Uuid::new_v4()], &correlation)
        .await
        .unwrap();

    let seen = mock.seen_correlation.lock().await;
    assert_eq!(seen.as_slice(), ["trace-me-42"]);
}

#[tokio::test]
async fn unreachable_host_surfaces_as_unavailable_without_status() {
    let client = CatalogClient::new("http://127.0.0.1:1", quick_pipeline()).unwrap();
    let err = client
        .fetch_by_ids(&[Uuid::new_v4()], &CorrelationId::generate())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::DownstreamUnavailable { status: None, body: None }
    ));
}
