//! End-to-end test of the HTTP surface
//!
//! Serves the real router over a real socket, with a scripted catalog
//! service behind the real batch client, and asserts on the wire-level
//! JSON and headers a consumer would see.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use rust_decimal_macros::dec;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use supplier_catalog::http::router;
use supplier_catalog::{
    Aggregator, AggregatorConfig, BackoffConfig, BreakerConfig, CatalogClient, MemoryStore,
    PipelineConfig, RemoteProduct, Supplier, SupplierProductLink, SupplierReader,
};
use uuid::Uuid;

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    addr
}

/// Catalog stand-in that answers every batch with the given products
async fn start_catalog(products: Vec<RemoteProduct>) -> SocketAddr {
    let app = Router::new().route(
        "/v1/products/batch",
        post(move || {
            let products = products.clone();
            async move { Json(products) }
        }),
    );
    serve(app).await
}

/// Catalog stand-in that always answers 503
async fn start_broken_catalog() -> SocketAddr {
    let app = Router::new().route(
        "/v1/products/batch",
        post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
    );
    serve(app).await
}

fn quick_pipeline() -> PipelineConfig {
    PipelineConfig {
        backoff: BackoffConfig {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            multiplier: 2.0,
            jitter: false,
        },
        attempt_timeout: Duration::from_secs(2),
        breaker: BreakerConfig {
            minimum_throughput: 1000,
            ..Default::default()
        },
    }
}

fn link(supplier_id: Uuid, product_id: Uuid, price: rust_decimal::Decimal) -> SupplierProductLink {
    SupplierProductLink {
        supplier_id,
        product_id,
        supplier_sku: Some("ACME-1".into()),
        price,
        currency: "EUR".into(),
        lead_time_days: Some(3),
    }
}

async fn start_service(store: MemoryStore, catalog_addr: SocketAddr) -> SocketAddr {
    let store = Arc::new(store);
    let suppliers: Arc<dyn SupplierReader> = store.clone();
    let catalog =
        CatalogClient::new(format!("http://{catalog_addr}"), quick_pipeline()).unwrap();
    let aggregator = Aggregator::new(
        suppliers,
        store,
        Arc::new(catalog),
        AggregatorConfig::default(),
    );
    serve(router(Arc::new(aggregator))).await
}

#[tokio::test]
async fn composed_view_comes_back_as_camel_case_json() {
    let product_id = Uuid::new_v4();
    let catalog_addr = start_catalog(vec![RemoteProduct {
        id: product_id,
        sku: "CAT-7".into(),
        name: "Widget".into(),
        description: Some("A widget".into()),
        image_main_url: None,
        is_active: true,
        category_ids: vec![],
    }])
    .await;

    let store = MemoryStore::new();
    let supplier = Supplier::new("Acme").with_contact("buy@acme.example");
    let supplier_id = supplier.id;
    store.insert_supplier(supplier);
    store
        .insert_link(link(supplier_id, product_id, dec!(12.50)))
        .unwrap();

    let addr = start_service(store, catalog_addr).await;
    let response = reqwest::get(format!(
        "http://{addr}/v1/supplier-products/suppliers-with-products"
    ))
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    let suppliers = body.as_array().unwrap();
    assert_eq!(suppliers.len(), 1);
    assert_eq!(suppliers[0]["supplierId"], supplier_id.to_string());
    assert_eq!(suppliers[0]["name"], "Acme");
    let products = suppliers[0]["products"].as_array().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["productId"], product_id.to_string());
    assert_eq!(products[0]["productName"], "Widget");
    assert_eq!(products[0]["productSku"], "CAT-7");
    assert_eq!(products[0]["currency"], "EUR");
}

#[tokio::test]
async fn inbound_correlation_id_is_echoed_back() {
    let catalog_addr = start_catalog(vec![]).await;
    let addr = start_service(MemoryStore::new(), catalog_addr).await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!(
            "http://{addr}/v1/supplier-products/suppliers-with-products"
        ))
        .header("x-correlation-id", "corr-abc-123")
        .send()
        .await
        .unwrap();

    assert_eq!(
        response.headers().get("x-correlation-id").unwrap(),
        "corr-abc-123"
    );
}

#[tokio::test]
async fn missing_correlation_id_gets_generated() {
    let catalog_addr = start_catalog(vec![]).await;
    let addr = start_service(MemoryStore::new(), catalog_addr).await;

    let response = reqwest::get(format!(
        "http://{addr}/v1/supplier-products/suppliers-with-products"
    ))
    .await
    .unwrap();

    let echoed = response.headers().get("x-correlation-id").unwrap();
    assert!(!echoed.to_str().unwrap().is_empty());
}

#[tokio::test]
async fn empty_store_yields_an_empty_array() {
    let catalog_addr = start_catalog(vec![]).await;
    let addr = start_service(MemoryStore::new(), catalog_addr).await;

    let response = reqwest::get(format!(
        "http://{addr}/v1/supplier-products/suppliers-with-products"
    ))
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, serde_json::json!([]));
}

#[tokio::test]
async fn catalog_outage_surfaces_as_bad_gateway_problem() {
    let catalog_addr = start_broken_catalog().await;

    let store = MemoryStore::new();
    let supplier = Supplier::new("Acme");
    let supplier_id = supplier.id;
    store.insert_supplier(supplier);
    store
        .insert_link(link(supplier_id, Uuid::new_v4(), dec!(1.00)))
        .unwrap();

    let addr = start_service(store, catalog_addr).await;
    let response = reqwest::get(format!(
        "http://{addr}/v1/supplier-products/suppliers-with-products"
    ))
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], 502);
    assert!(body["title"].as_str().unwrap().len() > 0);
}

#[tokio::test]
async fn health_and_metrics_endpoints_respond() {
    let catalog_addr = start_catalog(vec![]).await;
    let addr = start_service(MemoryStore::new(), catalog_addr).await;

    let health = reqwest::get(format!("http://{addr}/healthz")).await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);

    let metrics = reqwest::get(format!("http://{addr}/metrics")).await.unwrap();
    assert_eq!(metrics.status(), StatusCode::OK);
}
