//! supplier-catalog service binary
//!
//! ## Usage
//!
//! ```bash
//! # Run with default settings
//! cargo run
//!
//! # Point at a catalog instance with debug logs
//! SUPCAT_CATALOG_URL=http://localhost:8081 SUPCAT_LOG_LEVEL=debug cargo run
//! ```
//!
//! ## Environment Variables
//!
//! - `SUPCAT_HTTP_ADDR`: inbound HTTP address (default: "0.0.0.0:8080")
//! - `SUPCAT_CATALOG_URL`: catalog service base URL
//! - `SUPCAT_SUPPLIER_PAGE_CAP`, `SUPCAT_FAN_OUT`, `SUPCAT_OPERATION_DEADLINE_MS`
//! - `SUPCAT_MAX_ATTEMPTS`, `SUPCAT_RETRY_BASE_MS`, `SUPCAT_RETRY_MAX_MS`,
//!   `SUPCAT_ATTEMPT_TIMEOUT_MS`
//! - `SUPCAT_BREAKER_FAILURE_RATIO`, `SUPCAT_BREAKER_MIN_THROUGHPUT`,
//!   `SUPCAT_BREAKER_SAMPLING_WINDOW_MS`, `SUPCAT_BREAK_DURATION_MS`
//! - `SUPCAT_LOG_LEVEL`, `SUPCAT_LOG_FORMAT` (json or pretty)

use std::sync::Arc;
use supplier_catalog::config::{Config, LogFormat};
use supplier_catalog::metrics::Metrics;
use supplier_catalog::{
    Aggregator, AggregatorConfig, CatalogClient, MemoryStore, SupplierProductReader,
    SupplierReader,
};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration first so the log level/format can honor it
    let config = Config::from_env()?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.log_level.clone().into());
    match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }

    Metrics::init()?;

    info!(
        http_addr = %config.http_addr,
        catalog_url = %config.catalog_url,
        fan_out = config.fan_out,
        "starting supplier-catalog service"
    );

    let store = Arc::new(MemoryStore::new());
    let suppliers: Arc<dyn SupplierReader> = store.clone();
    let links: Arc<dyn SupplierProductReader> = store;
    let catalog = Arc::new(CatalogClient::new(config.catalog_url.clone(), config.pipeline)?);
    let aggregator = Arc::new(Aggregator::new(
        suppliers,
        links,
        catalog,
        AggregatorConfig {
            supplier_page_cap: config.supplier_page_cap,
            fan_out: config.fan_out,
            operation_deadline: config.operation_deadline,
        },
    ));

    let app = supplier_catalog::http::router(aggregator);
    let listener = tokio::net::TcpListener::bind(config.http_addr).await?;
    info!(addr = %config.http_addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("supplier-catalog shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = ?e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = ?e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
