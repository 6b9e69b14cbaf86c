//! Inbound HTTP surface
//!
//! One composed-view route plus health and metrics. Every request gets a
//! correlation id (taken from `x-correlation-id` or generated), which is
//! echoed on the response and forwarded on outbound catalog calls.

use crate::aggregate::Aggregator;
use crate::correlation::{CorrelationId, CORRELATION_HEADER};
use crate::error::Error;
use crate::metrics;
use crate::model::ComposedSupplierView;
use axum::extract::{Extension, Request, State};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
}

/// Build the service router
pub fn router(aggregator: Arc<Aggregator>) -> Router {
    Router::new()
        .route(
            "/v1/supplier-products/suppliers-with-products",
            get(suppliers_with_products),
        )
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics_text))
        .layer(middleware::from_fn(correlation))
        .with_state(AppState { aggregator })
}

/// Adopt the inbound correlation id or generate one, echo it back
async fn correlation(mut request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(CORRELATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(CorrelationId::from_header)
        .unwrap_or_else(CorrelationId::generate);
    request.extensions_mut().insert(id.clone());

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(id.as_str()) {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }
    response
}

async fn suppliers_with_products(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
) -> Result<Json<Vec<ComposedSupplierView>>, Problem> {
    let views = state
        .aggregator
        .compose_supplier_catalog(&correlation)
        .await?;
    Ok(Json(views))
}

async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn metrics_text() -> String {
    metrics::gather()
}

/// Problem-details error body
#[derive(Debug, Serialize)]
pub struct Problem {
    pub title: String,
    pub status: u16,
    pub detail: String,
}

impl Problem {
    /// HTTP status for each error condition. `CircuitOpen` maps to 503
    /// (back off and retry later), plain downstream failures to 502.
    pub fn status_for(err: &Error) -> StatusCode {
        match err {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::CircuitOpen => StatusCode::SERVICE_UNAVAILABLE,
            Error::DownstreamUnavailable { .. } | Error::DownstreamBadResponse(_) => {
                StatusCode::BAD_GATEWAY
            }
            Error::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for Problem {
    fn from(err: Error) -> Self {
        let status = Self::status_for(&err);
        if status.is_server_error() {
            error!(error = %err, "request failed");
        }
        Self {
            title: match &err {
                Error::NotFound(_) => "Not Found",
                Error::CircuitOpen => "Circuit Open",
                Error::DownstreamUnavailable { .. } => "Downstream Unavailable",
                Error::DownstreamBadResponse(_) => "Downstream Bad Response",
                Error::DeadlineExceeded => "Deadline Exceeded",
                _ => "Internal Error",
            }
            .to_string(),
            status: status.as_u16(),
            detail: err.to_string(),
        }
    }
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}
