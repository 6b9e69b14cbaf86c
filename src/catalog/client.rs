//! HTTP client for the catalog batch endpoint
//!
//! Issues exactly one `POST /v1/products/batch` per call, wrapped by the
//! resilience pipeline. 404 (and 204) are a valid empty result; anything
//! else non-success becomes `DownstreamUnavailable` once the pipeline gives
//! up, and a response that fails to parse becomes `DownstreamBadResponse`
//! so callers can tell "answered badly" from "was unreachable".

use crate::catalog::CatalogProducts;
use crate::correlation::{CorrelationId, CORRELATION_HEADER};
use crate::error::{Error, Result};
use crate::metrics;
use crate::model::RemoteProduct;
use crate::resilience::{CallError, CircuitState, PipelineConfig, PipelineError, ResiliencePipeline};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Default connection timeout in seconds
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Serialize)]
struct BatchRequest<'a> {
    ids: &'a [Uuid],
}

/// Resilient client for the catalog service
pub struct CatalogClient {
    http: reqwest::Client,
    batch_url: String,
    pipeline: ResiliencePipeline,
}

impl CatalogClient {
    /// Create a client for the given catalog base URL
    ///
    /// # Errors
    /// Returns `Error::Config` if the HTTP client cannot be created.
    pub fn new(base_url: impl Into<String>, pipeline: PipelineConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        let base = base_url.into();
        Ok(Self {
            http,
            batch_url: format!("{}/v1/products/batch", base.trim_end_matches('/')),
            pipeline: ResiliencePipeline::new(pipeline),
        })
    }

    /// Breaker state of the underlying pipeline, for health reporting
    pub fn circuit_state(&self) -> CircuitState {
        self.pipeline.circuit_state()
    }

    async fn send_batch(
        &self,
        ids: &[Uuid],
        correlation: &CorrelationId,
    ) -> std::result::Result<Vec<RemoteProduct>, PipelineError> {
        self.pipeline
            .execute(|| {
                let request = self
                    .http
                    .post(&self.batch_url)
                    .header(CORRELATION_HEADER, correlation.as_str())
                    .json(&BatchRequest { ids });
                async move {
                    let response = request
                        .send()
                        .await
                        .map_err(|e| CallError::Transport(e.to_string()))?;
                    let status = response.status();

                    // Absence of any matching product is a legitimate answer
                    if status == StatusCode::NOT_FOUND || status == StatusCode::NO_CONTENT {
                        return Ok(Vec::new());
                    }
                    if !status.is_success() {
                        let body = response.text().await.unwrap_or_default();
                        return Err(CallError::Status {
                            status: status.as_u16(),
                            body,
                        });
                    }
                    response
                        .json::<Vec<RemoteProduct>>()
                        .await
                        .map_err(|e| CallError::Decode(e.to_string()))
                }
            })
            .await
    }
}

#[async_trait]
impl CatalogProducts for CatalogClient {
    async fn fetch_by_ids(
        &self,
        ids: &[Uuid],
        correlation: &CorrelationId,
    ) -> Result<HashMap<Uuid, RemoteProduct>> {
        let deduplicated: Vec<Uuid> = ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        if deduplicated.is_empty() {
            return Ok(HashMap::new());
        }

        match self.send_batch(&deduplicated, correlation).await {
            Ok(products) => {
                debug!(
                    correlation = %correlation,
                    requested = deduplicated.len(),
                    resolved = products.len(),
                    "catalog batch resolved"
                );
                metrics::try_record_downstream(if products.is_empty() { "empty" } else { "ok" });
                Ok(products.into_iter().map(|p| (p.id, p)).collect())
            }
            Err(PipelineError::CircuitOpen) => {
                warn!(correlation = %correlation, "catalog circuit open");
                metrics::try_record_downstream("circuit_open");
                Err(Error::CircuitOpen)
            }
            Err(PipelineError::Exhausted(CallError::Decode(message))) => {
                warn!(correlation = %correlation, error = %message, "catalog response unparseable");
                metrics::try_record_downstream("bad_response");
                Err(Error::DownstreamBadResponse(message))
            }
            Err(PipelineError::Exhausted(CallError::Status { status, body })) => {
                warn!(correlation = %correlation, status, "catalog request failed");
                metrics::try_record_downstream("unavailable");
                Err(Error::DownstreamUnavailable {
                    status: Some(status),
                    body: (!body.is_empty()).then_some(body),
                })
            }
            Err(PipelineError::Exhausted(err)) => {
                warn!(correlation = %correlation, error = %err, "catalog unreachable");
                metrics::try_record_downstream("unavailable");
                Err(Error::DownstreamUnavailable {
                    status: None,
                    body: None,
                })
            }
        }
    }
}
