//! Resilience pipeline for outbound calls
//!
//! Composable fault-tolerance around any outbound operation:
//! - per-attempt timeout (innermost, bounds a single try)
//! - retry with jittered exponential backoff (wraps the timeout)
//! - circuit breaker (outermost; sees the whole retried operation as one
//!   sample and short-circuits before any attempt when open)
//!
//! Transient failures (network errors, HTTP 5xx, HTTP 408, attempt
//! timeouts) are retried; everything else is permanent and returned
//! immediately.
//!
//! # Example
//!
//! ```ignore
//! let pipeline = ResiliencePipeline::new(PipelineConfig::default());
//! let body = pipeline
//!     .execute(|| async { fetch_page().await })
//!     .await?;
//! ```

mod breaker;
mod retry;

pub use breaker::{BreakerConfig, CircuitBreaker, CircuitState};
pub use retry::BackoffConfig;

use crate::metrics;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

/// Failure of a single outbound attempt, as reported by the wrapped call
#[derive(Error, Debug, Clone)]
pub enum CallError {
    /// Network-level failure (connect refused, reset, DNS, ...)
    #[error("connection error: {0}")]
    Transport(String),

    /// Non-success HTTP response
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The per-attempt timeout elapsed
    #[error("attempt timed out")]
    AttemptTimeout,

    /// The response arrived but could not be decoded
    #[error("decode error: {0}")]
    Decode(String),
}

impl CallError {
    /// Transient failures are worth retrying; permanent ones never are.
    pub fn is_transient(&self) -> bool {
        match self {
            CallError::Transport(_) | CallError::AttemptTimeout => true,
            CallError::Status { status, .. } => *status >= 500 || *status == 408,
            CallError::Decode(_) => false,
        }
    }
}

/// Pipeline outcome distinguishing "we never called" from "we gave up"
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Circuit is open; the operation was not attempted at all
    #[error("circuit open")]
    CircuitOpen,

    /// Retries exhausted or a permanent failure occurred; carries the
    /// last observed attempt error
    #[error("operation failed: {0}")]
    Exhausted(CallError),
}

/// Full pipeline configuration
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub backoff: BackoffConfig,
    /// Independent bound for each individual attempt
    pub attempt_timeout: Duration,
    pub breaker: BreakerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            backoff: BackoffConfig::default(),
            attempt_timeout: Duration::from_secs(3),
            breaker: BreakerConfig::default(),
        }
    }
}

/// Wraps outbound operations with timeout, retry and circuit breaking
pub struct ResiliencePipeline {
    config: PipelineConfig,
    breaker: Arc<CircuitBreaker>,
}

impl ResiliencePipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            breaker: Arc::new(CircuitBreaker::new(config.breaker)),
            config,
        }
    }

    /// Current breaker state, for health reporting and tests
    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    /// Execute one logical operation through the full pipeline.
    ///
    /// `op` is invoked once per attempt and must produce a fresh future
    /// each time. The breaker records the aggregate outcome of the whole
    /// retried operation as a single sample.
    pub async fn execute<T, F, Fut>(&self, mut op: F) -> Result<T, PipelineError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CallError>>,
    {
        if !self.breaker.try_acquire() {
            debug!("circuit open, short-circuiting outbound call");
            return Err(PipelineError::CircuitOpen);
        }

        let result = self.run_attempts(&mut op).await;
        self.breaker.record(result.is_ok());
        result.map_err(PipelineError::Exhausted)
    }

    async fn run_attempts<T, F, Fut>(&self, op: &mut F) -> Result<T, CallError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CallError>>,
    {
        let max_attempts = self.config.backoff.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let outcome = match timeout(self.config.attempt_timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(CallError::AttemptTimeout),
            };
            match outcome {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !err.is_transient() || attempt >= max_attempts {
                        return Err(err);
                    }
                    let delay = self.config.backoff.delay_for(attempt);
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, retrying"
                    );
                    metrics::try_record_retry();
                    sleep(delay).await;
                }
            }
        }
    }
}
