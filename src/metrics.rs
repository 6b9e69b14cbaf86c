//! Prometheus metrics for the aggregation service

use crate::error::{Error, Result};
use prometheus::{
    register_counter_vec, register_histogram, register_int_counter, CounterVec, Encoder, Histogram,
    IntCounter, TextEncoder,
};
use std::sync::OnceLock;

/// Global metrics instance
static METRICS: OnceLock<Metrics> = OnceLock::new();

/// All service metrics
pub struct Metrics {
    /// Downstream batch requests (by outcome: ok, empty, unavailable,
    /// bad_response, circuit_open)
    pub downstream_requests: CounterVec,

    /// Retry attempts issued by the resilience pipeline
    pub retry_attempts: IntCounter,

    /// Circuit breaker transitions (by resulting state)
    pub breaker_transitions: CounterVec,

    /// Composed entries dropped because the product was missing from an
    /// otherwise successful batch response
    pub composed_entries_dropped: IntCounter,

    /// End-to-end composition latency
    pub compose_latency: Histogram,
}

impl Metrics {
    /// Initialize metrics (call once at startup)
    ///
    /// Returns error if metric registration fails.
    pub fn init() -> Result<&'static Metrics> {
        if let Some(metrics) = METRICS.get() {
            return Ok(metrics);
        }

        let metrics = Metrics {
            downstream_requests: register_counter_vec!(
                "supcat_downstream_requests_total",
                "Batched catalog requests by outcome",
                &["outcome"]
            )
            .map_err(|e| Error::Metrics(format!("downstream_requests: {e}")))?,

            retry_attempts: register_int_counter!(
                "supcat_retry_attempts_total",
                "Retry attempts issued by the resilience pipeline"
            )
            .map_err(|e| Error::Metrics(format!("retry_attempts: {e}")))?,

            breaker_transitions: register_counter_vec!(
                "supcat_breaker_transitions_total",
                "Circuit breaker transitions by resulting state",
                &["state"]
            )
            .map_err(|e| Error::Metrics(format!("breaker_transitions: {e}")))?,

            composed_entries_dropped: register_int_counter!(
                "supcat_composed_entries_dropped_total",
                "Supplied-product entries dropped because the product was missing downstream"
            )
            .map_err(|e| Error::Metrics(format!("composed_entries_dropped: {e}")))?,

            compose_latency: register_histogram!(
                "supcat_compose_latency_seconds",
                "Latency of one supplier-catalog composition",
                vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
            )
            .map_err(|e| Error::Metrics(format!("compose_latency: {e}")))?,
        };

        // Set the metrics (only succeeds once)
        let _ = METRICS.set(metrics);

        METRICS
            .get()
            .ok_or_else(|| Error::Metrics("failed to initialize metrics".to_string()))
    }

    /// Get the global metrics instance
    ///
    /// Returns None if metrics haven't been initialized yet.
    pub fn get() -> Option<&'static Metrics> {
        METRICS.get()
    }
}

/// Gather all metrics and encode as Prometheus text format
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_ok() {
        String::from_utf8(buffer).unwrap_or_default()
    } else {
        String::new()
    }
}

/// Record a downstream request outcome if metrics are initialized
pub fn try_record_downstream(outcome: &str) {
    if let Some(m) = Metrics::get() {
        m.downstream_requests.with_label_values(&[outcome]).inc();
    }
}

/// Record one retry attempt if metrics are initialized
pub fn try_record_retry() {
    if let Some(m) = Metrics::get() {
        m.retry_attempts.inc();
    }
}

/// Record a breaker transition if metrics are initialized
pub fn try_record_breaker_transition(state: &str) {
    if let Some(m) = Metrics::get() {
        m.breaker_transitions.with_label_values(&[state]).inc();
    }
}

/// Record dropped composed entries if metrics are initialized
pub fn try_record_dropped_entries(count: u64) {
    if count > 0 {
        if let Some(m) = Metrics::get() {
            m.composed_entries_dropped.inc_by(count);
        }
    }
}

/// Record composition latency if metrics are initialized
pub fn try_record_compose_latency(seconds: f64) {
    if let Some(m) = Metrics::get() {
        m.compose_latency.observe(seconds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_init() {
        // Metrics::init() may fail if already initialized from another test
        // so we just check get() works after any successful init
        let _ = Metrics::init();
        if let Some(metrics) = Metrics::get() {
            metrics.downstream_requests.with_label_values(&["ok"]).inc();
            metrics.composed_entries_dropped.inc_by(2);
        }
    }
}
