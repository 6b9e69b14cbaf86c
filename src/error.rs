//! Error types for the supplier/catalog aggregation service
//!
//! The taxonomy keeps "circuit open", "downstream unreachable" and
//! "downstream answered garbage" distinguishable so callers can pick
//! different fallback behavior for each.

use thiserror::Error;

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the aggregation service
#[derive(Error, Debug)]
pub enum Error {
    /// A referenced local entity does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Outbound call failed after the resilience pipeline exhausted retries
    #[error("downstream unavailable (status: {status:?})")]
    DownstreamUnavailable {
        /// Last observed HTTP status, if the failure was an HTTP response
        status: Option<u16>,
        /// Last observed response body, if available
        body: Option<String>,
    },

    /// Outbound call succeeded but the payload could not be interpreted
    #[error("downstream returned an unparseable response: {0}")]
    DownstreamBadResponse(String),

    /// Circuit breaker is open; the downstream was not called at all
    #[error("circuit open, downstream not called")]
    CircuitOpen,

    /// A local fan-out fetch failed mid-operation
    #[error("aggregation aborted: {0}")]
    AggregationAborted(String),

    /// The whole-operation deadline elapsed
    #[error("operation deadline exceeded")]
    DeadlineExceeded,

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Metrics registration error
    #[error("metrics error: {0}")]
    Metrics(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for any flavor of "the downstream could not serve us",
    /// including the circuit-open fast path.
    pub fn is_downstream_unavailable(&self) -> bool {
        matches!(
            self,
            Error::DownstreamUnavailable { .. } | Error::CircuitOpen
        )
    }
}
