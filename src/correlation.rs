//! Correlation-id contract
//!
//! The gateway in front of this service stamps every request with an
//! `x-correlation-id` header. We forward it on every outbound call so one
//! id traces a request across service boundaries, and generate one when
//! the header is absent.

/// Header name carrying the correlation id
pub const CORRELATION_HEADER: &str = "x-correlation-id";

/// Correlation identifier propagated from the inbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generate a fresh id (ULID, lexically sortable)
    pub fn generate() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// Adopt an id received from upstream
    pub fn from_header(value: &str) -> Self {
        Self(value.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
