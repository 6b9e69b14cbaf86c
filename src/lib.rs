//! supplier-catalog - Resilient supplier/catalog aggregation service
//!
//! Composes a per-supplier read-model by joining locally-owned
//! supplier-product links with product details fetched from the remote
//! catalog service in one batched call.
//!
//! # Architecture
//!
//! ```text
//! HTTP ──► Aggregation Engine ──► Local readers (suppliers, links)
//!                │
//!                └──► Resilience Pipeline ──► Catalog batch client
//! ```
//!
//! Collaborators are trait objects handed to the engine at construction,
//! so every seam is swappable in tests.

#![deny(unsafe_code)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::panic)]

pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod correlation;
pub mod error;
pub mod http;
pub mod metrics;
pub mod model;
pub mod resilience;
pub mod store;

pub use aggregate::{Aggregator, AggregatorConfig};
pub use catalog::{CatalogClient, CatalogProducts};
pub use config::Config;
pub use correlation::{CorrelationId, CORRELATION_HEADER};
pub use error::{Error, Result};
pub use model::{
    ComposedSupplierView, RemoteProduct, SuppliedProduct, Supplier, SupplierProductLink,
};
pub use resilience::{
    BackoffConfig, BreakerConfig, CallError, CircuitState, PipelineConfig, PipelineError,
    ResiliencePipeline,
};
pub use store::{MemoryStore, SupplierProductReader, SupplierReader};
