//! Catalog service collaborator
//!
//! Product details are owned by the catalog service and only reachable over
//! the network. The `CatalogProducts` trait is the seam the aggregation
//! engine depends on; `CatalogClient` is the production implementation
//! speaking the batch endpoint through the resilience pipeline.

mod client;

pub use client::CatalogClient;

use crate::correlation::CorrelationId;
use crate::error::Result;
use crate::model::RemoteProduct;
use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

/// Batched product lookup against the catalog service
///
/// Absence of an id in the returned mapping is a legitimate answer (the
/// product may have been deleted upstream), not an error.
#[async_trait]
pub trait CatalogProducts: Send + Sync {
    /// Resolve product details for the given ids in one round trip.
    ///
    /// Implementations deduplicate `ids`; an empty input returns an empty
    /// mapping without any network call.
    async fn fetch_by_ids(
        &self,
        ids: &[Uuid],
        correlation: &CorrelationId,
    ) -> Result<HashMap<Uuid, RemoteProduct>>;
}
