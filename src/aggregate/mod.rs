//! Aggregation engine
//!
//! Joins locally-owned supplier-product links with product details fetched
//! from the catalog service in a single batched call, and emits one
//! composed view per supplier.
//!
//! Failure policy is fail-fast at whole-operation granularity: a failed
//! supplier listing, a failed link fetch, or a failed batch fetch aborts
//! everything; a partial, supplier-inconsistent result is worse than no
//! result. The one deliberate exception: a product missing from an
//! otherwise successful batch response only drops that single composed
//! entry (it may have been deleted upstream since the link was recorded).
//! Each drop is counted and logged so the loss is visible without failing
//! the operation.

use crate::catalog::CatalogProducts;
use crate::correlation::CorrelationId;
use crate::error::{Error, Result};
use crate::metrics;
use crate::model::{ComposedSupplierView, Supplier, SuppliedProduct, SupplierProductLink};
use crate::store::{SupplierProductReader, SupplierReader};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, info};
use uuid::Uuid;

/// Engine tuning knobs
#[derive(Debug, Clone, Copy)]
pub struct AggregatorConfig {
    /// Maximum suppliers fetched per composition. A known scale limit:
    /// beyond this the operation needs real pagination or streaming.
    pub supplier_page_cap: usize,

    /// Concurrent link fetches in flight at once
    pub fan_out: usize,

    /// Bound on the whole composition, independent of per-call timeouts
    pub operation_deadline: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            supplier_page_cap: 1000,
            fan_out: 8,
            operation_deadline: Duration::from_secs(30),
        }
    }
}

/// Composes the supplier catalog from local links and remote products
///
/// Collaborators are constructor-supplied trait objects, so tests swap in
/// fakes without any runtime registry.
pub struct Aggregator {
    suppliers: Arc<dyn SupplierReader>,
    links: Arc<dyn SupplierProductReader>,
    catalog: Arc<dyn CatalogProducts>,
    config: AggregatorConfig,
}

impl Aggregator {
    pub fn new(
        suppliers: Arc<dyn SupplierReader>,
        links: Arc<dyn SupplierProductReader>,
        catalog: Arc<dyn CatalogProducts>,
        config: AggregatorConfig,
    ) -> Self {
        Self {
            suppliers,
            links,
            catalog,
            config,
        }
    }

    /// Build the composed per-supplier view.
    ///
    /// Supplier ordering follows the reader's listing; within a supplier,
    /// composed entries follow link order.
    pub async fn compose_supplier_catalog(
        &self,
        correlation: &CorrelationId,
    ) -> Result<Vec<ComposedSupplierView>> {
        let started = Instant::now();
        let result = timeout(self.config.operation_deadline, self.compose_inner(correlation))
            .await
            .map_err(|_| Error::DeadlineExceeded)?;
        metrics::try_record_compose_latency(started.elapsed().as_secs_f64());
        result
    }

    async fn compose_inner(
        &self,
        correlation: &CorrelationId,
    ) -> Result<Vec<ComposedSupplierView>> {
        let suppliers = self.suppliers.list(0, self.config.supplier_page_cap).await?;
        if suppliers.is_empty() {
            return Ok(Vec::new());
        }

        let links_per_supplier = self.fetch_links(&suppliers).await?;

        // The id set is complete for this snapshot only once every fan-out
        // fetch has finished, so the single batched call happens here.
        let product_ids: Vec<Uuid> = links_per_supplier
            .iter()
            .flatten()
            .map(|link| link.product_id)
            .collect();

        let products = if product_ids.is_empty() {
            HashMap::new()
        } else {
            self.catalog.fetch_by_ids(&product_ids, correlation).await?
        };

        let mut dropped = 0u64;
        let views = suppliers
            .iter()
            .zip(&links_per_supplier)
            .map(|(supplier, links)| self.compose_one(supplier, links, &products, &mut dropped))
            .collect();

        if dropped > 0 {
            info!(
                correlation = %correlation,
                dropped,
                "composed entries dropped for products missing downstream"
            );
            metrics::try_record_dropped_entries(dropped);
        }
        Ok(views)
    }

    fn compose_one(
        &self,
        supplier: &Supplier,
        links: &[SupplierProductLink],
        products: &HashMap<Uuid, crate::model::RemoteProduct>,
        dropped: &mut u64,
    ) -> ComposedSupplierView {
        let composed = links
            .iter()
            .filter_map(|link| match products.get(&link.product_id) {
                Some(product) => Some(SuppliedProduct::merge(link, product)),
                None => {
                    debug!(
                        supplier_id = %supplier.id,
                        product_id = %link.product_id,
                        "dropping entry, product unresolved downstream"
                    );
                    *dropped += 1;
                    None
                }
            })
            .collect();

        ComposedSupplierView {
            supplier_id: supplier.id,
            name: supplier.name.clone(),
            contact: supplier.contact.clone(),
            products: composed,
        }
    }

    /// Fetch link records for every supplier with bounded concurrency.
    ///
    /// Each task writes the slot reserved for its own supplier index, so
    /// completion order never affects output order. The first failure
    /// aborts every remaining task.
    async fn fetch_links(&self, suppliers: &[Supplier]) -> Result<Vec<Vec<SupplierProductLink>>> {
        let semaphore = Arc::new(Semaphore::new(self.config.fan_out.max(1)));
        let mut tasks: JoinSet<(usize, Uuid, Result<Vec<SupplierProductLink>>)> = JoinSet::new();

        for (index, supplier) in suppliers.iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let reader = Arc::clone(&self.links);
            let supplier_id = supplier.id;
            tasks.spawn(async move {
                let permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| Error::AggregationAborted("fan-out semaphore closed".into()));
                let result = match permit {
                    Ok(_permit) => reader.list_by_supplier(supplier_id).await,
                    Err(err) => Err(err),
                };
                (index, supplier_id, result)
            });
        }

        let mut slots: Vec<Vec<SupplierProductLink>> = vec![Vec::new(); suppliers.len()];
        while let Some(joined) = tasks.join_next().await {
            let (index, supplier_id, result) = joined
                .map_err(|e| Error::AggregationAborted(format!("link fetch task failed: {e}")))?;
            match result {
                Ok(links) => slots[index] = links,
                Err(err) => {
                    tasks.abort_all();
                    return Err(Error::AggregationAborted(format!(
                        "link fetch for supplier {supplier_id} failed: {err}"
                    )));
                }
            }
        }
        Ok(slots)
    }
}
