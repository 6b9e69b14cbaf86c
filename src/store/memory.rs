//! In-memory store backing the binary and tests
//!
//! Holds suppliers and link records under an RwLock. Good enough for the
//! read seams the engine needs; a relational implementation would live in a
//! separate crate.

use crate::error::{Error, Result};
use crate::model::{Supplier, SupplierProductLink};
use crate::store::{SupplierProductReader, SupplierReader};
use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

/// Shared in-memory supplier/link store
#[derive(Default)]
pub struct MemoryStore {
    suppliers: RwLock<Vec<Supplier>>,
    links: RwLock<Vec<SupplierProductLink>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a supplier
    pub fn insert_supplier(&self, supplier: Supplier) {
        self.suppliers.write().push(supplier);
    }

    /// Insert a link record; the supplier must already exist
    pub fn insert_link(&self, link: SupplierProductLink) -> Result<()> {
        let suppliers = self.suppliers.read();
        if !suppliers.iter().any(|s| s.id == link.supplier_id) {
            return Err(Error::NotFound(format!(
                "supplier {}",
                link.supplier_id
            )));
        }
        drop(suppliers);
        self.links.write().push(link);
        Ok(())
    }
}

#[async_trait]
impl SupplierReader for MemoryStore {
    async fn list(&self, skip: usize, take: usize) -> Result<Vec<Supplier>> {
        let mut suppliers = self.suppliers.read().clone();
        suppliers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(suppliers.into_iter().skip(skip).take(take).collect())
    }
}

#[async_trait]
impl SupplierProductReader for MemoryStore {
    async fn list_by_supplier(&self, supplier_id: Uuid) -> Result<Vec<SupplierProductLink>> {
        Ok(self
            .links
            .read()
            .iter()
            .filter(|l| l.supplier_id == supplier_id)
            .cloned()
            .collect())
    }
}
