//! Local read interfaces
//!
//! The relational layer itself lives outside this crate; the aggregation
//! engine only sees these two read seams and takes them as
//! constructor-supplied collaborators, so tests swap in fakes without any
//! runtime registry.

mod memory;

pub use memory::MemoryStore;

use crate::error::Result;
use crate::model::{Supplier, SupplierProductLink};
use async_trait::async_trait;
use uuid::Uuid;

/// Read access to suppliers
#[async_trait]
pub trait SupplierReader: Send + Sync {
    /// List suppliers ordered by name
    async fn list(&self, skip: usize, take: usize) -> Result<Vec<Supplier>>;
}

/// Read access to supplier-product link records
#[async_trait]
pub trait SupplierProductReader: Send + Sync {
    /// All link records for one supplier, in stable insertion order
    async fn list_by_supplier(&self, supplier_id: Uuid) -> Result<Vec<SupplierProductLink>>;
}
