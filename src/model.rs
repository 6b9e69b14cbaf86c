//! Domain and view types
//!
//! Local facts (`Supplier`, `SupplierProductLink`) are owned by this
//! service. `RemoteProduct` is owned by the catalog service, only ever
//! lives for the duration of one composition, and is never persisted or
//! cached here. `ComposedSupplierView` is the ephemeral read-model joining
//! the two; it only describes products that were verified downstream, so
//! unresolved entries are omitted rather than emitted with null fields.
//!
//! Field names serialize camelCase to match the catalog wire contract.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A supplier we buy from (locally owned)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: Uuid,
    pub name: String,
    /// Free-form contact payload (JSON blob upstream, opaque here)
    pub contact: Option<String>,
    pub tax_id: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Supplier {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            contact: None,
            tax_id: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    pub fn with_contact(mut self, contact: impl Into<String>) -> Self {
        self.contact = Some(contact.into());
        self
    }
}

/// Who sells what, at which price (locally owned, composite key)
///
/// `product_id` is a foreign identifier owned by the catalog service and is
/// deliberately not validated locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierProductLink {
    pub supplier_id: Uuid,
    pub product_id: Uuid,
    pub supplier_sku: Option<String>,
    pub price: Decimal,
    pub currency: String,
    pub lead_time_days: Option<u32>,
}

/// Product details fetched from the catalog service (never persisted)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteProduct {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub image_main_url: Option<String>,
    pub is_active: bool,
    #[serde(default)]
    pub category_ids: Vec<Uuid>,
}

/// One supplied-product entry in the composed view: link fields merged
/// with the verified product fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuppliedProduct {
    pub product_id: Uuid,
    pub supplier_sku: Option<String>,
    pub price: Decimal,
    pub currency: String,
    pub lead_time_days: Option<u32>,
    // From the catalog service
    pub product_name: String,
    pub product_sku: String,
    pub description: Option<String>,
    pub image_main_url: Option<String>,
}

impl SuppliedProduct {
    /// Merge a link record with its verified product details.
    pub fn merge(link: &SupplierProductLink, product: &RemoteProduct) -> Self {
        Self {
            product_id: link.product_id,
            supplier_sku: link.supplier_sku.clone(),
            price: link.price,
            currency: link.currency.clone(),
            lead_time_days: link.lead_time_days,
            product_name: product.name.clone(),
            product_sku: product.sku.clone(),
            description: product.description.clone(),
            image_main_url: product.image_main_url.clone(),
        }
    }
}

/// Per-supplier composed read-model, built fresh on every request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposedSupplierView {
    pub supplier_id: Uuid,
    pub name: String,
    pub contact: Option<String>,
    pub products: Vec<SuppliedProduct>,
}
