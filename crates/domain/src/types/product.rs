//! Product state and the update events that change it

use serde::{Deserialize, Serialize};

use crate::errors::{RestockError, Result};

/// Current state of one product, last write wins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub price: f64,
    pub stock: i64,
}

/// Requested new price and stock for a product
///
/// Created at ingestion and consumed exactly once by a worker or a batch
/// flush.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductEvent {
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub stock: i64,
}

impl ProductEvent {
    pub fn new(product_id: impl Into<String>, price: f64, stock: i64) -> Self {
        Self { product_id: product_id.into(), price, stock }
    }

    /// Reject events that cannot be applied to the store
    pub fn validate(&self) -> Result<()> {
        if self.product_id.is_empty() {
            return Err(RestockError::InvalidInput("product_id is required".into()));
        }
        Ok(())
    }
}
