//! In-memory product store
//!
//! A keyed map behind a read/write lock. Writes overwrite the whole record
//! (last write wins); nothing survives a restart.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use restock_core::ProductRepository;
use restock_domain::{Product, Result};
use tracing::trace;

/// Thread-safe in-memory implementation of [`ProductRepository`]
#[derive(Debug, Default)]
pub struct InMemoryProductRepository {
    products: RwLock<HashMap<String, Product>>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored products
    pub fn len(&self) -> usize {
        self.products.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.read().is_empty()
    }

    /// Copy of every stored product, in no particular order
    pub fn snapshot(&self) -> Vec<Product> {
        self.products.read().values().cloned().collect()
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn get(&self, id: &str) -> Result<Option<Product>> {
        Ok(self.products.read().get(id).cloned())
    }

    async fn update(&self, id: &str, price: f64, stock: i64) -> Result<()> {
        trace!(product_id = id, price, stock, "Storing product");
        self.products
            .write()
            .insert(id.to_string(), Product { id: id.to_string(), price, stock });
        Ok(())
    }
}
