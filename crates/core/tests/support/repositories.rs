//! Mock repository implementations for testing
//!
//! In-memory stand-ins for the core ports with knobs for injecting failures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use restock_core::ports::{BatchHandler, ProductRepository};
use restock_domain::{Product, ProductEvent, RestockError, Result as DomainResult};

/// In-memory mock for `ProductRepository`.
///
/// Last write wins. `fail_updates` makes every update fail until cleared.
#[derive(Default)]
pub struct MockProductRepository {
    products: RwLock<HashMap<String, Product>>,
    fail_updates: Mutex<bool>,
    update_calls: AtomicU32,
}

impl MockProductRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent updates fail with a repository error.
    pub fn set_failing(&self, failing: bool) {
        *self.fail_updates.lock() = failing;
    }

    /// Number of update calls that reached the store.
    pub fn update_calls(&self) -> u32 {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.products.read().len()
    }
}

#[async_trait]
impl ProductRepository for MockProductRepository {
    async fn get(&self, id: &str) -> DomainResult<Option<Product>> {
        Ok(self.products.read().get(id).cloned())
    }

    async fn update(&self, id: &str, price: f64, stock: i64) -> DomainResult<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_updates.lock() {
            return Err(RestockError::Repository("store unavailable".into()));
        }
        self.products
            .write()
            .insert(id.to_string(), Product { id: id.to_string(), price, stock });
        Ok(())
    }
}

/// Batch sink that records delivered batches as product id lists.
#[derive(Default)]
pub struct RecordingBatchHandler {
    batches: Mutex<Vec<Vec<String>>>,
}

impl RecordingBatchHandler {
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().clone()
    }

    pub fn total_events(&self) -> usize {
        self.batches.lock().iter().map(Vec::len).sum()
    }
}

#[async_trait]
impl BatchHandler for RecordingBatchHandler {
    async fn handle(&self, batch: Vec<ProductEvent>) -> DomainResult<()> {
        self.batches.lock().push(batch.into_iter().map(|event| event.product_id).collect());
        Ok(())
    }
}
