//! Port interfaces for product state storage

use async_trait::async_trait;
use restock_domain::{Product, Result};

/// Keyed product store, last write wins
///
/// Updates are fallible so that a remote or flaky store can be guarded by the
/// worker pool's retry and circuit breaker.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Look up a product; `Ok(None)` when it has never been written
    async fn get(&self, id: &str) -> Result<Option<Product>>;

    /// Overwrite the product's price and stock, creating it if absent
    async fn update(&self, id: &str, price: f64, stock: i64) -> Result<()>;
}
