//! Port interfaces for batch delivery

use std::future::Future;

use async_trait::async_trait;
use restock_domain::{ProductEvent, RestockError, Result};
use tracing::warn;

/// Receives flushed batches from a [`BatchAccumulator`](super::BatchAccumulator)
#[async_trait]
pub trait BatchHandler: Send + Sync {
    /// Process one batch, events in insertion order
    async fn handle(&self, batch: Vec<ProductEvent>) -> Result<()>;
}

/// Adapts an async closure into a [`BatchHandler`]
pub struct FnBatchHandler<F> {
    handler: F,
}

impl<F> FnBatchHandler<F> {
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl<F, Fut> BatchHandler for FnBatchHandler<F>
where
    F: Fn(Vec<ProductEvent>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send,
{
    async fn handle(&self, batch: Vec<ProductEvent>) -> Result<()> {
        (self.handler)(batch).await
    }
}

/// Hook for failures that happen on the dispatch loop, away from any caller
pub trait BatchObserver: Send + Sync {
    /// The handler rejected a batch
    fn on_handler_error(&self, batch_len: usize, error: &RestockError);

    /// A timer-driven flush could not hand its batch to the dispatch loop
    fn on_flush_error(&self, error: &RestockError) {
        let _ = error;
    }
}

/// Default observer: log and move on
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl BatchObserver for LoggingObserver {
    fn on_handler_error(&self, batch_len: usize, error: &RestockError) {
        warn!(batch_len, error = %error, "batch handler failed, batch discarded");
    }

    fn on_flush_error(&self, error: &RestockError) {
        warn!(error = %error, "periodic batch flush failed");
    }
}
