//! Bounded queue of pending product events

use restock_common::collections::{BoundedQueue, TryPushError};
use restock_domain::{ProductEvent, RestockError, Result};

/// Fixed-capacity FIFO between ingestion and the worker pool
///
/// Producers never wait: a full or closed queue fails the enqueue at once.
/// Clones share the same buffer.
#[derive(Debug, Clone)]
pub struct EventQueue {
    inner: BoundedQueue<ProductEvent>,
}

impl EventQueue {
    pub fn new(capacity: usize) -> Self {
        Self { inner: BoundedQueue::new(capacity) }
    }

    /// Add an event without waiting
    ///
    /// # Errors
    ///
    /// [`RestockError::QueueFull`] at capacity, [`RestockError::QueueClosed`]
    /// after [`close`](Self::close).
    pub fn enqueue(&self, event: ProductEvent) -> Result<()> {
        self.inner.try_push(event).map_err(|err| match err {
            TryPushError::Full(_) => RestockError::QueueFull,
            TryPushError::Closed(_) => RestockError::QueueClosed,
        })
    }

    /// Wait for the next event; `None` once closed and drained
    pub async fn dequeue(&self) -> Option<ProductEvent> {
        self.inner.pop().await
    }

    /// Stop accepting events; buffered events remain available to workers
    ///
    /// # Errors
    ///
    /// [`RestockError::QueueClosed`] if the queue was already closed.
    pub fn close(&self) -> Result<()> {
        self.inner.close().map_err(|_| RestockError::QueueClosed)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}
