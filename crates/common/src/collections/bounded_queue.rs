#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

//! Bounded FIFO queue with a non-blocking producer side and an async
//! consumer side.
//!
//! **Complexity**
//! - `try_push`, `try_pop` and a ready `pop` complete in `O(1)`.
//!
//! **Capacity**
//! - A capacity of zero is accepted; every `try_push` on such a queue fails
//!   with [`TryPushError::Full`].
//! - Only the first [`PREALLOCATE_LIMIT`] slots are reserved up front; the
//!   buffer grows on demand beyond that, so a very large capacity costs
//!   nothing until it is used.
//!
//! **Thread Safety**
//! - All operations take `&self` and may be invoked concurrently by multiple
//!   producers and consumers, from async tasks or plain threads.
//! - Buffer state lives behind a single `std::sync::Mutex`; consumers park on
//!   a `tokio::sync::Notify` and never hold the lock across an await point.
//! - Internal mutex poisoning is recovered transparently.
//!
//! **Semantics of `close()`**
//! - Closing the queue rejects every later push and wakes all parked
//!   consumers.
//! - Consumers keep draining buffered items and observe `None` once the queue
//!   is both closed and empty.
//! - Closing an already closed queue returns [`QueueError::AlreadyClosed`].

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Notify;

/// Upper bound on the slots reserved when a queue is created.
pub const PREALLOCATE_LIMIT: usize = 1024;

/// Error type for queue lifecycle operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// `close` was called on a queue that is already closed.
    AlreadyClosed,
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::AlreadyClosed => f.write_str("bounded queue is already closed"),
        }
    }
}

impl std::error::Error for QueueError {}

/// Error returned by [`BoundedQueue::try_push`] when the value cannot be queued
/// immediately.
#[derive(Debug, PartialEq, Eq)]
pub enum TryPushError<T> {
    /// The queue was at capacity; the item is returned to the caller.
    Full(T),
    /// The queue has been closed; the item is returned to the caller.
    Closed(T),
}

impl<T> TryPushError<T> {
    /// Returns the item that failed to be enqueued.
    #[must_use]
    pub fn into_inner(self) -> T {
        match self {
            TryPushError::Full(item) | TryPushError::Closed(item) => item,
        }
    }

    /// Returns `true` when the push failed because the queue was full.
    #[must_use]
    pub fn is_full(&self) -> bool {
        matches!(self, TryPushError::Full(_))
    }
}

impl<T> fmt::Display for TryPushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryPushError::Full(_) => f.write_str("bounded queue is full"),
            TryPushError::Closed(_) => f.write_str("bounded queue is closed"),
        }
    }
}

impl<T: fmt::Debug> std::error::Error for TryPushError<T> {}

struct Inner<T> {
    items: VecDeque<T>,
    capacity: usize,
    closed: bool,
}

struct State<T> {
    inner: Mutex<Inner<T>>,
    not_empty: Notify,
}

impl<T> State<T> {
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// A bounded FIFO queue shared between producers and async consumers.
///
/// Cloning the queue produces another handle to the same buffer.
pub struct BoundedQueue<T> {
    state: Arc<State<T>>,
}

impl<T> Clone for BoundedQueue<T> {
    fn clone(&self) -> Self {
        Self { state: Arc::clone(&self.state) }
    }
}

impl<T> fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.state.lock();
        f.debug_struct("BoundedQueue")
            .field("len", &inner.items.len())
            .field("capacity", &inner.capacity)
            .field("closed", &inner.closed)
            .finish()
    }
}

impl<T> BoundedQueue<T> {
    /// Creates a new queue that holds at most `capacity` items.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Arc::new(State {
                inner: Mutex::new(Inner {
                    items: VecDeque::with_capacity(capacity.min(PREALLOCATE_LIMIT)),
                    capacity,
                    closed: false,
                }),
                not_empty: Notify::new(),
            }),
        }
    }

    /// Attempts to enqueue `item` without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`TryPushError::Full`] when the queue is at capacity and
    /// [`TryPushError::Closed`] once [`close`](Self::close) has been called.
    /// The rejected item is handed back in both cases.
    pub fn try_push(&self, item: T) -> Result<(), TryPushError<T>> {
        {
            let mut inner = self.state.lock();
            if inner.closed {
                return Err(TryPushError::Closed(item));
            }
            if inner.items.len() >= inner.capacity {
                return Err(TryPushError::Full(item));
            }
            inner.items.push_back(item);
        }
        self.state.not_empty.notify_one();
        Ok(())
    }

    /// Removes the oldest item, waiting until one is available.
    ///
    /// Resolves to `None` once the queue is closed and fully drained. The
    /// future is cancel-safe: dropping it before completion never loses an
    /// item.
    pub async fn pop(&self) -> Option<T> {
        loop {
            let notified = self.state.not_empty.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut inner = self.state.lock();
                if let Some(item) = inner.items.pop_front() {
                    let more = !inner.items.is_empty();
                    drop(inner);
                    // Pass the wakeup on so a second parked consumer sees the
                    // remaining items.
                    if more {
                        self.state.not_empty.notify_one();
                    }
                    return Some(item);
                }
                if inner.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Removes the oldest item if one is immediately available.
    pub fn try_pop(&self) -> Option<T> {
        self.state.lock().items.pop_front()
    }

    /// Closes the queue and wakes every parked consumer.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::AlreadyClosed`] if the queue was closed before.
    pub fn close(&self) -> Result<(), QueueError> {
        {
            let mut inner = self.state.lock();
            if inner.closed {
                return Err(QueueError::AlreadyClosed);
            }
            inner.closed = true;
        }
        self.state.not_empty.notify_waiters();
        Ok(())
    }

    /// Number of buffered items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Returns `true` when no items are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    /// Returns `true` when the queue holds `capacity` items.
    #[must_use]
    pub fn is_full(&self) -> bool {
        let inner = self.state.lock();
        inner.items.len() >= inner.capacity
    }

    /// Maximum number of buffered items.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.state.lock().capacity
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}
