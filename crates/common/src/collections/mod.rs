//! Specialized data structures
//!
//! - **[`bounded_queue`]**: bounded FIFO with a non-blocking producer side and
//!   an async consumer side
//!
//! ## Usage
//!
//! ```rust,ignore
//! use restock_common::collections::BoundedQueue;
//!
//! # async fn example() {
//! let queue = BoundedQueue::new(100);
//! queue.try_push(42).unwrap();
//! assert_eq!(queue.pop().await, Some(42));
//! # }
//! ```

pub mod bounded_queue;

pub use bounded_queue::{BoundedQueue, QueueError, TryPushError};
