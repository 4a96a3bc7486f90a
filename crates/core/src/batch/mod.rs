//! Size- and time-triggered batching
//!
//! [`BatchAccumulator`] is independent of the worker pipeline: it buffers
//! events and delivers them to any [`BatchHandler`].

pub mod accumulator;
pub mod ports;

pub use accumulator::{BatchAccumulator, BatchAccumulatorConfig};
pub use ports::{BatchHandler, BatchObserver, FnBatchHandler, LoggingObserver};
