//! Event processing pipeline
//!
//! Producers push into an [`EventQueue`]; a [`WorkerPool`] drains it into
//! the product store.

pub mod error;
pub mod queue;
pub mod worker_pool;

pub use error::{PipelineError, PipelineResult};
pub use queue::EventQueue;
pub use worker_pool::WorkerPool;

pub use crate::batch::BatchAccumulator;
