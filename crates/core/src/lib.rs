//! # Restock Core
//!
//! Business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces (traits) for the product store and batch sinks
//! - The event pipeline: bounded queue and worker pool
//! - The batch accumulator
//! - `ProductService`, the ingestion use case
//!
//! ## Architecture Principles
//! - Depends only on `restock-common` and `restock-domain`
//! - No HTTP or storage code
//! - All external dependencies via traits

pub mod batch;
pub mod pipeline;
pub mod products;

/// Port interfaces implemented outside this crate
pub mod ports {
    pub use crate::batch::ports::{BatchHandler, BatchObserver, FnBatchHandler};
    pub use crate::products::ports::ProductRepository;
}

// Re-export specific items to avoid ambiguity
pub use batch::{BatchAccumulator, BatchAccumulatorConfig, BatchHandler, BatchObserver};
pub use pipeline::{EventQueue, PipelineError, PipelineResult, WorkerPool};
pub use products::{ProductRepository, ProductService};
