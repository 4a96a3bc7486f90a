//! Domain types and models

pub mod product;
pub mod stats;

pub use product::{Product, ProductEvent};
pub use stats::{BatchStats, PipelineStats};
