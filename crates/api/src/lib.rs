//! # Restock API
//!
//! HTTP surface and process wiring for the Restock event pipeline.

pub mod context;
pub mod routes;
pub mod utils;

pub use context::AppContext;
pub use routes::router;
