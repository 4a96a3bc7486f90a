//! # Restock Infrastructure
//!
//! Adapters for the ports defined in `restock-core`.
//!
//! This crate contains:
//! - The in-memory product store
//! - Configuration loading (file plus environment)

pub mod config;
pub mod store;

pub use store::InMemoryProductRepository;
