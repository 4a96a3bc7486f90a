//! # Restock Domain
//!
//! Business domain types for the Restock event pipeline.
//!
//! This crate contains:
//! - Product state and product update events
//! - Domain error types and Result definitions
//! - Configuration structures and their defaults
//!
//! ## Architecture
//! - Depends only on `restock-common` foundation utilities
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
