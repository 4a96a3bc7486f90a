//! Configuration loading and management
//!
//! This module provides utilities for loading application configuration
//! from environment variables and files.

pub mod loader;

// Re-export commonly used items
pub use loader::{apply_env_overrides, config_path, load, load_from_file, CONFIG_PATH_ENV};
