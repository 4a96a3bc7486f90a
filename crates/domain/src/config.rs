//! Configuration management

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BATCH_FLUSH_INTERVAL, DEFAULT_BATCH_SIZE, DEFAULT_CIRCUIT_BREAKER_THRESHOLD,
    DEFAULT_CIRCUIT_BREAKER_TIMEOUT, DEFAULT_INITIAL_RETRY_DELAY, DEFAULT_MAX_RETRY_ATTEMPTS,
    DEFAULT_MAX_RETRY_DELAY, DEFAULT_PORT, DEFAULT_QUEUE_CAPACITY, DEFAULT_RETRY_MULTIPLIER,
    DEFAULT_SHUTDOWN_GRACE, DEFAULT_WORKERS,
};
use crate::errors::{RestockError, Result};

/// Application configuration
///
/// Every section falls back to its defaults, so a config file only needs the
/// keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub pipeline: PipelineConfig,
    pub batch: BatchConfig,
    pub retry: RetrySettings,
    pub circuit_breaker: CircuitBreakerSettings,
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// How long shutdown waits for workers to drain the queue
    #[serde(with = "restock_common::time::duration::serde_str")]
    pub shutdown_grace: Duration,
}

/// Queue and worker pool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub workers: usize,
    pub queue_capacity: usize,
}

/// Batch accumulator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub batch_size: usize,
    #[serde(with = "restock_common::time::duration::serde_str")]
    pub flush_interval: Duration,
}

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    #[serde(with = "restock_common::time::duration::serde_str")]
    pub initial_delay: Duration,
    #[serde(with = "restock_common::time::duration::serde_str")]
    pub max_delay: Duration,
    pub multiplier: f64,
}

/// Circuit breaker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    pub failure_threshold: u32,
    #[serde(with = "restock_common::time::duration::serde_str")]
    pub timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT, shutdown_grace: DEFAULT_SHUTDOWN_GRACE }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { workers: DEFAULT_WORKERS, queue_capacity: DEFAULT_QUEUE_CAPACITY }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { batch_size: DEFAULT_BATCH_SIZE, flush_interval: DEFAULT_BATCH_FLUSH_INTERVAL }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RETRY_ATTEMPTS,
            initial_delay: DEFAULT_INITIAL_RETRY_DELAY,
            max_delay: DEFAULT_MAX_RETRY_DELAY,
            multiplier: DEFAULT_RETRY_MULTIPLIER,
        }
    }
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_CIRCUIT_BREAKER_THRESHOLD,
            timeout: DEFAULT_CIRCUIT_BREAKER_TIMEOUT,
        }
    }
}

impl Config {
    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.workers == 0 {
            return Err(RestockError::Config("workers must be at least 1".into()));
        }
        if self.batch.batch_size == 0 {
            return Err(RestockError::Config("batch_size must be at least 1".into()));
        }
        if self.batch.flush_interval.is_zero() {
            return Err(RestockError::Config("batch flush_interval must be non-zero".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(RestockError::Config("retry max_attempts must be at least 1".into()));
        }
        if !self.retry.multiplier.is_finite() || self.retry.multiplier < 1.0 {
            return Err(RestockError::Config("retry multiplier must be >= 1.0".into()));
        }
        if self.retry.initial_delay > self.retry.max_delay {
            return Err(RestockError::Config(
                "retry initial_delay must not exceed max_delay".into(),
            ));
        }
        if self.circuit_breaker.failure_threshold == 0 {
            return Err(RestockError::Config(
                "circuit_breaker failure_threshold must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
