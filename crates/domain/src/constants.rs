//! Application constants
//!
//! Defaults applied when neither the environment nor a config file sets a
//! value.

use std::time::Duration;

// HTTP server
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

// Worker pipeline
pub const DEFAULT_WORKERS: usize = 3;
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

// Batch accumulator
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_BATCH_FLUSH_INTERVAL: Duration = Duration::from_secs(1);
/// Completed batches that may wait for the dispatch loop before `flush` fails
pub const BATCH_DISPATCH_BUFFER: usize = 10;

// Retry
pub const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_INITIAL_RETRY_DELAY: Duration = Duration::from_millis(100);
pub const DEFAULT_MAX_RETRY_DELAY: Duration = Duration::from_secs(30);
pub const DEFAULT_RETRY_MULTIPLIER: f64 = 2.0;

// Circuit breaker
pub const DEFAULT_CIRCUIT_BREAKER_THRESHOLD: u32 = 5;
pub const DEFAULT_CIRCUIT_BREAKER_TIMEOUT: Duration = Duration::from_secs(60);
