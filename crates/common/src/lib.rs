//! Modular common utilities shared across Restock crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: error classification, duration parsing
//! - `runtime`: async infrastructure (bounded queue, circuit breaker, retry)
//! - `observability`: tracing instrumentation (pulled in by `runtime`)
//! - `serde`: serde adapters for durations

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod error;
#[cfg(feature = "foundation")]
pub mod time;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod collections;
#[cfg(feature = "runtime")]
pub mod resilience;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "runtime")]
pub use collections::{BoundedQueue, QueueError, TryPushError};
#[cfg(feature = "foundation")]
pub use error::{ClassifiedError, ErrorClassification, ErrorKind, ErrorSeverity};
#[cfg(feature = "runtime")]
pub use resilience::{
    AttemptFailure, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerConfigBuilder,
    CircuitBreakerMetrics, CircuitState, Clock, ConfigError, MockClock, ResilienceError,
    ResilienceResult, RetryConfig, RetryConfigBuilder, RetryError, RetryResult, SystemClock,
};
