//! Resilience patterns for fault tolerance
//!
//! - **Circuit Breaker**: stops calling a failing dependency once consecutive
//!   failures reach a threshold, then lets one trial call through after a timeout
//! - **Retry**: re-runs a fallible operation with capped exponential backoff
//!
//! Both are generic over the operation's error type and compose by nesting:
//!
//! ```rust,ignore
//! let result = retry
//!     .execute_with_retry(|| breaker.execute(|| store.update(id, price, stock)))
//!     .await;
//! ```

pub mod circuit_breaker;
pub mod retry;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerConfigBuilder, CircuitBreakerMetrics,
    CircuitState, Clock, ConfigError, ConfigResult, MockClock, ResilienceError, ResilienceResult,
    SystemClock,
};
pub use retry::{
    AttemptFailure, RetryConfig, RetryConfigBuilder, RetryDecision, RetryError, RetryResult,
};
