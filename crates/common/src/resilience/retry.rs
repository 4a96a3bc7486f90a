//! Exponential-backoff retry for fallible async operations
//!
//! [`RetryConfig`] runs an operation up to `max_attempts` times. Between
//! attempts it sleeps on the tokio timer, starting at `initial_delay` and
//! multiplying by `multiplier` after every wait, capped at `max_delay`. Delays
//! are deterministic (no jitter).

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use super::circuit_breaker::{ConfigError, ConfigResult};
use crate::error::ErrorClassification;

/// Errors that can occur during retry operations
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every attempt failed; the last underlying error is not chained
    #[error("operation failed after {attempts} attempts")]
    AttemptsExhausted { attempts: u32 },

    /// The operation failed with an error classified as non-retryable
    #[error("operation failed with non-retryable error: {source}")]
    NonRetryable { source: E },
}

impl<E> RetryError<E> {
    /// Number of attempts made before giving up, when all were used.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::AttemptsExhausted { attempts } => Some(*attempts),
            Self::NonRetryable { .. } => None,
        }
    }
}

/// Result type for retry operations
pub type RetryResult<T, E> = Result<T, RetryError<E>>;

/// Decision for whether to retry after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the configured backoff delay
    Retry,
    /// Retry, but wait at least this long
    RetryAfter(Duration),
    /// Give up immediately
    Stop,
}

/// Description of one failed attempt, handed to retry observers
///
/// Displays as `attempt N failed`; the underlying error is available through
/// [`error`](Self::error).
pub struct AttemptFailure<'a, E> {
    attempt: u32,
    error: &'a E,
}

impl<'a, E> AttemptFailure<'a, E> {
    /// 1-based number of the attempt that failed
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// The error returned by the operation on this attempt
    pub fn error(&self) -> &'a E {
        self.error
    }
}

impl<E> fmt::Display for AttemptFailure<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attempt {} failed", self.attempt)
    }
}

impl<E: fmt::Debug> fmt::Debug for AttemptFailure<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttemptFailure")
            .field("attempt", &self.attempt)
            .field("error", self.error)
            .finish()
    }
}

/// Retry configuration
///
/// Immutable once built; share it behind an `Arc` across callers.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total number of attempts, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Growth factor applied after every delay
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create a configuration builder
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_attempts == 0 {
            return Err(ConfigError::invalid("max_attempts must be at least 1"));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(ConfigError::invalid("multiplier must be a finite value >= 1.0"));
        }
        if self.initial_delay > self.max_delay {
            return Err(ConfigError::invalid("initial_delay must not exceed max_delay"));
        }
        Ok(())
    }

    /// Delay that follows `current`: `min(current * multiplier, max_delay)`.
    pub fn next_delay(&self, current: Duration) -> Duration {
        Duration::try_from_secs_f64(current.as_secs_f64() * self.multiplier)
            .map_or(self.max_delay, |scaled| scaled.min(self.max_delay))
    }

    /// The waits between attempts, in order.
    ///
    /// Yields `max_attempts - 1` values; the `i`-th is
    /// `min(initial_delay * multiplier^i, max_delay)`.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        let count = self.max_attempts.saturating_sub(1) as usize;
        std::iter::successors(Some(self.initial_delay.min(self.max_delay)), |d| {
            Some(self.next_delay(*d))
        })
        .take(count)
    }

    /// Run `operation` until it succeeds or the attempts are used up.
    ///
    /// # Errors
    ///
    /// Returns [`RetryError::AttemptsExhausted`] when every attempt fails.
    pub async fn execute_with_retry<F, Fut, T, E>(&self, operation: F) -> RetryResult<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        self.run(operation, |_, _| {}, |_| RetryDecision::Retry).await
    }

    /// Like [`execute_with_retry`](Self::execute_with_retry), but reports
    /// every failed attempt (the last one included) to `on_failure` before
    /// any backoff sleep. The callback only observes; it cannot change the
    /// attempt count or timing.
    ///
    /// # Errors
    ///
    /// Returns [`RetryError::AttemptsExhausted`] when every attempt fails.
    pub async fn execute_with_retry_and_callback<F, Fut, T, E, C>(
        &self,
        operation: F,
        on_failure: C,
    ) -> RetryResult<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
        C: FnMut(u32, &AttemptFailure<'_, E>),
    {
        self.run(operation, on_failure, |_| RetryDecision::Retry).await
    }

    /// Retry only errors that classify themselves as retryable.
    ///
    /// A non-retryable error stops immediately. A `retry_after` hint from the
    /// error lengthens the next wait when it exceeds the backoff delay.
    ///
    /// # Errors
    ///
    /// Returns [`RetryError::NonRetryable`] carrying the error that stopped
    /// the loop, or [`RetryError::AttemptsExhausted`].
    pub async fn execute_classified<F, Fut, T, E>(&self, operation: F) -> RetryResult<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display + ErrorClassification,
    {
        self.run(operation, |_, _| {}, |error: &E| {
            if !error.is_retryable() {
                RetryDecision::Stop
            } else if let Some(hint) = error.retry_after() {
                RetryDecision::RetryAfter(hint)
            } else {
                RetryDecision::Retry
            }
        })
        .await
    }

    async fn run<F, Fut, T, E, C, P>(
        &self,
        mut operation: F,
        mut on_failure: C,
        policy: P,
    ) -> RetryResult<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
        C: FnMut(u32, &AttemptFailure<'_, E>),
        P: Fn(&E) -> RetryDecision,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut delay = self.initial_delay.min(self.max_delay);

        for attempt in 1..=max_attempts {
            debug!(attempt, max_attempts, "executing operation");

            let error = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            on_failure(attempt, &AttemptFailure { attempt, error: &error });

            let wait = match policy(&error) {
                RetryDecision::Stop => {
                    debug!(attempt, error = %error, "error is not retryable");
                    return Err(RetryError::NonRetryable { source: error });
                }
                RetryDecision::Retry => delay,
                RetryDecision::RetryAfter(hint) => delay.max(hint),
            };

            if attempt == max_attempts {
                warn!(attempts = attempt, error = %error, "all retry attempts exhausted");
                break;
            }

            debug!(attempt, delay_ms = wait.as_millis() as u64, error = %error, "retrying");
            tokio::time::sleep(wait).await;
            delay = self.next_delay(delay);
        }

        Err(RetryError::AttemptsExhausted { attempts: max_attempts })
    }
}

/// Builder for [`RetryConfig`]
#[derive(Debug, Default)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    pub fn new() -> Self {
        Self { config: RetryConfig::default() }
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.config.initial_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.config.max_delay = delay;
        self
    }

    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.config.multiplier = multiplier;
        self
    }

    pub fn build(self) -> ConfigResult<RetryConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use tokio::time::Instant;

    use super::*;
    use crate::error::{ClassifiedError, ErrorKind};

    fn config(attempts: u32) -> RetryConfig {
        RetryConfig::builder()
            .max_attempts(attempts)
            .initial_delay(Duration::from_millis(100))
            .max_delay(Duration::from_secs(1))
            .multiplier(2.0)
            .build()
            .unwrap()
    }

    /// Validates defaults match the documented values.
    ///
    /// Assertions:
    /// - 3 attempts, 100ms initial, 30s cap, 2.0 multiplier.
    #[test]
    fn test_default_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.initial_delay, Duration::from_millis(100));
        assert_eq!(config.max_delay, Duration::from_secs(30));
        assert!((config.multiplier - 2.0).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    /// Validates builder rejects out-of-range values.
    ///
    /// Assertions:
    /// - Zero attempts, multiplier below one, and initial > max all fail.
    #[test]
    fn test_builder_validation() {
        assert!(RetryConfig::builder().max_attempts(0).build().is_err());
        assert!(RetryConfig::builder().multiplier(0.5).build().is_err());
        assert!(RetryConfig::builder().multiplier(f64::NAN).build().is_err());
        assert!(RetryConfig::builder()
            .initial_delay(Duration::from_secs(5))
            .max_delay(Duration::from_secs(1))
            .build()
            .is_err());
    }

    /// Validates the delay sequence grows geometrically and is capped.
    ///
    /// Assertions:
    /// - Sequence is 100, 200, 400, 800, 1000, 1000 ms.
    #[test]
    fn test_delay_sequence() {
        let delays: Vec<_> = config(7).delays().map(|d| d.as_millis()).collect();
        assert_eq!(delays, vec![100, 200, 400, 800, 1000, 1000]);
    }

    /// Validates an always-failing operation runs exactly `max_attempts` times.
    ///
    /// Assertions:
    /// - Error is `AttemptsExhausted { attempts: 4 }`.
    /// - Invocation count is 4.
    /// - Total paused-clock wait is 100 + 200 + 400 ms.
    #[tokio::test(start_paused = true)]
    async fn test_exhausts_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let started = Instant::now();

        let result: RetryResult<(), &str> = config(4)
            .execute_with_retry(|| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("persistent failure")
                }
            })
            .await;

        assert!(matches!(result, Err(RetryError::AttemptsExhausted { attempts: 4 })));
        assert_eq!(result.unwrap_err().to_string(), "operation failed after 4 attempts");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(started.elapsed(), Duration::from_millis(700));
    }

    /// Validates success on attempt k stops the loop.
    ///
    /// Assertions:
    /// - Returns the value and invokes the operation exactly 3 times.
    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_third_attempt() {
        let calls = Arc::new(AtomicU32::new(0));

        let result = config(5)
            .execute_with_retry(|| {
                let calls = Arc::clone(&calls);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err("temporary failure")
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    /// Validates a single-attempt config never sleeps.
    ///
    /// Assertions:
    /// - One invocation, no elapsed time.
    #[tokio::test(start_paused = true)]
    async fn test_single_attempt_does_not_sleep() {
        let started = Instant::now();
        let result: RetryResult<(), &str> =
            config(1).execute_with_retry(|| async { Err("nope") }).await;

        assert_eq!(result.unwrap_err().attempts(), Some(1));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    /// Validates the callback sees every failure, including the last.
    ///
    /// Assertions:
    /// - Callback receives attempts 1, 2, 3 with `attempt N failed` messages.
    #[tokio::test(start_paused = true)]
    async fn test_callback_observes_each_failure() {
        let mut seen = Vec::new();

        let result: RetryResult<(), &str> = config(3)
            .execute_with_retry_and_callback(
                || async { Err("downstream unavailable") },
                |attempt, failure| {
                    assert_eq!(*failure.error(), "downstream unavailable");
                    seen.push((attempt, failure.to_string()));
                },
            )
            .await;

        assert!(result.is_err());
        assert_eq!(
            seen,
            vec![
                (1, "attempt 1 failed".to_string()),
                (2, "attempt 2 failed".to_string()),
                (3, "attempt 3 failed".to_string()),
            ]
        );
    }

    /// Validates classified retry stops on a non-retryable error.
    ///
    /// Assertions:
    /// - Returns `NonRetryable` after one invocation.
    #[tokio::test(start_paused = true)]
    async fn test_classified_stops_on_non_retryable() {
        let calls = AtomicU32::new(0);

        let result: RetryResult<(), ClassifiedError> = config(5)
            .execute_classified(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ClassifiedError::validation("bad payload")) }
            })
            .await;

        match result {
            Err(RetryError::NonRetryable { source }) => {
                assert_eq!(source.kind(), ErrorKind::Validation);
            }
            other => panic!("expected NonRetryable, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    /// Validates classified retry keeps going on transient errors.
    ///
    /// Assertions:
    /// - Network errors are retried until success.
    #[tokio::test(start_paused = true)]
    async fn test_classified_retries_transient() {
        let calls = AtomicU32::new(0);

        let result = config(3)
            .execute_classified(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(ClassifiedError::network("connection reset"))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
