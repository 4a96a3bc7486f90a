//! Failure-threshold circuit breaker
//!
//! A breaker starts `Closed`. Every failed call increments a consecutive
//! failure counter; once the counter reaches `failure_threshold` the breaker
//! opens and rejects calls without running them. After `timeout` has elapsed
//! since the most recent failure, the next caller is admitted as a single
//! half-open trial: success closes the breaker, failure re-opens it.
//!
//! All state lives in one struct behind one mutex per breaker. The lock is
//! released while the guarded operation runs.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

//==============================================================================
// Time Abstraction for Testability
//==============================================================================

/// Trait for time operations to enable deterministic testing
///
/// Breakers use real monotonic time in production and controlled mock time in
/// tests, so timeout behaviour can be exercised without sleeping.
pub trait Clock: Send + Sync + 'static {
    /// Get current instant (monotonic time)
    fn now(&self) -> Instant;
}

/// Real system clock implementation for production use
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

impl<T: Clock> Clock for Arc<T> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Mock clock for deterministic testing
///
/// Clones share the same elapsed offset, so a test can keep one handle and
/// move time forward for a breaker that owns the other.
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    elapsed: Arc<Mutex<Duration>>,
}

impl MockClock {
    /// Create a new mock clock starting at the current instant
    pub fn new() -> Self {
        Self { start: Instant::now(), elapsed: Arc::new(Mutex::new(Duration::ZERO)) }
    }

    /// Advance the mock clock by a duration
    pub fn advance(&self, duration: Duration) {
        if let Ok(mut elapsed) = self.elapsed.lock() {
            *elapsed += duration;
        }
    }

    /// Advance the mock clock by milliseconds
    pub fn advance_millis(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }

    /// Get the current elapsed time
    pub fn elapsed(&self) -> Duration {
        self.elapsed.lock().map(|e| *e).unwrap_or(Duration::ZERO)
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }
}

//==============================================================================
// Error Types
//==============================================================================

/// Simple configuration error for validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid { message: message.into() }
    }
}

/// Configuration result type using simple config errors
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors produced by a guarded call
///
/// Generic over the operation's own error type so the underlying failure is
/// preserved as the `source`.
#[derive(Debug, Error)]
pub enum ResilienceError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// Circuit breaker is open, rejecting calls
    #[error("circuit breaker is open")]
    CircuitOpen,

    /// The underlying operation failed
    #[error("operation failed: {source}")]
    OperationFailed {
        #[source]
        source: E,
    },
}

impl<E> ResilienceError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// Returns `true` when the call was rejected without running.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen)
    }

    /// Returns the operation error, if the operation ran and failed.
    pub fn into_operation_error(self) -> Option<E> {
        match self {
            Self::CircuitOpen => None,
            Self::OperationFailed { source } => Some(source),
        }
    }
}

/// Result type for guarded calls
pub type ResilienceResult<T, E> = Result<T, ResilienceError<E>>;

//==============================================================================
// Configuration
//==============================================================================

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls flow through and failures are counted
    Closed,
    /// Calls are rejected until the timeout elapses
    Open,
    /// A single trial call decides whether to close or re-open
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::Open => write!(f, "OPEN"),
            CircuitState::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening the circuit
    pub failure_threshold: u32,
    /// Time to wait after the last failure before admitting a trial
    pub timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self { failure_threshold: 5, timeout: Duration::from_secs(60) }
    }
}

impl CircuitBreakerConfig {
    /// Create a configuration builder
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::invalid("failure_threshold must be greater than 0"));
        }
        Ok(())
    }
}

/// Builder for [`CircuitBreakerConfig`]
#[derive(Debug, Default)]
pub struct CircuitBreakerConfigBuilder {
    config: CircuitBreakerConfig,
}

impl CircuitBreakerConfigBuilder {
    pub fn new() -> Self {
        Self { config: CircuitBreakerConfig::default() }
    }

    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.config.failure_threshold = threshold;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set a custom clock and build the breaker directly (useful for testing)
    pub fn clock<C: Clock>(self, clock: C) -> CircuitBreakerBuilderWithClock<C> {
        CircuitBreakerBuilderWithClock { config: self.config, clock }
    }

    pub fn build(self) -> ConfigResult<CircuitBreakerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Builder with custom clock that builds a [`CircuitBreaker`] directly
pub struct CircuitBreakerBuilderWithClock<C: Clock> {
    config: CircuitBreakerConfig,
    clock: C,
}

impl<C: Clock> CircuitBreakerBuilderWithClock<C> {
    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.config.failure_threshold = threshold;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn build(self) -> ConfigResult<CircuitBreaker<C>> {
        CircuitBreaker::with_clock(self.config, self.clock)
    }
}

//==============================================================================
// Breaker
//==============================================================================

/// Point-in-time view of a breaker for monitoring
#[derive(Debug, Clone)]
pub struct CircuitBreakerMetrics {
    pub state: CircuitState,
    pub failure_count: u32,
    pub total_calls: u64,
    pub rejected_calls: u64,
    pub last_failure_time: Option<Instant>,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    last_failure: Option<Instant>,
    trial_in_flight: bool,
    total_calls: u64,
    rejected_calls: u64,
}

impl BreakerState {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            last_failure: None,
            trial_in_flight: false,
            total_calls: 0,
            rejected_calls: 0,
        }
    }
}

/// How a call was let through the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Normal,
    Trial,
}

/// Generic circuit breaker implementation
///
/// Cloning yields another handle to the same breaker state, so one breaker can
/// guard a downstream dependency shared by many tasks.
pub struct CircuitBreaker<C: Clock = SystemClock> {
    config: CircuitBreakerConfig,
    inner: Arc<Mutex<BreakerState>>,
    clock: Arc<C>,
}

impl<C: Clock> fmt::Debug for CircuitBreaker<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("CircuitBreaker")
            .field("config", &self.config)
            .field("state", &inner.state)
            .field("failure_count", &inner.failure_count)
            .finish()
    }
}

impl<C: Clock> Clone for CircuitBreaker<C> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            inner: Arc::clone(&self.inner),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl CircuitBreaker<SystemClock> {
    /// Create a new circuit breaker using the system clock
    pub fn new(config: CircuitBreakerConfig) -> ConfigResult<Self> {
        Self::with_clock(config, SystemClock)
    }

    /// Create a circuit breaker using the builder pattern
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }
}

impl<C: Clock> CircuitBreaker<C> {
    /// Create a new circuit breaker with a custom clock
    pub fn with_clock(config: CircuitBreakerConfig, clock: C) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            inner: Arc::new(Mutex::new(BreakerState::new())),
            clock: Arc::new(clock),
        })
    }

    /// The configuration this breaker was built with
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            warn!("circuit breaker lock poisoned, recovering state");
            poisoned.into_inner()
        })
    }

    /// Decide whether a call may run, moving Open to HalfOpen when the
    /// timeout has elapsed.
    fn admit(&self) -> Option<Admission> {
        let mut inner = self.lock();
        let admission = match inner.state {
            CircuitState::Closed => Some(Admission::Normal),
            CircuitState::Open => {
                let elapsed = inner
                    .last_failure
                    .map_or(true, |at| self.clock.now().duration_since(at) >= self.config.timeout);
                if elapsed {
                    inner.state = CircuitState::HalfOpen;
                    inner.trial_in_flight = true;
                    info!("circuit breaker half-open, admitting trial");
                    Some(Admission::Trial)
                } else {
                    None
                }
            }
            CircuitState::HalfOpen if inner.trial_in_flight => None,
            CircuitState::HalfOpen => {
                inner.trial_in_flight = true;
                Some(Admission::Trial)
            }
        };

        match admission {
            Some(_) => inner.total_calls += 1,
            None => inner.rejected_calls += 1,
        }
        admission
    }

    /// Execute an async operation with circuit breaker protection
    ///
    /// # Errors
    ///
    /// Returns [`ResilienceError::CircuitOpen`] without running `operation`
    /// while the breaker is open (or a half-open trial is already running),
    /// and [`ResilienceError::OperationFailed`] when `operation` fails.
    #[instrument(skip(self, operation), fields(state = %self.state()))]
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> ResilienceResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let Some(admission) = self.admit() else {
            debug!("circuit breaker rejecting call");
            return Err(ResilienceError::CircuitOpen);
        };

        let guard = TrialGuard::new(self, admission);
        let outcome = operation().await;
        guard.disarm();
        self.finish(admission, outcome)
    }

    /// Execute a synchronous operation with circuit breaker protection
    ///
    /// # Errors
    ///
    /// Same as [`execute`](Self::execute).
    #[instrument(skip(self, operation), fields(state = %self.state()))]
    pub fn call<F, T, E>(&self, operation: F) -> ResilienceResult<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let Some(admission) = self.admit() else {
            debug!("circuit breaker rejecting call");
            return Err(ResilienceError::CircuitOpen);
        };

        let guard = TrialGuard::new(self, admission);
        let outcome = operation();
        guard.disarm();
        self.finish(admission, outcome)
    }

    fn finish<T, E>(&self, admission: Admission, outcome: Result<T, E>) -> ResilienceResult<T, E>
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        match outcome {
            Ok(value) => {
                self.record_success(admission);
                Ok(value)
            }
            Err(error) => {
                debug!(error = %error, "circuit breaker: operation failed");
                self.record_failure(admission);
                Err(ResilienceError::OperationFailed { source: error })
            }
        }
    }

    /// Record a successful operation
    ///
    /// Resets the failure counter. Only the trial call closes a half-open
    /// breaker and frees its slot; results from calls admitted before the
    /// breaker opened leave the state untouched.
    fn record_success(&self, admission: Admission) {
        let mut inner = self.lock();
        let is_trial = admission == Admission::Trial;
        if is_trial {
            inner.trial_in_flight = false;
        }
        match inner.state {
            CircuitState::Closed => inner.failure_count = 0,
            CircuitState::HalfOpen if is_trial => {
                inner.state = CircuitState::Closed;
                inner.failure_count = 0;
                info!("circuit breaker closed after successful trial");
            }
            CircuitState::HalfOpen | CircuitState::Open => {
                debug!(state = %inner.state, "late success ignored");
            }
        }
    }

    /// Record a failed operation
    ///
    /// A closed breaker opens at the threshold; a half-open one re-opens when
    /// its trial call fails.
    fn record_failure(&self, admission: Admission) {
        let now = self.clock.now();
        let mut inner = self.lock();
        let is_trial = admission == Admission::Trial;
        if is_trial {
            inner.trial_in_flight = false;
        }
        inner.failure_count = inner.failure_count.saturating_add(1);
        inner.last_failure = Some(now);

        let trips = match inner.state {
            CircuitState::Closed => inner.failure_count >= self.config.failure_threshold,
            CircuitState::HalfOpen => is_trial,
            CircuitState::Open => false,
        };
        if trips {
            let from = inner.state;
            inner.state = CircuitState::Open;
            warn!(
                failures = inner.failure_count,
                from = %from,
                "circuit breaker opened"
            );
        }
    }

    /// Current circuit state
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Current consecutive failure count
    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    /// Snapshot of breaker state and counters
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let inner = self.lock();
        CircuitBreakerMetrics {
            state: inner.state,
            failure_count: inner.failure_count,
            total_calls: inner.total_calls,
            rejected_calls: inner.rejected_calls,
            last_failure_time: inner.last_failure,
        }
    }

    /// Force the breaker back to `Closed` with zero failures
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.last_failure = None;
        inner.trial_in_flight = false;
        info!("circuit breaker reset");
    }
}

/// Releases the half-open trial slot if the guarded call never reports back
/// (its future was dropped or it panicked).
struct TrialGuard<'a, C: Clock> {
    breaker: &'a CircuitBreaker<C>,
    armed: bool,
}

impl<'a, C: Clock> TrialGuard<'a, C> {
    fn new(breaker: &'a CircuitBreaker<C>, admission: Admission) -> Self {
        Self { breaker, armed: admission == Admission::Trial }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<C: Clock> Drop for TrialGuard<'_, C> {
    fn drop(&mut self) {
        if self.armed {
            self.breaker.lock().trial_in_flight = false;
        }
    }
}
