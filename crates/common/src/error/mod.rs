//! Error classification shared across Restock crates
//!
//! The error handling system is built on three pieces:
//!
//! 1. **`ErrorClassification` trait**: a standard interface for asking an error
//!    whether it is worth retrying and how severe it is
//! 2. **`ErrorSeverity` enum**: a unified severity scale for logging and
//!    alerting
//! 3. **`ClassifiedError`**: a ready-made error carrying an [`ErrorKind`], for
//!    call sites that have no domain error of their own
//!
//! Domain errors implement [`ErrorClassification`] directly:
//!
//! ```rust,ignore
//! impl ErrorClassification for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, Self::Busy)
//!     }
//!     fn severity(&self) -> ErrorSeverity {
//!         ErrorSeverity::Warning
//!     }
//!     fn is_critical(&self) -> bool {
//!         false
//!     }
//!     fn retry_after(&self) -> Option<Duration> {
//!         None
//!     }
//! }
//! ```

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Boxed error used as an optional cause
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Standard interface for classifying errors
pub trait ErrorClassification {
    /// Check if this error is retryable
    ///
    /// Retryable errors are transient: a full queue, an open circuit, a
    /// dropped connection.
    fn is_retryable(&self) -> bool;

    /// Get the error severity level
    fn severity(&self) -> ErrorSeverity;

    /// Check if this is a critical error requiring immediate attention
    fn is_critical(&self) -> bool;

    /// Suggested wait before retrying, if the error carries one
    fn retry_after(&self) -> Option<Duration>;
}

/// Error severity levels for monitoring and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational, typically for debugging
    Info,
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
    /// Critical, immediate action required
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Broad category of a [`ClassifiedError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Transient, worth another attempt
    Retryable,
    /// Permanent, retrying cannot help
    NonRetryable,
    /// Caller supplied bad input
    Validation,
    /// Internal fault in this process
    System,
    /// Transport-level failure
    Network,
    /// Deadline exceeded
    Timeout,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Retryable => "retryable",
            Self::NonRetryable => "non-retryable",
            Self::Validation => "validation",
            Self::System => "system",
            Self::Network => "network",
            Self::Timeout => "timeout",
        };
        f.write_str(label)
    }
}

/// An error tagged with an [`ErrorKind`] and an optional cause
#[derive(Debug, Error)]
#[error("{kind} error: {message}")]
pub struct ClassifiedError {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<BoxedError>,
}

impl ClassifiedError {
    /// Create an error of the given kind
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), source: None }
    }

    pub fn retryable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Retryable, message)
    }

    pub fn non_retryable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NonRetryable, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn system(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::System, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// Attach the underlying cause
    #[must_use]
    pub fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Retryable, network and timeout errors are worth another attempt
    pub fn should_retry(&self) -> bool {
        matches!(self.kind, ErrorKind::Retryable | ErrorKind::Network | ErrorKind::Timeout)
    }

    pub fn is_validation_error(&self) -> bool {
        self.kind == ErrorKind::Validation
    }

    pub fn is_system_error(&self) -> bool {
        self.kind == ErrorKind::System
    }
}

impl ErrorClassification for ClassifiedError {
    fn is_retryable(&self) -> bool {
        self.should_retry()
    }

    fn severity(&self) -> ErrorSeverity {
        match self.kind {
            ErrorKind::Validation => ErrorSeverity::Info,
            ErrorKind::Retryable | ErrorKind::Network | ErrorKind::Timeout => {
                ErrorSeverity::Warning
            }
            ErrorKind::NonRetryable => ErrorSeverity::Error,
            ErrorKind::System => ErrorSeverity::Critical,
        }
    }

    fn is_critical(&self) -> bool {
        self.kind == ErrorKind::System
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}
