//! Error types used throughout the application

use std::time::Duration;

use restock_common::{ErrorClassification, ErrorSeverity};
use thiserror::Error;

/// Main error type for Restock
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RestockError {
    #[error("queue is full")]
    QueueFull,

    #[error("queue is closed")]
    QueueClosed,

    #[error("circuit breaker is open")]
    CircuitOpen,

    #[error("batch processor is full")]
    BatchProcessorFull,

    #[error("batch processor is stopped")]
    BatchProcessorStopped,

    #[error("operation failed after {attempts} attempts")]
    RetryExhausted { attempts: u32 },

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RestockError {
    /// Errors that signal overload or shutdown rather than a bad request
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::QueueFull
                | Self::QueueClosed
                | Self::CircuitOpen
                | Self::RetryExhausted { .. }
                | Self::BatchProcessorFull
                | Self::BatchProcessorStopped
        )
    }
}

impl ErrorClassification for RestockError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::QueueFull | Self::CircuitOpen | Self::Repository(_))
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::InvalidInput(_) | Self::NotFound(_) => ErrorSeverity::Info,
            Self::QueueFull | Self::CircuitOpen | Self::BatchProcessorFull => {
                ErrorSeverity::Warning
            }
            Self::QueueClosed
            | Self::BatchProcessorStopped
            | Self::RetryExhausted { .. }
            | Self::Repository(_)
            | Self::Config(_) => ErrorSeverity::Error,
            Self::Internal(_) => ErrorSeverity::Critical,
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self, Self::Internal(_))
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Result type alias for Restock operations
pub type Result<T> = std::result::Result<T, RestockError>;
