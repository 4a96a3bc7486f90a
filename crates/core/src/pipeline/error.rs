//! Lifecycle errors for background pipeline components

use restock_domain::RestockError;
use thiserror::Error;

/// Errors from starting and stopping workers and dispatch loops
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Component is already running
    #[error("already running")]
    AlreadyRunning,

    /// Component is not running
    #[error("not running")]
    NotRunning,

    /// A background task panicked or was aborted
    #[error("task join failed: {0}")]
    TaskJoinFailed(String),
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskJoinFailed(err.to_string())
    }
}

impl From<PipelineError> for RestockError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::AlreadyRunning | PipelineError::NotRunning => {
                RestockError::InvalidInput(err.to_string())
            }
            PipelineError::TaskJoinFailed(_) => RestockError::Internal(err.to_string()),
        }
    }
}

/// Convenience type alias for pipeline lifecycle operations
pub type PipelineResult<T> = Result<T, PipelineError>;
