//! Statistics types for the processing pipeline

use serde::{Deserialize, Serialize};

/* -------------------------------------------------------------------------- */
/* Pipeline Statistics */
/* -------------------------------------------------------------------------- */

/// Worker pool and queue counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    /// Events applied to the store
    pub processed: u64,

    /// Events dropped after exhausting retries
    pub failed: u64,

    /// Events currently waiting in the queue
    pub queue_depth: usize,

    /// Maximum number of queued events
    pub queue_capacity: usize,
}

/* -------------------------------------------------------------------------- */
/* Batch Statistics */
/* -------------------------------------------------------------------------- */

/// Batch accumulator counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    /// Events buffered and not yet flushed
    pub pending: usize,

    /// Batches handed to the handler
    pub delivered: u64,

    /// Batches the handler rejected
    pub handler_errors: u64,

    /// Batches lost because the dispatch buffer was full
    pub dropped: u64,
}
