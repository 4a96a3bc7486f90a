//! Fixed-size worker pool draining the event queue into the product store.
//!
//! Each worker loops: stop if cancelled, otherwise wait for the next event
//! and apply it with `retry(circuit_breaker(store.update))`. A worker exits
//! for good once the queue is closed and empty. Cancellation is observed only
//! between events; an event whose retries are in progress is always finished.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use restock_common::resilience::{CircuitBreaker, CircuitBreakerConfig, RetryConfig};
//! use restock_core::pipeline::{EventQueue, WorkerPool};
//! # use restock_core::ProductRepository;
//!
//! # async fn example(repository: Arc<dyn ProductRepository>) -> Result<(), Box<dyn std::error::Error>> {
//! let queue = EventQueue::new(1000);
//! let pool = WorkerPool::new(
//!     3,
//!     queue.clone(),
//!     repository,
//!     CircuitBreaker::new(CircuitBreakerConfig::default())?,
//!     Arc::new(RetryConfig::default()),
//! );
//!
//! pool.start().await?;
//! // ... producers enqueue ...
//! pool.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use restock_common::resilience::{CircuitBreaker, RetryConfig};
use restock_domain::{PipelineStats, ProductEvent};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::error::{PipelineError, PipelineResult};
use super::queue::EventQueue;
use crate::products::ports::ProductRepository;

#[derive(Debug, Default)]
struct Counters {
    processed: AtomicU64,
    failed: AtomicU64,
}

/// Everything a worker task needs, cloned once per worker
#[derive(Clone)]
struct WorkerContext {
    queue: EventQueue,
    repository: Arc<dyn ProductRepository>,
    breaker: CircuitBreaker,
    retry: Arc<RetryConfig>,
    counters: Arc<Counters>,
    live: Arc<AtomicUsize>,
}

/// Counts a worker as alive from spawn until its task is dropped
struct LiveWorker(Arc<AtomicUsize>);

impl LiveWorker {
    fn new(live: &Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(live))
    }
}

impl Drop for LiveWorker {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct PoolState {
    cancellation_token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

/// N concurrent workers sharing one queue, one store and one breaker
pub struct WorkerPool {
    workers: usize,
    context: WorkerContext,
    state: Mutex<PoolState>,
}

impl WorkerPool {
    /// Create a stopped pool; call [`start`](Self::start) to spawn workers
    pub fn new(
        workers: usize,
        queue: EventQueue,
        repository: Arc<dyn ProductRepository>,
        breaker: CircuitBreaker,
        retry: Arc<RetryConfig>,
    ) -> Self {
        Self {
            workers,
            context: WorkerContext {
                queue,
                repository,
                breaker,
                retry,
                counters: Arc::new(Counters::default()),
                live: Arc::new(AtomicUsize::new(0)),
            },
            state: Mutex::new(PoolState {
                cancellation_token: CancellationToken::new(),
                handles: Vec::new(),
            }),
        }
    }

    /// Spawn the workers
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::AlreadyRunning`] if workers are still alive.
    #[instrument(skip(self), fields(workers = self.workers))]
    pub async fn start(&self) -> PipelineResult<()> {
        let mut state = self.state.lock().await;
        if state.handles.iter().any(|h| !h.is_finished()) {
            return Err(PipelineError::AlreadyRunning);
        }

        // Fresh token so a stopped pool can be started again
        let token = CancellationToken::new();
        let handles = (0..self.workers)
            .map(|id| {
                let context = self.context.clone();
                let cancel = token.clone();
                let live = LiveWorker::new(&self.context.live);
                tokio::spawn(async move {
                    let _live = live;
                    worker_loop(id, context, cancel).await;
                })
            })
            .collect();
        state.cancellation_token = token;
        state.handles = handles;

        info!("Worker pool started");
        Ok(())
    }

    /// Cancel every worker and wait for all of them to exit
    ///
    /// Workers finish the event they are processing first.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NotRunning`] if the pool was never started or
    /// already stopped, and [`PipelineError::TaskJoinFailed`] if a worker
    /// panicked.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> PipelineResult<()> {
        let mut state = self.state.lock().await;
        if state.handles.is_empty() {
            return Err(PipelineError::NotRunning);
        }

        info!("Stopping worker pool");
        state.cancellation_token.cancel();
        let handles = std::mem::take(&mut state.handles);
        collect_joins(join_all(handles).await)?;

        info!("Worker pool stopped");
        Ok(())
    }

    /// Let workers run until the (closed) queue is empty, for at most
    /// `grace`, then cancel whatever is left
    ///
    /// Close the queue before calling this or the workers will wait for the
    /// whole grace period.
    ///
    /// # Errors
    ///
    /// Same as [`stop`](Self::stop).
    #[instrument(skip(self))]
    pub async fn drain(&self, grace: Duration) -> PipelineResult<()> {
        let mut state = self.state.lock().await;
        if state.handles.is_empty() {
            return Err(PipelineError::NotRunning);
        }

        let handles = std::mem::take(&mut state.handles);
        let mut joined = Box::pin(join_all(handles));

        let results = match tokio::time::timeout(grace, &mut joined).await {
            Ok(results) => results,
            Err(_) => {
                warn!(
                    grace_ms = grace.as_millis() as u64,
                    remaining = self.context.queue.len(),
                    "Drain grace period elapsed, cancelling workers"
                );
                state.cancellation_token.cancel();
                joined.await
            }
        };
        collect_joins(results)?;

        info!(remaining = self.context.queue.len(), "Worker pool drained");
        Ok(())
    }

    /// Returns `true` while any worker task is alive, including during
    /// `stop` and `drain`
    pub fn is_running(&self) -> bool {
        self.context.live.load(Ordering::SeqCst) > 0
    }

    /// Processed and failed counters plus current queue depth
    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            processed: self.context.counters.processed.load(Ordering::Relaxed),
            failed: self.context.counters.failed.load(Ordering::Relaxed),
            queue_depth: self.context.queue.len(),
            queue_capacity: self.context.queue.capacity(),
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if !state.handles.is_empty() && !state.cancellation_token.is_cancelled() {
            warn!("WorkerPool dropped while running; cancelling");
            state.cancellation_token.cancel();
        }
    }
}

fn collect_joins(results: Vec<Result<(), tokio::task::JoinError>>) -> PipelineResult<()> {
    results.into_iter().try_for_each(|result| result.map_err(PipelineError::from))
}

async fn worker_loop(id: usize, context: WorkerContext, cancel: CancellationToken) {
    debug!(worker = id, "Worker started");

    loop {
        let event = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(worker = id, "Worker cancelled");
                break;
            }
            next = context.queue.dequeue() => match next {
                Some(event) => event,
                None => {
                    debug!(worker = id, "Queue closed and drained");
                    break;
                }
            },
        };

        process_event(id, &context, event).await;
    }

    debug!(worker = id, "Worker exited");
}

async fn process_event(id: usize, context: &WorkerContext, event: ProductEvent) {
    let ProductEvent { product_id, price, stock } = event;

    let result = context
        .retry
        .execute_with_retry_and_callback(
            || context.breaker.execute(|| context.repository.update(&product_id, price, stock)),
            |attempt, failure| {
                warn!(
                    worker = id,
                    product_id = %product_id,
                    attempt,
                    error = %failure.error(),
                    "{failure}"
                );
            },
        )
        .await;

    match result {
        Ok(()) => {
            context.counters.processed.fetch_add(1, Ordering::Relaxed);
            debug!(worker = id, product_id = %product_id, price, stock, "Product updated");
        }
        Err(err) => {
            context.counters.failed.fetch_add(1, Ordering::Relaxed);
            error!(
                worker = id,
                product_id = %product_id,
                error = %err,
                "Failed to process event, dropping it"
            );
        }
    }
}
