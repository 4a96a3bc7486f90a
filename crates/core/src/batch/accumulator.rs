//! Size- and time-triggered batching of product events.
//!
//! Events are buffered until either `batch_size` is reached (flushed inside
//! the `add_event` call) or the flush interval ticks (flushed by the dispatch
//! loop). A flush hands the batch to a bounded channel; the dispatch loop
//! delivers batches to the [`BatchHandler`] one at a time.
//!
//! A flush that finds the channel full fails with
//! [`RestockError::BatchProcessorFull`] and the batch is discarded; it is not
//! put back into the buffer.
//!
//! On [`stop`](BatchAccumulator::stop) the loop closes the channel, delivers
//! every batch still queued and then the remaining buffer, exactly once.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use restock_common::collections::bounded_queue::PREALLOCATE_LIMIT;
use restock_domain::constants::{
    BATCH_DISPATCH_BUFFER, DEFAULT_BATCH_FLUSH_INTERVAL, DEFAULT_BATCH_SIZE,
};
use restock_domain::{BatchConfig, BatchStats, ProductEvent, RestockError, Result};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::ports::{BatchHandler, BatchObserver, LoggingObserver};
use crate::pipeline::error::{PipelineError, PipelineResult};

/// Configuration for a [`BatchAccumulator`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchAccumulatorConfig {
    /// Buffer length that triggers an immediate flush
    pub batch_size: usize,
    /// Period of the timer-driven flush
    pub flush_interval: Duration,
    /// Flushed batches that may wait for the dispatch loop
    pub dispatch_buffer: usize,
}

impl Default for BatchAccumulatorConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            flush_interval: DEFAULT_BATCH_FLUSH_INTERVAL,
            dispatch_buffer: BATCH_DISPATCH_BUFFER,
        }
    }
}

impl From<&BatchConfig> for BatchAccumulatorConfig {
    fn from(config: &BatchConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            flush_interval: config.flush_interval,
            dispatch_buffer: BATCH_DISPATCH_BUFFER,
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    delivered: AtomicU64,
    handler_errors: AtomicU64,
    dropped: AtomicU64,
}

struct Buffer {
    events: Vec<ProductEvent>,
    closed: bool,
}

/// State shared between callers and the dispatch loop
struct Shared {
    buffer: Mutex<Buffer>,
    batch_size: usize,
    sender: Sender<Vec<ProductEvent>>,
    counters: Counters,
}

impl Shared {
    /// Take the buffer and queue it for dispatch. Caller holds the lock.
    fn flush_locked(&self, buffer: &mut Buffer) -> Result<()> {
        if buffer.closed {
            return Err(RestockError::BatchProcessorStopped);
        }
        if buffer.events.is_empty() {
            return Ok(());
        }

        let batch = std::mem::take(&mut buffer.events);
        let len = batch.len();
        match self.sender.try_send(batch) {
            Ok(()) => {
                debug!(batch_len = len, "Batch queued for dispatch");
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                Err(RestockError::BatchProcessorFull)
            }
            Err(TrySendError::Closed(_)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                Err(RestockError::BatchProcessorStopped)
            }
        }
    }
}

/// Buffers product events and delivers them in batches
pub struct BatchAccumulator {
    shared: Arc<Shared>,
    cancellation_token: CancellationToken,
    task_handle: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl BatchAccumulator {
    /// Spawn the dispatch loop, reporting background failures to the log
    pub fn start(config: BatchAccumulatorConfig, handler: Arc<dyn BatchHandler>) -> Self {
        Self::start_with_observer(config, handler, Arc::new(LoggingObserver))
    }

    /// Spawn the dispatch loop with a custom observer for background failures
    pub fn start_with_observer(
        config: BatchAccumulatorConfig,
        handler: Arc<dyn BatchHandler>,
        observer: Arc<dyn BatchObserver>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(config.dispatch_buffer.max(1));
        let shared = Arc::new(Shared {
            buffer: Mutex::new(Buffer {
                events: Vec::with_capacity(config.batch_size.min(PREALLOCATE_LIMIT)),
                closed: false,
            }),
            batch_size: config.batch_size.max(1),
            sender,
            counters: Counters::default(),
        });
        let cancellation_token = CancellationToken::new();

        let context = DispatchContext {
            shared: Arc::clone(&shared),
            receiver,
            handler,
            observer,
            flush_interval: config.flush_interval,
        };
        let cancel = cancellation_token.clone();
        let handle = tokio::spawn(async move {
            dispatch_loop(context, cancel).await;
        });

        info!(
            batch_size = config.batch_size,
            flush_interval_ms = config.flush_interval.as_millis() as u64,
            "Batch accumulator started"
        );

        Self {
            shared,
            cancellation_token,
            task_handle: tokio::sync::Mutex::new(Some(handle)),
        }
    }

    /// Buffer an event, flushing synchronously once the batch is full
    ///
    /// # Errors
    ///
    /// [`RestockError::BatchProcessorFull`] if the triggered flush finds the
    /// dispatch buffer full (that batch is lost), and
    /// [`RestockError::BatchProcessorStopped`] after [`stop`](Self::stop).
    pub fn add_event(&self, event: ProductEvent) -> Result<()> {
        let mut buffer = self.shared.buffer.lock();
        if buffer.closed {
            return Err(RestockError::BatchProcessorStopped);
        }

        buffer.events.push(event);
        if buffer.events.len() >= self.shared.batch_size {
            self.shared.flush_locked(&mut buffer)?;
        }
        Ok(())
    }

    /// Queue whatever is buffered for dispatch; a no-op when empty
    ///
    /// # Errors
    ///
    /// Same as [`add_event`](Self::add_event).
    pub fn flush(&self) -> Result<()> {
        let mut buffer = self.shared.buffer.lock();
        self.shared.flush_locked(&mut buffer)
    }

    /// Number of buffered, not yet flushed events
    pub fn pending_events(&self) -> usize {
        self.shared.buffer.lock().events.len()
    }

    pub fn stats(&self) -> BatchStats {
        let counters = &self.shared.counters;
        BatchStats {
            pending: self.pending_events(),
            delivered: counters.delivered.load(Ordering::Relaxed),
            handler_errors: counters.handler_errors.load(Ordering::Relaxed),
            dropped: counters.dropped.load(Ordering::Relaxed),
        }
    }

    /// Signal the dispatch loop to flush everything and wait for it to exit
    ///
    /// # Errors
    ///
    /// [`PipelineError::NotRunning`] on a second call, and
    /// [`PipelineError::TaskJoinFailed`] if the loop panicked.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> PipelineResult<()> {
        let Some(handle) = self.task_handle.lock().await.take() else {
            return Err(PipelineError::NotRunning);
        };

        info!("Stopping batch accumulator");
        self.cancellation_token.cancel();
        handle.await?;
        info!("Batch accumulator stopped");
        Ok(())
    }
}

impl Drop for BatchAccumulator {
    fn drop(&mut self) {
        if !self.cancellation_token.is_cancelled() {
            debug!("BatchAccumulator dropped while running; cancelling");
            self.cancellation_token.cancel();
        }
    }
}

struct DispatchContext {
    shared: Arc<Shared>,
    receiver: Receiver<Vec<ProductEvent>>,
    handler: Arc<dyn BatchHandler>,
    observer: Arc<dyn BatchObserver>,
    flush_interval: Duration,
}

impl DispatchContext {
    async fn deliver(&self, batch: Vec<ProductEvent>) {
        let len = batch.len();
        match self.handler.handle(batch).await {
            Ok(()) => {
                self.shared.counters.delivered.fetch_add(1, Ordering::Relaxed);
                debug!(batch_len = len, "Batch delivered");
            }
            Err(err) => {
                self.shared.counters.handler_errors.fetch_add(1, Ordering::Relaxed);
                self.observer.on_handler_error(len, &err);
            }
        }
    }
}

async fn dispatch_loop(mut context: DispatchContext, cancel: CancellationToken) {
    let period = context.flush_interval.max(Duration::from_millis(1));
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            Some(batch) = context.receiver.recv() => {
                context.deliver(batch).await;
            }
            _ = ticker.tick() => {
                let mut buffer = context.shared.buffer.lock();
                if !buffer.events.is_empty() {
                    if let Err(err) = context.shared.flush_locked(&mut buffer) {
                        drop(buffer);
                        context.observer.on_flush_error(&err);
                    }
                }
            }
        }
    }

    // Close under the buffer lock so no caller can slip a batch in between.
    let remainder = {
        let mut buffer = context.shared.buffer.lock();
        buffer.closed = true;
        context.receiver.close();
        std::mem::take(&mut buffer.events)
    };

    while let Some(batch) = context.receiver.recv().await {
        context.deliver(batch).await;
    }
    if !remainder.is_empty() {
        debug!(batch_len = remainder.len(), "Delivering final batch");
        context.deliver(remainder).await;
    }

    debug!("Batch dispatch loop exited");
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::batch::ports::FnBatchHandler;

    /// Handler that records every batch it receives
    #[derive(Default)]
    struct Recorder {
        batches: Mutex<Vec<Vec<String>>>,
    }

    impl Recorder {
        fn ids(&self) -> Vec<Vec<String>> {
            self.batches.lock().clone()
        }
    }

    #[async_trait::async_trait]
    impl BatchHandler for Recorder {
        async fn handle(&self, batch: Vec<ProductEvent>) -> Result<()> {
            self.batches.lock().push(batch.into_iter().map(|e| e.product_id).collect());
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingObserver {
        handler_errors: AtomicUsize,
    }

    impl BatchObserver for CountingObserver {
        fn on_handler_error(&self, _batch_len: usize, _error: &RestockError) {
            self.handler_errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn config(batch_size: usize, flush_interval: Duration) -> BatchAccumulatorConfig {
        BatchAccumulatorConfig { batch_size, flush_interval, dispatch_buffer: 10 }
    }

    fn event(id: &str) -> ProductEvent {
        ProductEvent::new(id, 1.0, 1)
    }

    /// Validates the size trigger delivers one ordered batch.
    ///
    /// Assertions:
    /// - Three adds with batch size 3 produce exactly `[a, b, c]`.
    /// - Nothing is pending afterwards.
    #[tokio::test]
    async fn test_size_trigger_delivers_in_order() {
        let recorder = Arc::new(Recorder::default());
        let acc = BatchAccumulator::start(
            config(3, Duration::from_secs(3600)),
            Arc::clone(&recorder) as Arc<dyn BatchHandler>,
        );

        for id in ["a", "b", "c"] {
            acc.add_event(event(id)).unwrap();
        }
        assert_eq!(acc.pending_events(), 0);

        acc.stop().await.unwrap();
        assert_eq!(recorder.ids(), vec![vec!["a", "b", "c"]]);
    }

    /// Validates the timer flushes a partial batch.
    ///
    /// Assertions:
    /// - After one interval the buffered events reach the handler.
    #[tokio::test(start_paused = true)]
    async fn test_timer_flushes_partial_batch() {
        let recorder = Arc::new(Recorder::default());
        let acc = BatchAccumulator::start(
            config(100, Duration::from_millis(50)),
            Arc::clone(&recorder) as Arc<dyn BatchHandler>,
        );

        acc.add_event(event("x")).unwrap();
        acc.add_event(event("y")).unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        // Let the dispatch loop receive the flushed batch.
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert_eq!(recorder.ids(), vec![vec!["x", "y"]]);
        assert_eq!(acc.pending_events(), 0);
        acc.stop().await.unwrap();
        assert_eq!(recorder.ids().len(), 1);
    }

    /// Validates the accumulator settings are taken from application config.
    ///
    /// Assertions:
    /// - Size and interval come from `BatchConfig`.
    /// - The dispatch buffer uses the fixed default.
    #[test]
    fn test_config_from_batch_settings() {
        let batch = BatchConfig { batch_size: 25, flush_interval: Duration::from_millis(250) };
        let config = BatchAccumulatorConfig::from(&batch);

        assert_eq!(config.batch_size, 25);
        assert_eq!(config.flush_interval, Duration::from_millis(250));
        assert_eq!(config.dispatch_buffer, BATCH_DISPATCH_BUFFER);
    }

    /// Validates a huge batch size does not reserve the whole buffer.
    ///
    /// Assertions:
    /// - Starting with `usize::MAX` as batch size does not panic.
    /// - A buffered event is delivered on stop.
    #[tokio::test]
    async fn test_huge_batch_size_starts() {
        let recorder = Arc::new(Recorder::default());
        let acc = BatchAccumulator::start(
            config(usize::MAX, Duration::from_secs(3600)),
            Arc::clone(&recorder) as Arc<dyn BatchHandler>,
        );

        acc.add_event(event("big")).unwrap();
        assert_eq!(acc.pending_events(), 1);

        acc.stop().await.unwrap();
        assert_eq!(recorder.ids(), vec![vec!["big"]]);
    }

    /// Validates flushing an empty buffer delivers nothing.
    ///
    /// Assertions:
    /// - `flush` succeeds and the handler never runs.
    #[tokio::test]
    async fn test_empty_flush_is_noop() {
        let recorder = Arc::new(Recorder::default());
        let acc = BatchAccumulator::start(
            config(10, Duration::from_secs(3600)),
            Arc::clone(&recorder) as Arc<dyn BatchHandler>,
        );

        acc.flush().unwrap();
        acc.stop().await.unwrap();
        assert!(recorder.ids().is_empty());
    }

    /// Validates stop flushes the remainder exactly once.
    ///
    /// Assertions:
    /// - The partial buffer arrives as one batch.
    /// - Later adds and a second stop are rejected.
    #[tokio::test]
    async fn test_stop_flushes_remainder_once() {
        let recorder = Arc::new(Recorder::default());
        let acc = BatchAccumulator::start(
            config(10, Duration::from_secs(3600)),
            Arc::clone(&recorder) as Arc<dyn BatchHandler>,
        );

        acc.add_event(event("r1")).unwrap();
        acc.add_event(event("r2")).unwrap();
        acc.stop().await.unwrap();

        assert_eq!(recorder.ids(), vec![vec!["r1", "r2"]]);
        assert_eq!(acc.add_event(event("late")), Err(RestockError::BatchProcessorStopped));
        assert_eq!(acc.flush(), Err(RestockError::BatchProcessorStopped));
        assert!(matches!(acc.stop().await, Err(PipelineError::NotRunning)));
        assert_eq!(recorder.ids().len(), 1);
    }

    /// Validates a full dispatch buffer rejects the flush and loses the batch.
    ///
    /// Assertions:
    /// - With a blocked handler and buffer 1, the third flush fails with
    ///   `BatchProcessorFull`.
    /// - The rejected batch is not re-buffered.
    #[tokio::test]
    async fn test_full_dispatch_buffer_rejects_flush() {
        let (release_tx, release_rx) = tokio::sync::watch::channel(false);
        let handler = FnBatchHandler::new(move |_batch: Vec<ProductEvent>| {
            let mut release = release_rx.clone();
            async move {
                let _ = release.wait_for(|released| *released).await;
                Ok(())
            }
        });
        let acc = BatchAccumulator::start(
            BatchAccumulatorConfig {
                batch_size: 1,
                flush_interval: Duration::from_secs(3600),
                dispatch_buffer: 1,
            },
            Arc::new(handler),
        );

        // First batch is taken by the loop and blocks in the handler.
        acc.add_event(event("b1")).unwrap();
        while acc.shared.sender.capacity() == 0 {
            tokio::task::yield_now().await;
        }
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        // Second fills the channel, third overflows.
        acc.add_event(event("b2")).unwrap();
        assert_eq!(acc.add_event(event("b3")), Err(RestockError::BatchProcessorFull));
        assert_eq!(acc.pending_events(), 0);
        assert_eq!(acc.stats().dropped, 1);

        release_tx.send(true).unwrap();
        acc.stop().await.unwrap();
        assert_eq!(acc.stats().delivered, 2);
    }

    /// Validates handler failures reach the observer and are not surfaced.
    ///
    /// Assertions:
    /// - `add_event` succeeds while the handler fails.
    /// - The observer counts one error.
    #[tokio::test]
    async fn test_handler_error_goes_to_observer() {
        let observer = Arc::new(CountingObserver::default());
        let handler = FnBatchHandler::new(|_batch: Vec<ProductEvent>| async {
            Err(RestockError::Internal("sink offline".into()))
        });
        let acc = BatchAccumulator::start_with_observer(
            config(2, Duration::from_secs(3600)),
            Arc::new(handler),
            Arc::clone(&observer) as Arc<dyn BatchObserver>,
        );

        acc.add_event(event("e1")).unwrap();
        acc.add_event(event("e2")).unwrap();
        acc.stop().await.unwrap();

        assert_eq!(observer.handler_errors.load(Ordering::SeqCst), 1);
        assert_eq!(acc.stats().handler_errors, 1);
    }
}
