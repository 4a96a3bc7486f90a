use std::future;
use std::sync::Arc;
use std::time::Duration;

use restock_common::resilience::{
    CircuitBreaker, CircuitBreakerConfig, ResilienceError, RetryConfig, RetryError,
};
use restock_domain::{Config, PipelineStats, Product, ProductEvent, RestockError, Result};
use tracing::{debug, info, instrument};

use super::ports::ProductRepository;
use crate::pipeline::{EventQueue, WorkerPool};

/// Product ingestion service.
///
/// Accepts product events, validates them and hands them to the worker
/// pool through the bounded queue. Enqueueing is guarded by its own circuit
/// breaker and retried on overload; the workers guard the store with a
/// separate breaker.
pub struct ProductService {
    repository: Arc<dyn ProductRepository>,
    queue: EventQueue,
    breaker: CircuitBreaker,
    retry: Arc<RetryConfig>,
    pool: WorkerPool,
}

impl ProductService {
    pub fn new(
        repository: Arc<dyn ProductRepository>,
        queue: EventQueue,
        workers: usize,
        breaker_config: CircuitBreakerConfig,
        retry: RetryConfig,
    ) -> Result<Self> {
        let ingress_breaker = CircuitBreaker::new(breaker_config.clone()).map_err(config_error)?;
        let store_breaker = CircuitBreaker::new(breaker_config).map_err(config_error)?;
        retry.validate().map_err(config_error)?;
        let retry = Arc::new(retry);

        let pool = WorkerPool::new(
            workers,
            queue.clone(),
            Arc::clone(&repository),
            store_breaker,
            Arc::clone(&retry),
        );

        Ok(Self { repository, queue, breaker: ingress_breaker, retry, pool })
    }

    /// Build the service from application configuration
    pub fn from_config(repository: Arc<dyn ProductRepository>, config: &Config) -> Result<Self> {
        config.validate()?;

        let breaker_config = CircuitBreakerConfig::builder()
            .failure_threshold(config.circuit_breaker.failure_threshold)
            .timeout(config.circuit_breaker.timeout)
            .build()
            .map_err(config_error)?;
        let retry = RetryConfig::builder()
            .max_attempts(config.retry.max_attempts)
            .initial_delay(config.retry.initial_delay)
            .max_delay(config.retry.max_delay)
            .multiplier(config.retry.multiplier)
            .build()
            .map_err(config_error)?;

        Self::new(
            repository,
            EventQueue::new(config.pipeline.queue_capacity),
            config.pipeline.workers,
            breaker_config,
            retry,
        )
    }

    /// Start the worker pool
    pub async fn start(&self) -> Result<()> {
        self.pool.start().await?;
        Ok(())
    }

    /// Validate an event and queue it for the workers
    ///
    /// # Errors
    ///
    /// - [`RestockError::InvalidInput`] for an event without a product id
    /// - [`RestockError::QueueClosed`] once shutdown has begun
    /// - [`RestockError::RetryExhausted`] when the queue stayed full or the
    ///   ingress breaker stayed open for every attempt
    #[instrument(skip(self, event), fields(product_id = %event.product_id))]
    pub async fn process_event(&self, event: ProductEvent) -> Result<()> {
        event.validate()?;

        let result = self
            .retry
            .execute_classified(|| {
                future::ready(
                    self.breaker
                        .call(|| self.queue.enqueue(event.clone()))
                        .map_err(flatten_breaker_error),
                )
            })
            .await;

        match result {
            Ok(()) => {
                debug!(queue_depth = self.queue.len(), "Event queued");
                Ok(())
            }
            Err(RetryError::NonRetryable { source }) => Err(source),
            Err(RetryError::AttemptsExhausted { attempts }) => {
                Err(RestockError::RetryExhausted { attempts })
            }
        }
    }

    /// Current state of a product, if it has been written
    #[instrument(skip(self))]
    pub async fn get_product(&self, id: &str) -> Result<Option<Product>> {
        self.repository.get(id).await
    }

    /// Close the queue and let workers drain it for at most `grace`
    ///
    /// Events still queued when the grace period ends are discarded.
    #[instrument(skip(self))]
    pub async fn shutdown(&self, grace: Duration) -> Result<()> {
        info!(pending = self.queue.len(), "Shutting down product service");
        self.queue.close()?;
        self.pool.drain(grace).await?;
        Ok(())
    }

    pub fn stats(&self) -> PipelineStats {
        self.pool.stats()
    }

    pub fn is_running(&self) -> bool {
        self.pool.is_running()
    }
}

fn flatten_breaker_error(err: ResilienceError<RestockError>) -> RestockError {
    err.into_operation_error().unwrap_or(RestockError::CircuitOpen)
}

fn config_error(err: impl std::fmt::Display) -> RestockError {
    RestockError::Config(err.to_string())
}
