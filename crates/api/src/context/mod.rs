//! Application context - dependency injection container

use std::sync::Arc;

use restock_core::{ProductRepository, ProductService};
use restock_domain::{Config, Result};
use restock_infra::InMemoryProductRepository;
use tracing::info;

/// Application context - holds the service and its dependencies
pub struct AppContext {
    pub config: Config,
    pub service: Arc<ProductService>,
}

impl AppContext {
    /// Wire the service to the in-memory store
    pub fn new(config: Config) -> Result<Self> {
        Self::with_repository(config, Arc::new(InMemoryProductRepository::new()))
    }

    /// Wire the service to a caller-provided store
    pub fn with_repository(config: Config, repository: Arc<dyn ProductRepository>) -> Result<Self> {
        let service = Arc::new(ProductService::from_config(repository, &config)?);
        Ok(Self { config, service })
    }

    /// Start background workers
    pub async fn start(&self) -> Result<()> {
        self.service.start().await?;
        info!(workers = self.config.pipeline.workers, "Application context started");
        Ok(())
    }

    /// Stop intake and drain the queue within the configured grace period
    pub async fn shutdown(&self) -> Result<()> {
        self.service.shutdown(self.config.server.shutdown_grace).await
    }
}
