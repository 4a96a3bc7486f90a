//! Restock - product event ingestion service
//!
//! Main entry point for the HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use restock_api::utils::logging::{init_tracing, LogFormat};
use restock_api::{router, AppContext};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before anything reads the environment
    let dotenv = dotenvy::dotenv();
    init_tracing(LogFormat::from_env());

    match dotenv {
        Ok(path) => info!(path = %path.display(), "Loaded .env"),
        Err(e) => info!(error = %e, "No .env file loaded"),
    }
    if let Some(path) = restock_infra::config::config_path() {
        info!(path = %path.display(), "Using config file");
    }

    let config = restock_infra::config::load().context("failed to load configuration")?;
    let port = config.server.port;

    let context = Arc::new(AppContext::new(config).context("failed to build application")?);
    context.start().await.context("failed to start workers")?;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener =
        TcpListener::bind(addr).await.with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Restock listening");

    let served = axum::serve(listener, router(Arc::clone(&context)))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // Drain even when the server failed so queued events are not abandoned
    info!("Shutting down");
    if let Err(err) = context.shutdown().await {
        warn!(error = %err, "Shutdown incomplete");
    }
    served.context("server error")?;

    info!("Restock stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C"),
        () = terminate => info!("Received SIGTERM"),
    }
}
