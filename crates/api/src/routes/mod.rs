//! HTTP routes
//!
//! - `GET /health`
//! - `POST /api/v1/events`
//! - `GET /api/v1/products/{id}`
//! - `GET /api/v1/stats`

pub mod error;
pub mod events;
pub mod health;
pub mod products;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::AppContext;

/// Build the application router
pub fn router(context: Arc<AppContext>) -> Router {
    let api = Router::new()
        .route("/events", post(events::submit_event))
        .route("/products/{id}", get(products::get_product))
        .route("/stats", get(products::get_stats));

    Router::new()
        .route("/health", get(health::health))
        .nest("/api/v1", api)
        .with_state(context)
}
