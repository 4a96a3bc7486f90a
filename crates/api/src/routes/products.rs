//! Product lookup and pipeline stats

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use restock_domain::{PipelineStats, Product, RestockError};

use super::error::ApiError;
use crate::AppContext;

/// `GET /api/v1/products/{id}`
pub async fn get_product(
    State(context): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let product = context.service.get_product(&id).await?;
    product.map(Json).ok_or_else(|| RestockError::NotFound(id).into())
}

/// `GET /api/v1/stats`
pub async fn get_stats(State(context): State<Arc<AppContext>>) -> Json<PipelineStats> {
    Json(context.service.stats())
}
