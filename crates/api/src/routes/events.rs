//! Event ingestion endpoint

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use restock_domain::ProductEvent;
use serde::Serialize;
use tracing::debug;

use super::error::ApiError;
use crate::AppContext;

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub message: String,
    pub product_id: String,
}

/// `POST /api/v1/events`
///
/// 202 once the event is queued; 400 for a malformed body or missing
/// `product_id`; 503 when the pipeline is overloaded or shutting down.
pub async fn submit_event(
    State(context): State<Arc<AppContext>>,
    payload: Result<Json<ProductEvent>, JsonRejection>,
) -> Result<(StatusCode, Json<EventResponse>), ApiError> {
    let Json(event) = payload.map_err(|rejection| {
        debug!(error = %rejection, "Rejecting event payload");
        ApiError::new(StatusCode::BAD_REQUEST, "Invalid JSON payload")
    })?;

    let product_id = event.product_id.clone();
    context.service.process_event(event).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(EventResponse { message: "Event accepted for processing".into(), product_id }),
    ))
}
