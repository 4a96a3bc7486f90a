//! Mapping of domain errors to HTTP responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use restock_domain::RestockError;
use serde::Serialize;

/// JSON error body: `{"error": "..."}`
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}

/// Error returned by route handlers
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<RestockError> for ApiError {
    fn from(err: RestockError) -> Self {
        match err {
            RestockError::InvalidInput(message) => Self::new(StatusCode::BAD_REQUEST, message),
            RestockError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, "Product not found"),
            RestockError::QueueFull | RestockError::RetryExhausted { .. } => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, "Queue is full")
            }
            RestockError::QueueClosed => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, "Service is shutting down")
            }
            RestockError::CircuitOpen => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, "Service temporarily unavailable")
            }
            other => {
                tracing::error!(error = %other, "Request failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse::new(self.message))).into_response()
    }
}
