use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors surfaced by the HTTP read endpoints.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Trip store error: {0}")]
    Store(#[from] sqlx::Error),
    #[error("Trip store unavailable: {0}")]
    Unavailable(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Store(err) => {
                error!(error = %err, "Trip store query failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal store error".to_string(),
                )
            }
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
