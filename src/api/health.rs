use crate::api::AppState;
use crate::error::AppError;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

/// Liveness: the process is up and serving.
pub async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

/// Readiness: the trip store answers a trivial query.
pub async fn ready(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    state
        .repo
        .ping()
        .await
        .map_err(|e| AppError::Unavailable(e.to_string()))?;
    Ok(Json(json!({"status": "ready"})))
}
