pub mod health;
pub mod trips;

use crate::db::Repository;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
}

impl AppState {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/trips/active", get(trips::get_active_trips))
        .route("/v1/trips/historical", get(trips::get_historical_trips))
        .route("/v1/trips/historical/:key", get(trips::get_historical_trip))
        .layer(cors)
        .with_state(state)
}
