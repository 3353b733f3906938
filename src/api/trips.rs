use crate::api::AppState;
use crate::domain::{ActiveTrip, HistoricalTrip, VesselId};
use crate::error::AppError;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 500;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTripsResponse {
    pub trips: Vec<ActiveTrip>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalTripsQuery {
    pub vessel_id: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalTripsResponse {
    pub trips: Vec<HistoricalTrip>,
}

pub async fn get_active_trips(
    State(state): State<AppState>,
) -> Result<Json<ActiveTripsResponse>, AppError> {
    let trips = state.repo.list_active_trips().await?;
    Ok(Json(ActiveTripsResponse { trips }))
}

pub async fn get_historical_trips(
    Query(params): Query<HistoricalTripsQuery>,
    State(state): State<AppState>,
) -> Result<Json<HistoricalTripsResponse>, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {}",
            MAX_LIMIT
        )));
    }

    let trips = state
        .repo
        .query_historical_trips(params.vessel_id.map(VesselId::new), limit)
        .await?;
    Ok(Json(HistoricalTripsResponse { trips }))
}

pub async fn get_historical_trip(
    Path(key): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<HistoricalTrip>, AppError> {
    state
        .repo
        .get_historical_trip(&key)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No historical trip with key {}", key)))
}
