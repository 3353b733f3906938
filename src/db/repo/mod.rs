//! Repository layer for the trip store.
//!
//! This module provides the `Repository` struct for all database operations.
//! Methods are organized across submodules:
//! - `active.rs` - Active trip reads and the insert/patch/seal mutations
//! - `historical.rs` - Read side of the sealed trip archive

mod active;
mod historical;

use crate::domain::{ActiveTripId, Terminal, TerminalId, TimeMs, VesselId, VesselSnapshot};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqlitePool, SqliteRow};
use sqlx::Row;

/// Trip columns shared by `active_trips` and `historical_trips`.
///
/// `bind_trip_state` binds every column but `created_at`, in this order.
pub(crate) const TRIP_COLUMNS: &str = "vessel_id, vessel_name, vessel_abbrev, \
    departing_terminal_id, departing_terminal_name, departing_terminal_abbrev, \
    arriving_terminal_id, arriving_terminal_name, arriving_terminal_abbrev, \
    in_service, at_dock, scheduled_departure, left_dock, actual_left_dock, eta, \
    actual_arrival, route_abbrev, position_num, timestamp, created_at";

/// Outcome of a seal batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SealReport {
    /// Active trips removed from the active set.
    pub sealed: usize,
    /// Sealed trips whose key was already archived; the earlier record was kept.
    pub duplicate_keys: usize,
    /// Seal targets that no longer existed.
    pub skipped: Vec<ActiveTripId>,
}

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    /// Round-trip a trivial query to confirm the store is reachable.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn opt_time(row: &SqliteRow, column: &str) -> Option<TimeMs> {
    row.get::<Option<i64>, _>(column).map(TimeMs::new)
}

/// Rebuild the shared trip state from a row selected with `TRIP_COLUMNS`.
pub(crate) fn trip_state_from_row(row: &SqliteRow) -> VesselSnapshot {
    let arriving_terminal = row
        .get::<Option<i64>, _>("arriving_terminal_id")
        .map(|id| Terminal {
            id: TerminalId::new(id),
            name: row
                .get::<Option<String>, _>("arriving_terminal_name")
                .unwrap_or_default(),
            abbrev: row.get("arriving_terminal_abbrev"),
        });

    VesselSnapshot {
        vessel_id: VesselId::new(row.get("vessel_id")),
        vessel_name: row.get("vessel_name"),
        vessel_abbrev: row.get("vessel_abbrev"),
        departing_terminal: Terminal {
            id: TerminalId::new(row.get("departing_terminal_id")),
            name: row.get("departing_terminal_name"),
            abbrev: row.get("departing_terminal_abbrev"),
        },
        arriving_terminal,
        in_service: row.get::<i32, _>("in_service") != 0,
        at_dock: row.get::<i32, _>("at_dock") != 0,
        scheduled_departure: opt_time(row, "scheduled_departure"),
        left_dock: opt_time(row, "left_dock"),
        actual_left_dock: opt_time(row, "actual_left_dock"),
        eta: opt_time(row, "eta"),
        actual_arrival: opt_time(row, "actual_arrival"),
        route_abbrev: row.get("route_abbrev"),
        position_num: row.get("position_num"),
        timestamp: TimeMs::new(row.get("timestamp")),
    }
}

/// Bind every `TRIP_COLUMNS` value except `created_at`.
pub(crate) fn bind_trip_state<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    state: &'q VesselSnapshot,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    let arriving = state.arriving_terminal.as_ref();
    query
        .bind(state.vessel_id.as_i64())
        .bind(state.vessel_name.as_str())
        .bind(state.vessel_abbrev.as_deref())
        .bind(state.departing_terminal.id.as_i64())
        .bind(state.departing_terminal.name.as_str())
        .bind(state.departing_terminal.abbrev.as_deref())
        .bind(arriving.map(|t| t.id.as_i64()))
        .bind(arriving.map(|t| t.name.as_str()))
        .bind(arriving.and_then(|t| t.abbrev.as_deref()))
        .bind(state.in_service)
        .bind(state.at_dock)
        .bind(state.scheduled_departure.map(|t| t.as_ms()))
        .bind(state.left_dock.map(|t| t.as_ms()))
        .bind(state.actual_left_dock.map(|t| t.as_ms()))
        .bind(state.eta.map(|t| t.as_ms()))
        .bind(state.actual_arrival.map(|t| t.as_ms()))
        .bind(state.route_abbrev.as_deref())
        .bind(state.position_num)
        .bind(state.timestamp.as_ms())
}
