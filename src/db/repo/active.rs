//! Active trip reads and the three tick mutations: insert, patch, seal.

use crate::domain::{ActiveTrip, ActiveTripId, TimeMs, VesselId, VesselSnapshot};
use crate::engine::{SealedTrip, TripUpdate};
use sqlx::Row;
use std::collections::HashMap;
use tracing::debug;

use super::{bind_trip_state, trip_state_from_row, Repository, SealReport, TRIP_COLUMNS};

const PATCH_SQL: &str = r#"
    UPDATE active_trips SET
        departing_terminal_id = COALESCE(?, departing_terminal_id),
        departing_terminal_name = COALESCE(?, departing_terminal_name),
        departing_terminal_abbrev = CASE WHEN ? IS NULL THEN departing_terminal_abbrev ELSE ? END,
        arriving_terminal_id = COALESCE(?, arriving_terminal_id),
        arriving_terminal_name = COALESCE(?, arriving_terminal_name),
        arriving_terminal_abbrev = CASE WHEN ? IS NULL THEN arriving_terminal_abbrev ELSE ? END,
        in_service = COALESCE(?, in_service),
        at_dock = COALESCE(?, at_dock),
        scheduled_departure = COALESCE(?, scheduled_departure),
        left_dock = COALESCE(?, left_dock),
        actual_left_dock = COALESCE(?, actual_left_dock),
        eta = COALESCE(?, eta),
        actual_arrival = COALESCE(?, actual_arrival),
        route_abbrev = COALESCE(?, route_abbrev),
        position_num = COALESCE(?, position_num),
        timestamp = COALESCE(?, timestamp)
    WHERE id = ? AND vessel_id = ?
"#;

impl Repository {
    /// Load every active trip, keyed by vessel.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn load_active_trips(&self) -> Result<HashMap<VesselId, ActiveTrip>, sqlx::Error> {
        Ok(self
            .list_active_trips()
            .await?
            .into_iter()
            .map(|trip| (trip.vessel_id(), trip))
            .collect())
    }

    /// List every active trip ordered by vessel id.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn list_active_trips(&self) -> Result<Vec<ActiveTrip>, sqlx::Error> {
        let sql = format!(
            "SELECT id, {} FROM active_trips ORDER BY vessel_id ASC",
            TRIP_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        Ok(rows
            .iter()
            .map(|row| ActiveTrip {
                id: ActiveTripId::new(row.get("id")),
                created_at: TimeMs::new(row.get("created_at")),
                state: trip_state_from_row(row),
            })
            .collect())
    }

    /// Insert brand-new active trips in one transaction.
    ///
    /// Creation time is the snapshot's own record timestamp. Fails the whole
    /// batch if a vessel already has an active trip.
    ///
    /// # Errors
    /// Returns an error if the transaction fails.
    pub async fn insert_active_trips(
        &self,
        snapshots: &[VesselSnapshot],
    ) -> Result<usize, sqlx::Error> {
        if snapshots.is_empty() {
            return Ok(0);
        }

        let sql = format!(
            "INSERT INTO active_trips ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            TRIP_COLUMNS
        );
        let mut tx = self.pool.begin().await?;

        for snapshot in snapshots {
            bind_trip_state(sqlx::query(&sql), snapshot)
                .bind(snapshot.timestamp.as_ms())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(snapshots.len())
    }

    /// Apply partial updates in one transaction.
    ///
    /// Returns the number of trips updated; updates whose target is gone are
    /// ignored.
    ///
    /// # Errors
    /// Returns an error if the transaction fails.
    pub async fn patch_active_trips(&self, updates: &[TripUpdate]) -> Result<usize, sqlx::Error> {
        if updates.is_empty() {
            return Ok(0);
        }

        let mut updated = 0usize;
        let mut tx = self.pool.begin().await?;

        for update in updates {
            let patch = &update.patch;
            let departing = patch.departing_terminal.as_ref();
            let arriving = patch.arriving_terminal.as_ref();

            let result = sqlx::query(PATCH_SQL)
                .bind(departing.map(|t| t.id.as_i64()))
                .bind(departing.map(|t| t.name.as_str()))
                .bind(departing.map(|t| t.id.as_i64()))
                .bind(departing.and_then(|t| t.abbrev.as_deref()))
                .bind(arriving.map(|t| t.id.as_i64()))
                .bind(arriving.map(|t| t.name.as_str()))
                .bind(arriving.map(|t| t.id.as_i64()))
                .bind(arriving.and_then(|t| t.abbrev.as_deref()))
                .bind(patch.in_service)
                .bind(patch.at_dock)
                .bind(patch.scheduled_departure.map(|t| t.as_ms()))
                .bind(patch.left_dock.map(|t| t.as_ms()))
                .bind(patch.actual_left_dock.map(|t| t.as_ms()))
                .bind(patch.eta.map(|t| t.as_ms()))
                .bind(patch.actual_arrival.map(|t| t.as_ms()))
                .bind(patch.route_abbrev.as_deref())
                .bind(patch.position_num)
                .bind(patch.timestamp.map(|t| t.as_ms()))
                .bind(update.active_trip_id.as_i64())
                .bind(update.vessel_id.as_i64())
                .execute(&mut *tx)
                .await?;

            if result.rows_affected() > 0 {
                updated += 1;
            } else {
                debug!(
                    active_trip_id = %update.active_trip_id,
                    vessel_id = %update.vessel_id,
                    "Patch target no longer exists"
                );
            }
        }

        tx.commit().await?;
        Ok(updated)
    }

    /// Move active trips into the historical archive in one transaction.
    ///
    /// Each stored row is copied together with its derived key, trip end and
    /// durations, then removed from the active set. Targets that no longer
    /// exist are skipped and reported.
    ///
    /// # Errors
    /// Returns an error if the transaction fails.
    pub async fn seal_active_trips(&self, seals: &[SealedTrip]) -> Result<SealReport, sqlx::Error> {
        let mut report = SealReport::default();
        if seals.is_empty() {
            return Ok(report);
        }

        // The WHERE clause lets SQLite parse the upsert after INSERT ... SELECT.
        let archive_sql = format!(
            r#"
            INSERT INTO historical_trips
            (trip_key, active_trip_id, {cols}, trip_end,
             left_dock_delay, at_dock_duration, total_duration, at_sea_duration)
            SELECT ?, id, {cols}, ?, ?, ?, ?, ?
            FROM active_trips
            WHERE id = ?
            ON CONFLICT(trip_key) DO NOTHING
            "#,
            cols = TRIP_COLUMNS
        );

        let mut tx = self.pool.begin().await?;

        for seal in seals {
            let historical = &seal.historical;
            let durations = &historical.durations;

            let archived = sqlx::query(&archive_sql)
                .bind(historical.key.as_str())
                .bind(historical.trip_end.as_ms())
                .bind(durations.left_dock_delay)
                .bind(durations.at_dock_duration)
                .bind(durations.total_duration)
                .bind(durations.at_sea_duration)
                .bind(seal.active_trip_id.as_i64())
                .execute(&mut *tx)
                .await?
                .rows_affected();

            let removed = sqlx::query("DELETE FROM active_trips WHERE id = ?")
                .bind(seal.active_trip_id.as_i64())
                .execute(&mut *tx)
                .await?
                .rows_affected();

            if removed == 0 {
                report.skipped.push(seal.active_trip_id);
                continue;
            }

            report.sealed += 1;
            if archived == 0 {
                debug!(trip_key = %historical.key, "Trip key already archived");
                report.duplicate_keys += 1;
            }
        }

        tx.commit().await?;
        Ok(report)
    }
}
