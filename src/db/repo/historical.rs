//! Read side of the sealed trip archive.

use crate::domain::{ActiveTripId, HistoricalTrip, TimeMs, TripDurations, VesselId};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{trip_state_from_row, Repository, TRIP_COLUMNS};

fn historical_from_row(row: &SqliteRow) -> HistoricalTrip {
    HistoricalTrip {
        key: row.get("trip_key"),
        active_trip_id: ActiveTripId::new(row.get("active_trip_id")),
        created_at: TimeMs::new(row.get("created_at")),
        trip_end: TimeMs::new(row.get("trip_end")),
        state: trip_state_from_row(row),
        durations: TripDurations {
            left_dock_delay: row.get("left_dock_delay"),
            at_dock_duration: row.get("at_dock_duration"),
            total_duration: row.get("total_duration"),
            at_sea_duration: row.get("at_sea_duration"),
        },
    }
}

fn select_historical() -> String {
    format!(
        "SELECT trip_key, active_trip_id, {}, trip_end, \
         left_dock_delay, at_dock_duration, total_duration, at_sea_duration \
         FROM historical_trips",
        TRIP_COLUMNS
    )
}

impl Repository {
    /// Query sealed trips, newest trip end first, optionally for one vessel.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_historical_trips(
        &self,
        vessel_id: Option<VesselId>,
        limit: i64,
    ) -> Result<Vec<HistoricalTrip>, sqlx::Error> {
        let rows = match vessel_id {
            Some(vessel_id) => {
                let sql = format!(
                    "{} WHERE vessel_id = ? ORDER BY trip_end DESC, id DESC LIMIT ?",
                    select_historical()
                );
                sqlx::query(&sql)
                    .bind(vessel_id.as_i64())
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    "{} ORDER BY trip_end DESC, id DESC LIMIT ?",
                    select_historical()
                );
                sqlx::query(&sql).bind(limit).fetch_all(&self.pool).await?
            }
        };

        Ok(rows.iter().map(historical_from_row).collect())
    }

    /// Look up one sealed trip by key.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn get_historical_trip(&self, key: &str) -> Result<Option<HistoricalTrip>, sqlx::Error> {
        let sql = format!("{} WHERE trip_key = ?", select_historical());
        let row = sqlx::query(&sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(historical_from_row))
    }

    /// Number of sealed trips in the archive.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn count_historical_trips(&self) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM historical_trips")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }
}
