//! Active and historical trip records.

use crate::domain::{ActiveTripId, Terminal, TimeMs, VesselId, VesselSnapshot};
use serde::{Deserialize, Serialize};

/// A vessel's current, unsealed voyage as held by the trip store.
///
/// At most one exists per vessel at any time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTrip {
    pub id: ActiveTripId,
    pub created_at: TimeMs,
    #[serde(flatten)]
    pub state: VesselSnapshot,
}

impl ActiveTrip {
    pub fn vessel_id(&self) -> VesselId {
        self.state.vessel_id
    }

    /// Last-known record timestamp.
    pub fn timestamp(&self) -> TimeMs {
        self.state.timestamp
    }
}

/// Derived duration metrics of a sealed trip, in minutes (one decimal place).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripDurations {
    pub left_dock_delay: f64,
    pub at_dock_duration: f64,
    pub total_duration: f64,
    pub at_sea_duration: f64,
}

/// Immutable archival record of a completed voyage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalTrip {
    /// `CODE-YYYY-MM-DD-hh:mm` in fleet-local time.
    pub key: String,
    pub active_trip_id: ActiveTripId,
    pub created_at: TimeMs,
    pub trip_end: TimeMs,
    #[serde(flatten)]
    pub state: VesselSnapshot,
    #[serde(flatten)]
    pub durations: TripDurations,
}

impl HistoricalTrip {
    /// Seal an active trip into its archival form.
    pub fn from_active(
        trip: &ActiveTrip,
        key: String,
        trip_end: TimeMs,
        durations: TripDurations,
    ) -> Self {
        Self {
            key,
            active_trip_id: trip.id,
            created_at: trip.created_at,
            trip_end,
            state: trip.state.clone(),
            durations,
        }
    }
}

/// Partial update of an active trip. `None` leaves the stored value untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripPatch {
    pub departing_terminal: Option<Terminal>,
    pub arriving_terminal: Option<Terminal>,
    pub in_service: Option<bool>,
    pub at_dock: Option<bool>,
    pub scheduled_departure: Option<TimeMs>,
    pub left_dock: Option<TimeMs>,
    pub actual_left_dock: Option<TimeMs>,
    pub eta: Option<TimeMs>,
    pub actual_arrival: Option<TimeMs>,
    pub route_abbrev: Option<String>,
    pub position_num: Option<i32>,
    pub timestamp: Option<TimeMs>,
}

impl TripPatch {
    pub fn is_empty(&self) -> bool {
        *self == TripPatch::default()
    }

    /// Overlay this patch onto a stored trip state.
    pub fn apply_to(&self, state: &mut VesselSnapshot) {
        if let Some(t) = &self.departing_terminal {
            state.departing_terminal = t.clone();
        }
        if let Some(t) = &self.arriving_terminal {
            state.arriving_terminal = Some(t.clone());
        }
        if let Some(v) = self.in_service {
            state.in_service = v;
        }
        if let Some(v) = self.at_dock {
            state.at_dock = v;
        }
        if let Some(v) = self.scheduled_departure {
            state.scheduled_departure = Some(v);
        }
        if let Some(v) = self.left_dock {
            state.left_dock = Some(v);
        }
        if let Some(v) = self.actual_left_dock {
            state.actual_left_dock = Some(v);
        }
        if let Some(v) = self.eta {
            state.eta = Some(v);
        }
        if let Some(v) = self.actual_arrival {
            state.actual_arrival = Some(v);
        }
        if let Some(v) = &self.route_abbrev {
            state.route_abbrev = Some(v.clone());
        }
        if let Some(v) = self.position_num {
            state.position_num = Some(v);
        }
        if let Some(v) = self.timestamp {
            state.timestamp = v;
        }
    }
}
