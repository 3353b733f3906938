//! Vessel snapshot: one vessel's reported state for a single polling tick.

use crate::domain::{TerminalId, TimeMs, VesselId};
use serde::{Deserialize, Serialize};

/// A ferry terminal as reported by the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Terminal {
    pub id: TerminalId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abbrev: Option<String>,
}

impl Terminal {
    pub fn new(id: i64, name: impl Into<String>, abbrev: Option<&str>) -> Self {
        Self {
            id: TerminalId::new(id),
            name: name.into(),
            abbrev: abbrev.map(str::to_string),
        }
    }
}

/// One vessel's state as of a polling tick.
///
/// Snapshots are never persisted as-is; they are compared against the
/// vessel's active trip and folded into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VesselSnapshot {
    pub vessel_id: VesselId,
    pub vessel_name: String,
    /// Short code used for trip keys (e.g. "KEN").
    pub vessel_abbrev: Option<String>,
    pub departing_terminal: Terminal,
    /// Unknown until the vessel is underway.
    pub arriving_terminal: Option<Terminal>,
    pub in_service: bool,
    pub at_dock: bool,
    pub scheduled_departure: Option<TimeMs>,
    /// Feed estimate of when the vessel left (or will leave) the dock.
    pub left_dock: Option<TimeMs>,
    /// Stamped by reconciliation when the vessel is observed leaving.
    pub actual_left_dock: Option<TimeMs>,
    pub eta: Option<TimeMs>,
    /// Stamped by reconciliation when the vessel is observed docking.
    pub actual_arrival: Option<TimeMs>,
    pub route_abbrev: Option<String>,
    pub position_num: Option<i32>,
    /// Record timestamp; the only clock the engine uses.
    pub timestamp: TimeMs,
}

impl VesselSnapshot {
    /// Create a docked, in-service snapshot with no optional fields set.
    pub fn new(
        vessel_id: VesselId,
        vessel_name: impl Into<String>,
        departing_terminal: Terminal,
        timestamp: TimeMs,
    ) -> Self {
        Self {
            vessel_id,
            vessel_name: vessel_name.into(),
            vessel_abbrev: None,
            departing_terminal,
            arriving_terminal: None,
            in_service: true,
            at_dock: true,
            scheduled_departure: None,
            left_dock: None,
            actual_left_dock: None,
            eta: None,
            actual_arrival: None,
            route_abbrev: None,
            position_num: None,
            timestamp,
        }
    }

    /// Short code for trip keys: the reported abbreviation, else the first
    /// three alphanumeric characters of the vessel name, uppercased.
    pub fn short_code(&self) -> String {
        match self.vessel_abbrev.as_deref().map(str::trim) {
            Some(abbrev) if !abbrev.is_empty() => abbrev.to_uppercase(),
            _ => self
                .vessel_name
                .chars()
                .filter(|c| c.is_alphanumeric())
                .take(3)
                .collect::<String>()
                .to_uppercase(),
        }
    }
}
