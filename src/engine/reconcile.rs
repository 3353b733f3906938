//! Trip lifecycle reconciliation.
//!
//! Given one tick's snapshots and the current active trips, decide per vessel
//! whether to insert, patch, seal-and-replace, or discard. Pure and
//! deterministic: the only clock is each snapshot's own record timestamp.

use crate::domain::{
    ActiveTrip, ActiveTripId, HistoricalTrip, TripPatch, VesselId, VesselSnapshot,
};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::HashMap;

use super::diff::watched_changes;
use super::durations::derive_durations;
use super::trip_key::trip_key;

/// Outcome of classifying one snapshot against its vessel's active trip.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Older than what the store already holds; discarded.
    Stale,
    /// No active trip for this vessel; insert the snapshot.
    NewVessel,
    /// Vessel docked at the far end of the current trip.
    ArrivedAtDock(TripPatch),
    /// Vessel is docked at a different departing terminal: seal the old trip
    /// and insert the snapshot as its replacement.
    NewJourney(Box<HistoricalTrip>),
    /// Vessel left the dock on the current trip.
    LeftDock(TripPatch),
    /// Same journey, one or more watched fields changed.
    FieldsChanged(TripPatch),
    /// Nothing to do.
    Unchanged,
}

/// Patch of one active trip, addressed by store identity.
#[derive(Debug, Clone, PartialEq)]
pub struct TripUpdate {
    pub active_trip_id: ActiveTripId,
    pub vessel_id: VesselId,
    pub patch: TripPatch,
}

/// Active trip to move into the historical archive.
#[derive(Debug, Clone, PartialEq)]
pub struct SealedTrip {
    pub active_trip_id: ActiveTripId,
    pub historical: HistoricalTrip,
}

/// Per-tick counts, one outcome per distinct vessel in the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TickSummary {
    pub inserted: usize,
    pub patched: usize,
    pub sealed: usize,
    pub unchanged: usize,
    pub stale: usize,
}

/// The store mutations one tick requires. Apply seals, then inserts, then
/// patches.
#[derive(Debug, Clone, Default)]
pub struct TickPlan {
    pub to_insert: Vec<VesselSnapshot>,
    pub to_patch: Vec<TripUpdate>,
    pub to_seal: Vec<SealedTrip>,
    pub summary: TickSummary,
}

impl TickPlan {
    pub fn is_empty(&self) -> bool {
        self.to_insert.is_empty() && self.to_patch.is_empty() && self.to_seal.is_empty()
    }
}

/// Collapse a roster to one snapshot per vessel, keeping the newest record.
///
/// Returns the kept snapshots in first-seen order and the number dropped.
pub fn latest_per_vessel(snapshots: &[VesselSnapshot]) -> (Vec<&VesselSnapshot>, usize) {
    let mut order: Vec<VesselId> = Vec::new();
    let mut latest: HashMap<VesselId, &VesselSnapshot> = HashMap::new();

    for snapshot in snapshots {
        let newer = match latest.get(&snapshot.vessel_id) {
            Some(kept) => kept.timestamp < snapshot.timestamp,
            None => {
                order.push(snapshot.vessel_id);
                true
            }
        };
        if newer {
            latest.insert(snapshot.vessel_id, snapshot);
        }
    }

    let dropped = snapshots.len() - order.len();
    let kept = order.iter().filter_map(|id| latest.get(id).copied()).collect();
    (kept, dropped)
}

/// Stateless reconciliation engine.
#[derive(Debug, Clone, Copy)]
pub struct Reconciler {
    tz: Tz,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(chrono_tz::America::Los_Angeles)
    }
}

impl Reconciler {
    /// `tz` is the fleet-local zone used for historical trip keys.
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Classify one snapshot. Rules are checked in order; the first match wins.
    pub fn decide(&self, snapshot: &VesselSnapshot, active: Option<&ActiveTrip>) -> Decision {
        let Some(trip) = active else {
            return Decision::NewVessel;
        };
        let stored = &trip.state;

        if snapshot.timestamp < stored.timestamp || snapshot.timestamp < trip.created_at {
            return Decision::Stale;
        }

        let same_departure = snapshot.departing_terminal.id == stored.departing_terminal.id;

        if !stored.at_dock && snapshot.at_dock && same_departure {
            return Decision::ArrivedAtDock(TripPatch {
                at_dock: Some(true),
                actual_arrival: Some(snapshot.timestamp),
                timestamp: Some(snapshot.timestamp),
                ..Default::default()
            });
        }

        if snapshot.at_dock && !same_departure {
            return Decision::NewJourney(Box::new(self.seal(trip, snapshot)));
        }

        if stored.at_dock && !snapshot.at_dock && same_departure {
            return Decision::LeftDock(TripPatch {
                at_dock: Some(false),
                actual_left_dock: Some(snapshot.timestamp),
                timestamp: Some(snapshot.timestamp),
                ..Default::default()
            });
        }

        match watched_changes(stored, snapshot) {
            Some(patch) => Decision::FieldsChanged(patch),
            None => Decision::Unchanged,
        }
    }

    /// Derive the historical record for `prev`, sealed by `curr`.
    ///
    /// Durations run to `curr`'s record timestamp; the stored trip end is
    /// `prev`'s observed arrival when it has one.
    pub fn seal(&self, prev: &ActiveTrip, curr: &VesselSnapshot) -> HistoricalTrip {
        let durations = derive_durations(prev, curr.timestamp);
        let trip_end = prev.state.actual_arrival.unwrap_or(curr.timestamp);
        HistoricalTrip::from_active(prev, trip_key(prev, self.tz), trip_end, durations)
    }

    /// Compute the store mutations for one tick.
    ///
    /// Active trips of vessels missing from `snapshots` are left alone.
    pub fn reconcile(
        &self,
        snapshots: &[VesselSnapshot],
        active: &HashMap<VesselId, ActiveTrip>,
    ) -> TickPlan {
        let (roster, superseded) = latest_per_vessel(snapshots);
        let mut plan = TickPlan::default();
        plan.summary.stale = superseded;

        for snapshot in roster {
            let trip = active.get(&snapshot.vessel_id);
            match (self.decide(snapshot, trip), trip) {
                (Decision::Stale, _) => plan.summary.stale += 1,
                (Decision::Unchanged, _) => plan.summary.unchanged += 1,
                (Decision::NewVessel, _) => {
                    plan.to_insert.push(snapshot.clone());
                    plan.summary.inserted += 1;
                }
                (Decision::NewJourney(historical), Some(trip)) => {
                    plan.to_seal.push(SealedTrip {
                        active_trip_id: trip.id,
                        historical: *historical,
                    });
                    plan.to_insert.push(snapshot.clone());
                    plan.summary.sealed += 1;
                    plan.summary.inserted += 1;
                }
                (
                    Decision::ArrivedAtDock(patch)
                    | Decision::LeftDock(patch)
                    | Decision::FieldsChanged(patch),
                    Some(trip),
                ) => {
                    plan.to_patch.push(TripUpdate {
                        active_trip_id: trip.id,
                        vessel_id: trip.vessel_id(),
                        patch,
                    });
                    plan.summary.patched += 1;
                }
                // decide() only returns trip-bound decisions when a trip exists.
                (_, None) => plan.summary.unchanged += 1,
            }
        }

        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Terminal, TimeMs};

    const T0: i64 = 1_755_620_000_000;
    const MIN: i64 = 60_000;

    fn snap(vessel: i64, departing: i64, at_dock: bool, ts: i64) -> VesselSnapshot {
        let mut s = VesselSnapshot::new(
            VesselId::new(vessel),
            "Kennewick",
            Terminal::new(departing, format!("Terminal {}", departing), None),
            TimeMs::new(ts),
        );
        s.at_dock = at_dock;
        s
    }

    fn active(id: i64, state: VesselSnapshot) -> ActiveTrip {
        ActiveTrip {
            id: ActiveTripId::new(id),
            created_at: state.timestamp,
            state,
        }
    }

    #[test]
    fn test_no_active_trip_is_new_vessel() {
        let r = Reconciler::default();
        assert_eq!(r.decide(&snap(1, 1, true, T0), None), Decision::NewVessel);
    }

    #[test]
    fn test_older_than_last_seen_is_stale() {
        let r = Reconciler::default();
        let mut trip = active(1, snap(1, 1, true, T0));
        trip.state.timestamp = TimeMs::new(T0 + 5 * MIN);
        // Would otherwise be a new journey.
        let s = snap(1, 2, true, T0 + MIN);
        assert_eq!(r.decide(&s, Some(&trip)), Decision::Stale);
    }

    #[test]
    fn test_older_than_creation_is_stale() {
        let r = Reconciler::default();
        let mut trip = active(1, snap(1, 1, true, T0 + 10 * MIN));
        trip.state.timestamp = TimeMs::new(T0);
        let s = snap(1, 1, false, T0 + 5 * MIN);
        assert_eq!(r.decide(&s, Some(&trip)), Decision::Stale);
    }

    #[test]
    fn test_equal_timestamp_is_not_stale() {
        let r = Reconciler::default();
        let trip = active(1, snap(1, 1, true, T0));
        assert_eq!(r.decide(&snap(1, 1, true, T0), Some(&trip)), Decision::Unchanged);
    }

    #[test]
    fn test_docking_on_same_departure_is_arrival() {
        let r = Reconciler::default();
        let trip = active(1, snap(1, 1, false, T0));
        let s = snap(1, 1, true, T0 + 30 * MIN);

        match r.decide(&s, Some(&trip)) {
            Decision::ArrivedAtDock(patch) => {
                assert_eq!(patch.at_dock, Some(true));
                assert_eq!(patch.actual_arrival, Some(TimeMs::new(T0 + 30 * MIN)));
                assert_eq!(patch.timestamp, Some(TimeMs::new(T0 + 30 * MIN)));
            }
            other => panic!("expected ArrivedAtDock, got {:?}", other),
        }
    }

    #[test]
    fn test_docked_at_new_terminal_is_new_journey() {
        let r = Reconciler::default();
        let mut prev = snap(1, 1, true, T0);
        prev.actual_arrival = Some(TimeMs::new(T0 + 40 * MIN));
        let trip = active(9, prev);
        let s = snap(1, 2, true, T0 + 45 * MIN);

        match r.decide(&s, Some(&trip)) {
            Decision::NewJourney(historical) => {
                assert_eq!(historical.active_trip_id, ActiveTripId::new(9));
                assert_eq!(historical.state.departing_terminal.id.as_i64(), 1);
                assert_eq!(historical.trip_end, TimeMs::new(T0 + 40 * MIN));
                assert_eq!(historical.durations.total_duration, 45.0);
            }
            other => panic!("expected NewJourney, got {:?}", other),
        }
    }

    #[test]
    fn test_arrival_at_new_terminal_seals_instead_of_patching() {
        let r = Reconciler::default();
        // Underway from 1, next seen docked at 2: the departure changed, so
        // this is a journey boundary rather than an arrival.
        let trip = active(1, snap(1, 1, false, T0));
        let s = snap(1, 2, true, T0 + 30 * MIN);
        assert!(matches!(r.decide(&s, Some(&trip)), Decision::NewJourney(_)));
    }

    #[test]
    fn test_seal_without_arrival_ends_at_sealing_snapshot() {
        let r = Reconciler::default();
        let trip = active(1, snap(1, 1, true, T0));
        let s = snap(1, 2, true, T0 + 20 * MIN);
        let historical = r.seal(&trip, &s);
        assert_eq!(historical.trip_end, TimeMs::new(T0 + 20 * MIN));
    }

    #[test]
    fn test_undocking_is_left_dock() {
        let r = Reconciler::default();
        let trip = active(1, snap(1, 1, true, T0));
        let s = snap(1, 1, false, T0 + 12 * MIN);

        match r.decide(&s, Some(&trip)) {
            Decision::LeftDock(patch) => {
                assert_eq!(patch.at_dock, Some(false));
                assert_eq!(patch.actual_left_dock, Some(TimeMs::new(T0 + 12 * MIN)));
            }
            other => panic!("expected LeftDock, got {:?}", other),
        }
    }

    #[test]
    fn test_underway_with_new_departure_is_field_change() {
        let r = Reconciler::default();
        let trip = active(1, snap(1, 1, false, T0));
        let s = snap(1, 2, false, T0 + MIN);

        match r.decide(&s, Some(&trip)) {
            Decision::FieldsChanged(patch) => {
                assert_eq!(patch.departing_terminal.unwrap().id.as_i64(), 2);
            }
            other => panic!("expected FieldsChanged, got {:?}", other),
        }
    }

    #[test]
    fn test_route_change_is_field_change() {
        let r = Reconciler::default();
        let trip = active(1, snap(1, 1, true, T0));
        let mut s = snap(1, 1, true, T0 + MIN);
        s.route_abbrev = Some("sea-bi".to_string());

        match r.decide(&s, Some(&trip)) {
            Decision::FieldsChanged(patch) => {
                assert_eq!(patch.route_abbrev.as_deref(), Some("sea-bi"));
                assert!(patch.at_dock.is_none());
            }
            other => panic!("expected FieldsChanged, got {:?}", other),
        }
    }

    #[test]
    fn test_reconcile_partitions_outcomes() {
        let r = Reconciler::default();
        let mut lookup = HashMap::new();
        lookup.insert(VesselId::new(2), active(20, snap(2, 1, true, T0)));
        lookup.insert(VesselId::new(3), active(30, snap(3, 1, true, T0)));
        lookup.insert(VesselId::new(4), active(40, snap(4, 1, true, T0)));
        lookup.insert(VesselId::new(5), active(50, snap(5, 1, true, T0 + 10 * MIN)));

        let snapshots = vec![
            snap(1, 1, true, T0 + MIN),
            snap(2, 1, false, T0 + MIN),
            snap(3, 7, true, T0 + MIN),
            snap(4, 1, true, T0 + MIN),
            snap(5, 1, false, T0 + MIN),
        ];
        let plan = r.reconcile(&snapshots, &lookup);

        assert_eq!(
            plan.summary,
            TickSummary {
                inserted: 2,
                patched: 1,
                sealed: 1,
                unchanged: 1,
                stale: 1,
            }
        );
        let inserted: Vec<i64> = plan.to_insert.iter().map(|s| s.vessel_id.as_i64()).collect();
        assert_eq!(inserted, vec![1, 3]);
        assert_eq!(plan.to_patch[0].active_trip_id, ActiveTripId::new(20));
        assert_eq!(plan.to_seal[0].active_trip_id, ActiveTripId::new(30));
    }

    #[test]
    fn test_absent_vessel_is_left_untouched() {
        let r = Reconciler::default();
        let mut lookup = HashMap::new();
        lookup.insert(VesselId::new(2), active(20, snap(2, 1, false, T0)));

        let plan = r.reconcile(&[], &lookup);
        assert!(plan.is_empty());
        assert_eq!(plan.summary, TickSummary::default());
    }

    #[test]
    fn test_duplicate_roster_entries_keep_newest() {
        let snapshots = vec![
            snap(1, 1, true, T0 + 2 * MIN),
            snap(2, 1, true, T0),
            snap(1, 1, false, T0 + 5 * MIN),
            snap(1, 1, true, T0 + 3 * MIN),
        ];
        let (kept, dropped) = latest_per_vessel(&snapshots);
        assert_eq!(dropped, 2);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].vessel_id, VesselId::new(1));
        assert_eq!(kept[0].timestamp, TimeMs::new(T0 + 5 * MIN));
        assert_eq!(kept[1].vessel_id, VesselId::new(2));
    }

    #[test]
    fn test_duplicate_new_vessel_inserts_once() {
        let r = Reconciler::default();
        let snapshots = vec![snap(1, 1, true, T0), snap(1, 1, true, T0 + MIN)];
        let plan = r.reconcile(&snapshots, &HashMap::new());
        assert_eq!(plan.to_insert.len(), 1);
        assert_eq!(plan.to_insert[0].timestamp, TimeMs::new(T0 + MIN));
        assert_eq!(plan.summary.stale, 1);
    }
}
