//! Change detection over the watch-set of trip fields.
//!
//! Watched: departing/arriving terminal identity, scheduled departure,
//! left-dock estimate, ETA, in-service, at-dock, route code and position in
//! sequence. A field the snapshot leaves undefined is never a change.

use crate::domain::{TripPatch, VesselSnapshot};

fn changed<T: PartialEq + Clone>(stored: &Option<T>, incoming: &Option<T>) -> Option<T> {
    match incoming {
        Some(value) if stored.as_ref() != Some(value) => Some(value.clone()),
        _ => None,
    }
}

fn flipped(stored: bool, incoming: bool) -> Option<bool> {
    (stored != incoming).then_some(incoming)
}

/// Build the patch that overlays `incoming`'s watched fields onto `stored`.
///
/// Returns `None` when nothing in the watch-set differs. A non-empty patch
/// also refreshes the record timestamp.
pub fn watched_changes(stored: &VesselSnapshot, incoming: &VesselSnapshot) -> Option<TripPatch> {
    let departing_terminal = (stored.departing_terminal.id != incoming.departing_terminal.id)
        .then(|| incoming.departing_terminal.clone());

    let arriving_terminal = match (&stored.arriving_terminal, &incoming.arriving_terminal) {
        (Some(old), Some(new)) if old.id == new.id => None,
        (_, new) => new.clone(),
    };

    let patch = TripPatch {
        departing_terminal,
        arriving_terminal,
        in_service: flipped(stored.in_service, incoming.in_service),
        at_dock: flipped(stored.at_dock, incoming.at_dock),
        scheduled_departure: changed(&stored.scheduled_departure, &incoming.scheduled_departure),
        left_dock: changed(&stored.left_dock, &incoming.left_dock),
        eta: changed(&stored.eta, &incoming.eta),
        route_abbrev: changed(&stored.route_abbrev, &incoming.route_abbrev),
        position_num: changed(&stored.position_num, &incoming.position_num),
        ..Default::default()
    };

    if patch.is_empty() {
        return None;
    }

    Some(TripPatch {
        timestamp: Some(incoming.timestamp),
        ..patch
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Terminal, TimeMs, VesselId};

    fn base() -> VesselSnapshot {
        let mut s = VesselSnapshot::new(
            VesselId::new(1),
            "Kennewick",
            Terminal::new(1, "Port Townsend", Some("POT")),
            TimeMs::new(1_000),
        );
        s.arriving_terminal = Some(Terminal::new(2, "Coupeville", Some("KEY")));
        s.eta = Some(TimeMs::new(5_000));
        s.route_abbrev = Some("pt-key".to_string());
        s
    }

    #[test]
    fn test_identical_except_timestamp_is_unchanged() {
        let stored = base();
        let mut incoming = base();
        incoming.timestamp = TimeMs::new(9_000);
        assert!(watched_changes(&stored, &incoming).is_none());
    }

    #[test]
    fn test_eta_change_produces_patch_with_timestamp() {
        let stored = base();
        let mut incoming = base();
        incoming.eta = Some(TimeMs::new(6_000));
        incoming.timestamp = TimeMs::new(2_000);

        let patch = watched_changes(&stored, &incoming).unwrap();
        assert_eq!(patch.eta, Some(TimeMs::new(6_000)));
        assert_eq!(patch.timestamp, Some(TimeMs::new(2_000)));
        assert!(patch.route_abbrev.is_none());
        assert!(patch.departing_terminal.is_none());
    }

    #[test]
    fn test_undefined_incoming_fields_are_not_changes() {
        let stored = base();
        let mut incoming = base();
        incoming.eta = None;
        incoming.arriving_terminal = None;
        incoming.route_abbrev = None;
        assert!(watched_changes(&stored, &incoming).is_none());
    }

    #[test]
    fn test_terminal_compared_by_identity() {
        let stored = base();
        let mut incoming = base();
        incoming.departing_terminal.name = "Port Townsend Terminal".to_string();
        assert!(watched_changes(&stored, &incoming).is_none());

        incoming.arriving_terminal = Some(Terminal::new(3, "Bainbridge", None));
        let patch = watched_changes(&stored, &incoming).unwrap();
        assert_eq!(patch.arriving_terminal.unwrap().id.as_i64(), 3);
    }

    #[test]
    fn test_flags_are_always_compared() {
        let stored = base();
        let mut incoming = base();
        incoming.in_service = false;
        let patch = watched_changes(&stored, &incoming).unwrap();
        assert_eq!(patch.in_service, Some(false));
    }

    #[test]
    fn test_unwatched_fields_are_ignored() {
        let stored = base();
        let mut incoming = base();
        incoming.vessel_name = "Renamed".to_string();
        incoming.actual_arrival = Some(TimeMs::new(4_000));
        assert!(watched_changes(&stored, &incoming).is_none());
    }
}
