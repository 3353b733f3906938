//! Duration metrics for sealed trips.

use crate::domain::{ActiveTrip, TimeMs, TripDurations};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

const MS_PER_MINUTE: i64 = 60_000;

/// Minutes from `start` to `end`, rounded half-up to one decimal place.
///
/// Negative intervals clamp to zero.
pub fn minutes_between(start: TimeMs, end: TimeMs) -> f64 {
    let ms = end.millis_since(start).max(0);
    (Decimal::from(ms) / Decimal::from(MS_PER_MINUTE))
        .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or(0.0)
}

fn minutes_between_opt(start: Option<TimeMs>, end: Option<TimeMs>) -> f64 {
    match (start, end) {
        (Some(start), Some(end)) => minutes_between(start, end),
        _ => 0.0,
    }
}

/// Derive the four duration metrics of `prev`, measured up to `end`.
///
/// Any metric whose input timestamp is missing is 0.
pub fn derive_durations(prev: &ActiveTrip, end: TimeMs) -> TripDurations {
    let state = &prev.state;
    TripDurations {
        left_dock_delay: minutes_between_opt(state.scheduled_departure, state.actual_left_dock),
        at_dock_duration: minutes_between_opt(Some(prev.created_at), state.actual_left_dock),
        total_duration: minutes_between(prev.created_at, end),
        at_sea_duration: minutes_between_opt(state.actual_left_dock, Some(end)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ActiveTripId, Terminal, VesselId, VesselSnapshot};

    const T0: i64 = 1_755_620_000_000;

    fn minutes(m: i64) -> TimeMs {
        TimeMs::new(T0 + m * MS_PER_MINUTE)
    }

    fn trip(scheduled: Option<TimeMs>, left: Option<TimeMs>) -> ActiveTrip {
        let mut state = VesselSnapshot::new(
            VesselId::new(1),
            "Kennewick",
            Terminal::new(1, "Port Townsend", Some("POT")),
            TimeMs::new(T0),
        );
        state.scheduled_departure = scheduled;
        state.actual_left_dock = left;
        ActiveTrip {
            id: ActiveTripId::new(1),
            created_at: TimeMs::new(T0),
            state,
        }
    }

    #[test]
    fn test_durations_worked_example() {
        let prev = trip(Some(minutes(5)), Some(minutes(12)));
        let d = derive_durations(&prev, minutes(47));

        assert_eq!(d.left_dock_delay, 7.0);
        assert_eq!(d.at_dock_duration, 12.0);
        assert_eq!(d.total_duration, 47.0);
        assert_eq!(d.at_sea_duration, 35.0);
    }

    #[test]
    fn test_missing_left_dock_zeroes_dependent_metrics() {
        let prev = trip(Some(minutes(5)), None);
        let d = derive_durations(&prev, minutes(30));

        assert_eq!(d.left_dock_delay, 0.0);
        assert_eq!(d.at_dock_duration, 0.0);
        assert_eq!(d.at_sea_duration, 0.0);
        assert_eq!(d.total_duration, 30.0);
    }

    #[test]
    fn test_missing_schedule_zeroes_delay_only() {
        let prev = trip(None, Some(minutes(4)));
        let d = derive_durations(&prev, minutes(20));

        assert_eq!(d.left_dock_delay, 0.0);
        assert_eq!(d.at_dock_duration, 4.0);
        assert_eq!(d.at_sea_duration, 16.0);
    }

    #[test]
    fn test_rounding_is_half_up_at_one_decimal() {
        let start = TimeMs::new(T0);
        // 3s = 0.05 min
        assert_eq!(minutes_between(start, TimeMs::new(T0 + 3_000)), 0.1);
        assert_eq!(minutes_between(start, TimeMs::new(T0 + 2_999)), 0.0);
        // 9s = 0.15 min
        assert_eq!(minutes_between(start, TimeMs::new(T0 + 9_000)), 0.2);
        // 90s = 1.5 min
        assert_eq!(minutes_between(start, TimeMs::new(T0 + 90_000)), 1.5);
    }

    #[test]
    fn test_early_departure_clamps_to_zero() {
        let prev = trip(Some(minutes(10)), Some(minutes(8)));
        let d = derive_durations(&prev, minutes(40));
        assert_eq!(d.left_dock_delay, 0.0);
        assert_eq!(d.at_dock_duration, 8.0);
    }
}
