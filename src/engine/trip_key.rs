//! Historical trip key derivation.
//!
//! A key is `CODE-YYYY-MM-DD-hh:mm` in fleet-local time. Two trips of one
//! vessel departing in the same scheduled minute share a key.

use crate::domain::{ActiveTrip, TimeMs};
use chrono_tz::Tz;

/// Format `short_code` and `at` as a trip key in `tz`.
///
/// Returns `None` if `at` is outside chrono's representable range.
pub fn format_trip_key(short_code: &str, at: TimeMs, tz: Tz) -> Option<String> {
    let local = at.to_utc()?.with_timezone(&tz);
    Some(format!("{}-{}", short_code, local.format("%Y-%m-%d-%H:%M")))
}

/// Key of a trip being sealed: scheduled departure when known, otherwise the
/// trip's last observed record timestamp.
pub fn trip_key(trip: &ActiveTrip, tz: Tz) -> String {
    let at = trip
        .state
        .scheduled_departure
        .unwrap_or(trip.state.timestamp);
    let code = trip.state.short_code();
    format_trip_key(&code, at, tz)
        .unwrap_or_else(|| format!("{}-{}", code, at.as_ms()))
}
