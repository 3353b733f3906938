//! Pure computation for trip lifecycle reconciliation.

pub mod diff;
pub mod durations;
pub mod reconcile;
pub mod trip_key;

pub use diff::watched_changes;
pub use durations::{derive_durations, minutes_between};
pub use reconcile::{
    latest_per_vessel, Decision, Reconciler, SealedTrip, TickPlan, TickSummary, TripUpdate,
};
pub use trip_key::{format_trip_key, trip_key};
