//! Domain types for the ferry trip ledger.
//!
//! This module provides:
//! - Domain primitives: TimeMs, VesselId, TerminalId, ActiveTripId
//! - VesselSnapshot and Terminal as reported by the feed
//! - ActiveTrip, HistoricalTrip and TripPatch as held by the trip store

pub mod primitives;
pub mod snapshot;
pub mod trip;

pub use primitives::{ActiveTripId, TerminalId, TimeMs, VesselId};
pub use snapshot::{Terminal, VesselSnapshot};
pub use trip::{ActiveTrip, HistoricalTrip, TripDurations, TripPatch};
