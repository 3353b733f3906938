//! Domain primitives: TimeMs, VesselId, TerminalId.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Time in milliseconds since Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeMs(pub i64);

impl TimeMs {
    /// Create a TimeMs from milliseconds.
    pub fn new(ms: i64) -> Self {
        TimeMs(ms)
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        TimeMs(Utc::now().timestamp_millis())
    }

    /// Get the underlying milliseconds value.
    pub fn as_ms(&self) -> i64 {
        self.0
    }

    /// Convert to a UTC datetime, if the value is in chrono's representable range.
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.0).single()
    }

    /// Milliseconds elapsed from `earlier` to `self` (negative if `earlier` is later).
    pub fn millis_since(&self, earlier: TimeMs) -> i64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl std::fmt::Display for TimeMs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Feed-assigned vessel identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VesselId(pub i64);

impl VesselId {
    pub fn new(id: i64) -> Self {
        VesselId(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for VesselId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Feed-assigned terminal identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TerminalId(pub i64);

impl TerminalId {
    pub fn new(id: i64) -> Self {
        TerminalId(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for TerminalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Store-assigned identity of an active trip row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActiveTripId(pub i64);

impl ActiveTripId {
    pub fn new(id: i64) -> Self {
        ActiveTripId(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for ActiveTripId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
