pub mod api;
pub mod config;
pub mod datasource;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;

pub use config::Config;
pub use datasource::{DataSourceError, MockSnapshotSource, SnapshotSource, WsfDataSource};
pub use db::{init_db, Repository};
pub use domain::{
    ActiveTrip, ActiveTripId, HistoricalTrip, Terminal, TerminalId, TimeMs, TripDurations,
    TripPatch, VesselId, VesselSnapshot,
};
pub use engine::{Decision, Reconciler, TickPlan, TickSummary};
pub use error::AppError;
pub use orchestration::{TickError, TickOrchestrator, TickReport};
