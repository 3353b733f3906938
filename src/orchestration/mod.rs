//! Tick orchestration: fetch the roster, reconcile, apply to the trip store.

pub mod orchestrator;

pub use orchestrator::{TickError, TickOrchestrator, TickReport};
