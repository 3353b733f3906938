//! SQLite trip store.
//!
//! `init_db` opens the pool and applies the schema; `Repository` holds the
//! active trip set and the historical archive.

pub mod migrations;
pub mod repo;

pub use migrations::init_db;
pub use repo::Repository;
