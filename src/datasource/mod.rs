//! Snapshot source abstraction for fetching the fleet's current vessel roster.

use crate::domain::VesselSnapshot;
use async_trait::async_trait;
use std::fmt;

pub mod mock;
pub mod wsf;

pub use mock::MockSnapshotSource;
pub use wsf::WsfDataSource;

/// Pull-based source of vessel snapshots.
///
/// Each call returns the full current roster, one record per vessel the feed
/// knows about. Implementations handle their own retry/backoff and must drop
/// records that lack a vessel identity.
#[async_trait]
pub trait SnapshotSource: Send + Sync + fmt::Debug {
    async fn fetch_snapshots(&self) -> Result<Vec<VesselSnapshot>, DataSourceError>;
}

/// Error type for data source operations.
#[derive(Debug, Clone)]
pub enum DataSourceError {
    /// Network error (e.g., connection timeout, DNS failure)
    NetworkError(String),
    /// HTTP error (e.g., 5xx server error)
    HttpError { status: u16, message: String },
    /// Parsing error (invalid JSON or malformed response)
    ParseError(String),
    /// Rate limit exceeded
    RateLimited,
    /// Other error
    Other(String),
}

impl fmt::Display for DataSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            DataSourceError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            DataSourceError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            DataSourceError::RateLimited => write!(f, "Rate limited"),
            DataSourceError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for DataSourceError {}
