//! Mock snapshot source for testing without network calls.

use super::{DataSourceError, SnapshotSource};
use crate::domain::VesselSnapshot;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Mock source that replays scripted rosters, one per fetch.
///
/// Once the script is exhausted the last roster is repeated.
#[derive(Debug, Default)]
pub struct MockSnapshotSource {
    script: Mutex<VecDeque<Result<Vec<VesselSnapshot>, DataSourceError>>>,
    last: Mutex<Vec<VesselSnapshot>>,
}

impl MockSnapshotSource {
    /// Create a new mock source with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a roster for the next fetch.
    pub fn with_tick(self, roster: Vec<VesselSnapshot>) -> Self {
        self.push_tick(roster);
        self
    }

    /// Queue a failed fetch.
    pub fn with_failure(self, error: DataSourceError) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Err(error));
        }
        self
    }

    /// Queue a roster on a shared source.
    pub fn push_tick(&self, roster: Vec<VesselSnapshot>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Ok(roster));
        }
    }
}

#[async_trait]
impl SnapshotSource for MockSnapshotSource {
    async fn fetch_snapshots(&self) -> Result<Vec<VesselSnapshot>, DataSourceError> {
        let next = self
            .script
            .lock()
            .map_err(|_| DataSourceError::Other("mock script poisoned".to_string()))?
            .pop_front();

        let mut last = self
            .last
            .lock()
            .map_err(|_| DataSourceError::Other("mock roster poisoned".to_string()))?;

        match next {
            Some(Ok(roster)) => {
                *last = roster.clone();
                Ok(roster)
            }
            Some(Err(e)) => Err(e),
            None => Ok(last.clone()),
        }
    }
}
