use crate::config::Config;
use crate::datasource::{DataSourceError, SnapshotSource};
use crate::db::repo::SealReport;
use crate::db::Repository;
use crate::domain::ActiveTripId;
use crate::engine::{Reconciler, TickSummary};
use backoff::future::retry;
use backoff::ExponentialBackoff;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Drives one fetch-reconcile-apply pass per tick.
#[derive(Clone)]
pub struct TickOrchestrator {
    source: Arc<dyn SnapshotSource>,
    repo: Arc<Repository>,
    reconciler: Reconciler,
    tick_interval: Duration,
    write_retry_budget: Duration,
}

/// What one tick did to the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub fetched: usize,
    pub summary: TickSummary,
    pub inserted: usize,
    pub patched: usize,
    pub sealed: usize,
    pub duplicate_keys: usize,
    pub seals_skipped: Vec<ActiveTripId>,
}

#[derive(Debug, Error)]
pub enum TickError {
    #[error(transparent)]
    DataSource(#[from] DataSourceError),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// Lock contention and connection trouble are worth retrying; constraint
/// violations and malformed queries are not.
fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => true,
        sqlx::Error::Database(db) => {
            let msg = db.message();
            msg.contains("locked") || msg.contains("busy")
        }
        _ => false,
    }
}

impl TickOrchestrator {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        repo: Arc<Repository>,
        reconciler: Reconciler,
        tick_interval: Duration,
        write_retry_budget: Duration,
    ) -> Self {
        Self {
            source,
            repo,
            reconciler,
            tick_interval,
            write_retry_budget,
        }
    }

    pub fn from_config(
        source: Arc<dyn SnapshotSource>,
        repo: Arc<Repository>,
        config: &Config,
    ) -> Self {
        Self::new(
            source,
            repo,
            Reconciler::new(config.fleet_timezone),
            config.tick_interval,
            config.retry_max_elapsed,
        )
    }

    async fn with_retry<T, F, Fut>(&self, op: &'static str, mut f: F) -> Result<T, sqlx::Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(self.write_retry_budget),
            ..Default::default()
        };

        retry(backoff, || {
            let attempt = f();
            async move {
                attempt.await.map_err(|e| {
                    if is_transient(&e) {
                        debug!(op, error = %e, "Transient store error, retrying");
                        backoff::Error::transient(e)
                    } else {
                        backoff::Error::permanent(e)
                    }
                })
            }
        })
        .await
    }

    /// Run one tick to completion.
    ///
    /// Seals are applied before inserts so a vessel's old trip is archived
    /// before its replacement exists; patches go last.
    pub async fn run_tick(&self) -> Result<TickReport, TickError> {
        let (snapshots, active) = futures::try_join!(
            async { Ok::<_, TickError>(self.source.fetch_snapshots().await?) },
            async {
                Ok::<_, TickError>(
                    self.with_retry("load_active", || self.repo.load_active_trips())
                        .await?,
                )
            },
        )?;

        let plan = self.reconciler.reconcile(&snapshots, &active);

        let SealReport {
            sealed,
            duplicate_keys,
            skipped,
        } = self
            .with_retry("seal", || self.repo.seal_active_trips(&plan.to_seal))
            .await?;
        for id in &skipped {
            warn!(active_trip_id = %id, "Seal target vanished before it could be archived; skipped");
        }

        let inserted = self
            .with_retry("insert", || self.repo.insert_active_trips(&plan.to_insert))
            .await?;
        let patched = self
            .with_retry("patch", || self.repo.patch_active_trips(&plan.to_patch))
            .await?;

        Ok(TickReport {
            fetched: snapshots.len(),
            summary: plan.summary,
            inserted,
            patched,
            sealed,
            duplicate_keys,
            seals_skipped: skipped,
        })
    }

    /// Tick on a fixed interval until `shutdown` resolves.
    ///
    /// Each tick runs to completion before the next one starts. A failed
    /// tick is logged and the next one re-derives everything from the store.
    pub async fn run<S>(&self, shutdown: S)
    where
        S: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(interval_ms = self.tick_interval.as_millis() as u64, "Tick loop started");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Tick loop stopping");
                    break;
                }
                _ = ticker.tick() => {
                    match self.run_tick().await {
                        Ok(report) => info!(
                            fetched = report.fetched,
                            inserted = report.summary.inserted,
                            patched = report.summary.patched,
                            sealed = report.summary.sealed,
                            unchanged = report.summary.unchanged,
                            stale = report.summary.stale,
                            seals_skipped = report.seals_skipped.len(),
                            "Tick applied"
                        ),
                        Err(e) => warn!(error = %e, "Tick failed"),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::MockSnapshotSource;
    use crate::db::migrations::init_db;
    use crate::domain::{Terminal, TimeMs, VesselId, VesselSnapshot};
    use tempfile::TempDir;

    const T0: i64 = 1_755_620_000_000;
    const MIN: i64 = 60_000;

    async fn setup_repo() -> (Arc<Repository>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Arc::new(Repository::new(pool)), temp_dir)
    }

    fn orchestrator(source: MockSnapshotSource, repo: Arc<Repository>) -> TickOrchestrator {
        TickOrchestrator::new(
            Arc::new(source),
            repo,
            Reconciler::default(),
            Duration::from_millis(10),
            Duration::from_millis(200),
        )
    }

    fn snap(departing: i64, at_dock: bool, ts: i64) -> VesselSnapshot {
        let mut s = VesselSnapshot::new(
            VesselId::new(1),
            "Kennewick",
            Terminal::new(departing, "Terminal", None),
            TimeMs::new(ts),
        );
        s.vessel_abbrev = Some("KEN".to_string());
        s.at_dock = at_dock;
        s
    }

    #[tokio::test]
    async fn test_first_tick_inserts() {
        let (repo, _temp) = setup_repo().await;
        let source = MockSnapshotSource::new().with_tick(vec![snap(1, true, T0)]);
        let report = orchestrator(source, repo.clone()).run_tick().await.unwrap();

        assert_eq!(report.fetched, 1);
        assert_eq!(report.inserted, 1);
        assert_eq!(repo.load_active_trips().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_new_journey_seals_then_inserts() {
        let (repo, _temp) = setup_repo().await;
        let source = MockSnapshotSource::new()
            .with_tick(vec![snap(1, true, T0)])
            .with_tick(vec![snap(2, true, T0 + 45 * MIN)]);
        let orch = orchestrator(source, repo.clone());

        orch.run_tick().await.unwrap();
        let report = orch.run_tick().await.unwrap();

        assert_eq!(report.sealed, 1);
        assert_eq!(report.inserted, 1);
        let active = repo.load_active_trips().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(
            active[&VesselId::new(1)].state.departing_terminal.id.as_i64(),
            2
        );
        assert_eq!(repo.count_historical_trips().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_store_untouched() {
        let (repo, _temp) = setup_repo().await;
        let source = MockSnapshotSource::new().with_failure(DataSourceError::RateLimited);
        let result = orchestrator(source, repo.clone()).run_tick().await;

        assert!(matches!(result, Err(TickError::DataSource(_))));
        assert!(repo.load_active_trips().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (repo, _temp) = setup_repo().await;
        let source = MockSnapshotSource::new().with_tick(vec![snap(1, true, T0)]);
        let orch = orchestrator(source, repo.clone());

        orch.run(tokio::time::sleep(Duration::from_millis(50))).await;
        assert_eq!(repo.load_active_trips().await.unwrap().len(), 1);
    }
}
