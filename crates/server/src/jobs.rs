use std::sync::Arc;
use std::time::Duration;

use namewatch_core::{CacheDb, Error};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::admission::RateLimitState;

const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepOutcome {
    pub entries_removed: u64,
    pub entries_remaining: u64,
    pub clients_tracked: usize,
}

/// Deletes expired cache rows and forgets idle rate-limit buckets.
pub struct ExpirySweepJob {
    store: CacheDb,
    admission: RateLimitState,
    interval: Duration,
    shutdown: CancellationToken,
}

impl ExpirySweepJob {
    pub fn new(store: CacheDb, admission: RateLimitState) -> Self {
        Self {
            store,
            admission,
            interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub async fn run_cycle(&self) -> Result<SweepOutcome, Error> {
        let entries_removed = self.store.purge_expired().await?;
        let entries_remaining = self.store.count_names().await?;
        let clients_tracked = self.admission.prune();
        Ok(SweepOutcome { entries_removed, entries_remaining, clients_tracked })
    }

    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        info!(interval_secs = self.interval.as_secs(), "Starting expiry sweep job");

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("ExpirySweepJob: shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        match self.run_cycle().await {
                            Ok(outcome) => {
                                if outcome.entries_removed > 0 {
                                    info!(
                                        entries_removed = outcome.entries_removed,
                                        entries_remaining = outcome.entries_remaining,
                                        clients_tracked = outcome.clients_tracked,
                                        "Expiry sweep completed"
                                    );
                                }
                            }
                            Err(e) => {
                                error!(error = %e, "Expiry sweep failed");
                            }
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use namewatch_core::{CacheEntry, ResolvedRecord};

    fn entry(name: &str, expires_in: ChronoDuration) -> CacheEntry {
        let record = ResolvedRecord { search_count: "1".into(), availability_time: None };
        CacheEntry::from_record(name, &record, Utc::now(), expires_in)
    }

    #[tokio::test]
    async fn test_run_cycle_purges_expired_only() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_name(&entry("old", ChronoDuration::seconds(-5))).await.unwrap();
        db.put_name(&entry("fresh", ChronoDuration::minutes(30))).await.unwrap();

        let job = ExpirySweepJob::new(db.clone(), RateLimitState::new(10, Duration::from_secs(60)));
        let outcome = job.run_cycle().await.unwrap();

        assert_eq!(outcome.entries_removed, 1);
        assert_eq!(outcome.entries_remaining, 1);
        assert_eq!(db.count_names().await.unwrap(), 1);
        assert!(db.get_name("fresh").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_job_stops_on_cancel() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let token = CancellationToken::new();
        let job = Arc::new(
            ExpirySweepJob::new(db, RateLimitState::new(10, Duration::from_secs(60)))
                .with_interval(Duration::from_millis(10))
                .with_cancellation(token.clone()),
        );

        let handle = job.start();
        tokio::time::sleep(Duration::from_millis(30)).await;
        token.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweep job did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_sweep_purges_in_background() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_name(&entry("old", ChronoDuration::seconds(-1))).await.unwrap();

        let token = CancellationToken::new();
        let job = Arc::new(
            ExpirySweepJob::new(db.clone(), RateLimitState::new(10, Duration::from_secs(60)))
                .with_interval(Duration::from_millis(10))
                .with_cancellation(token.clone()),
        );
        let handle = job.start();

        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();
        handle.await.unwrap();

        assert_eq!(db.count_names().await.unwrap(), 0);
    }
}
