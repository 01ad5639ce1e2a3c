//! Cache-aside lookup with per-name single-flight.
//!
//! On a miss the first caller registers an in-flight slot and spawns the
//! resolution on its own task; every caller for that name, the first one
//! included, then waits on the slot. Resolution therefore survives any
//! individual caller going away, and the store is written at most once per
//! episode.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use namewatch_client::NameResolver;
use namewatch_core::{CacheEntry, DEFAULT_CACHE_TTL_SECS, Error, NameStore, ResolvedRecord, normalize_name};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::response::LookupResult;

type Outcome = Result<ResolvedRecord, Error>;

type InflightSender = Arc<watch::Sender<Option<Outcome>>>;

type InflightMap = Arc<DashMap<String, InflightSender>>;

/// Owned by the resolution task; guarantees waiters are released even if the
/// task unwinds before publishing.
struct InflightLeaderGuard {
    inflight: InflightMap,
    name: String,
    tx: InflightSender,
}

impl InflightLeaderGuard {
    /// Retire the slot, then hand the outcome to every waiter.
    fn publish(&self, outcome: Outcome) {
        self.inflight.remove_if(&self.name, |_, tx| Arc::ptr_eq(tx, &self.tx));
        self.tx.send_replace(Some(outcome));
    }
}

impl Drop for InflightLeaderGuard {
    fn drop(&mut self) {
        let pending = self.tx.borrow().is_none();
        if pending {
            self.publish(Err(Error::Internal(format!("resolution of {} ended without an outcome", self.name))));
        }
    }
}

/// The lookup orchestrator.
pub struct Lookup {
    store: Arc<dyn NameStore>,
    resolver: Arc<dyn NameResolver>,
    cache_ttl: chrono::Duration,
    inflight: InflightMap,
}

impl Lookup {
    pub fn new(store: Arc<dyn NameStore>, resolver: Arc<dyn NameResolver>, cache_ttl: Duration) -> Self {
        let cache_ttl = chrono::Duration::from_std(cache_ttl).unwrap_or_else(|_| {
            warn!(ttl_secs = cache_ttl.as_secs(), "cache ttl out of range, using default");
            chrono::Duration::seconds(DEFAULT_CACHE_TTL_SECS as i64)
        });
        Self { store, resolver, cache_ttl, inflight: Arc::new(DashMap::new()) }
    }

    /// Answer a lookup from the cache, resolving externally on a miss.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a blank name, `StoreUnavailable` if the store
    /// cannot be read or written, or whatever the shared resolution failed with.
    pub async fn lookup(&self, raw_name: &str) -> Result<LookupResult, Error> {
        let name = normalize_name(raw_name);
        if name.is_empty() {
            return Err(Error::InvalidInput("name must not be empty".into()));
        }

        if let Some(entry) = self.store.get(&name).await? {
            debug!(name = %name, "cache hit");
            return Ok(LookupResult::from_entry(&entry));
        }

        debug!(name = %name, "cache miss");
        let record = self.resolve_shared(&name).await?;
        Ok(LookupResult::shape(&name, &record))
    }

    /// Number of names with a resolution currently in flight.
    #[cfg(test)]
    pub fn inflight_len(&self) -> usize {
        self.inflight.len()
    }

    fn register_or_join(&self, name: &str) -> (Option<InflightSender>, watch::Receiver<Option<Outcome>>) {
        match self.inflight.entry(name.to_string()) {
            dashmap::Entry::Occupied(e) => {
                let rx = e.get().subscribe();
                drop(e);
                debug!(name, "joining in-flight resolution");
                (None, rx)
            }
            dashmap::Entry::Vacant(e) => {
                let (tx, rx) = watch::channel(None::<Outcome>);
                let tx = Arc::new(tx);
                e.insert(Arc::clone(&tx));
                (Some(tx), rx)
            }
        }
    }

    async fn resolve_shared(&self, name: &str) -> Outcome {
        let (leader, mut rx) = self.register_or_join(name);

        if let Some(tx) = leader {
            self.spawn_resolution(name.to_string(), tx);
        }

        let outcome = rx.wait_for(Option::is_some).await.ok().and_then(|slot| (*slot).clone());
        outcome.unwrap_or_else(|| Err(Error::Internal(format!("resolution of {name} was abandoned"))))
    }

    fn spawn_resolution(&self, name: String, tx: InflightSender) {
        let store = Arc::clone(&self.store);
        let resolver = Arc::clone(&self.resolver);
        let ttl = self.cache_ttl;
        let guard = InflightLeaderGuard { inflight: Arc::clone(&self.inflight), name, tx };

        tokio::spawn(async move {
            let outcome = resolve_and_store(store.as_ref(), resolver.as_ref(), &guard.name, ttl).await;
            guard.publish(outcome);
        });
    }
}

async fn resolve_and_store(
    store: &dyn NameStore, resolver: &dyn NameResolver, name: &str, ttl: chrono::Duration,
) -> Outcome {
    // A previous episode may have finished between the caller's miss and our registration.
    if let Some(entry) = store.get(name).await? {
        debug!(name, "filled by a previous resolution");
        return Ok(entry.record());
    }

    info!(name, "resolving name");
    let record = resolver.resolve(name).await.inspect_err(|e| {
        warn!(name, error = %e, "resolution failed");
    })?;

    let now = Utc::now();
    let entry = CacheEntry::from_record(name, &record, now, ttl);
    store.put(&entry).await.inspect_err(|e| {
        warn!(name, error = %e, "failed to cache resolved name");
    })?;

    if entry.is_expired_at(now) {
        info!(name, available_at = %entry.expiration_time, "availability already passed, entry will not be served");
    } else {
        info!(name, expires_at = %entry.expiration_time, "cached name");
    }
    Ok(record)
}
