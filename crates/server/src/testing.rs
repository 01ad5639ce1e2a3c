//! Test doubles for the store, resolver, and channel seams.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use namewatch_client::{Channel, NameResolver, Reply};
use namewatch_core::{CacheEntry, Error, NameStore, ResolvedRecord};

/// Resolver returning a fixed outcome after an optional delay, counting calls.
pub struct FakeResolver {
    outcome: Result<ResolvedRecord, Error>,
    delay: Duration,
    pub calls: AtomicUsize,
}

impl FakeResolver {
    pub fn available(searches: &str) -> Self {
        Self::with_outcome(Ok(ResolvedRecord { search_count: searches.into(), availability_time: None }))
    }

    pub fn taken(searches: &str, at: DateTime<Utc>) -> Self {
        Self::with_outcome(Ok(ResolvedRecord { search_count: searches.into(), availability_time: Some(at) }))
    }

    pub fn failing(err: Error) -> Self {
        Self::with_outcome(Err(err))
    }

    fn with_outcome(outcome: Result<ResolvedRecord, Error>) -> Self {
        Self { outcome, delay: Duration::ZERO, calls: AtomicUsize::new(0) }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl NameResolver for FakeResolver {
    async fn resolve(&self, _name: &str) -> Result<ResolvedRecord, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.outcome.clone()
    }
}

/// Store that fails reads, or succeeds reads with a miss and fails writes.
pub struct FailingStore {
    fail_reads: bool,
}

impl FailingStore {
    pub fn reads() -> Self {
        Self { fail_reads: true }
    }

    pub fn writes() -> Self {
        Self { fail_reads: false }
    }
}

fn unavailable() -> Error {
    Error::StoreUnavailable(Arc::new(tokio_rusqlite::Error::ConnectionClosed))
}

#[async_trait]
impl NameStore for FailingStore {
    async fn get(&self, _name: &str) -> Result<Option<CacheEntry>, Error> {
        if self.fail_reads { Err(unavailable()) } else { Ok(None) }
    }

    async fn put(&self, _entry: &CacheEntry) -> Result<(), Error> {
        Err(unavailable())
    }
}

/// Channel whose reply renders after one re-poll, or never.
pub struct ScriptedChannel {
    description: Option<String>,
}

impl ScriptedChannel {
    pub fn rendering(description: &str) -> Self {
        Self { description: Some(description.to_string()) }
    }

    pub fn never_rendering() -> Self {
        Self { description: None }
    }
}

#[async_trait]
impl Channel for ScriptedChannel {
    async fn send_query(&self, _query: &str) -> Result<Reply, Error> {
        Ok(Reply { message_id: "1".into(), content: None })
    }

    async fn fetch_reply(&self, message_id: &str) -> Result<Reply, Error> {
        Ok(Reply { message_id: message_id.to_string(), content: self.description.clone() })
    }
}
