//! Name records: the resolver's transient output and the persisted cache entry.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Default freshness window, in seconds, for names without a known availability instant.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 30 * 60;

/// Structured result of one external resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRecord {
    /// Search count exactly as the upstream printed it (e.g. "1,234").
    pub search_count: String,
    /// Instant the name becomes available, when it is currently taken.
    pub availability_time: Option<DateTime<Utc>>,
}

/// Persisted knowledge about one name.
///
/// `expiration_time` equals `availability_time` when the latter is present,
/// otherwise insertion time plus the cache TTL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub name: String,
    pub search_count: String,
    pub availability_time: Option<DateTime<Utc>>,
    pub expiration_time: DateTime<Utc>,
}

impl CacheEntry {
    /// Build the entry for a freshly resolved record.
    ///
    /// A TTL that overflows the calendar saturates at the latest representable instant.
    pub fn from_record(name: impl Into<String>, record: &ResolvedRecord, now: DateTime<Utc>, ttl: Duration) -> Self {
        let expiration_time = record
            .availability_time
            .unwrap_or_else(|| now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC));
        Self {
            name: name.into(),
            search_count: record.search_count.clone(),
            availability_time: record.availability_time,
            expiration_time,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration_time <= now
    }

    /// The resolver-shaped view of this entry.
    pub fn record(&self) -> ResolvedRecord {
        ResolvedRecord { search_count: self.search_count.clone(), availability_time: self.availability_time }
    }
}

/// Normalize a client-supplied name to its cache key.
pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}
