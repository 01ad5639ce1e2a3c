//! SQLite-backed, self-expiring name cache.
//!
//! This module provides the persistent cache store using SQLite with async
//! access via tokio-rusqlite. It supports:
//!
//! - Time-based expiry keyed on each entry's `expiration_time`
//! - Schema creation tracked by `PRAGMA user_version`
//! - WAL mode for concurrent access
//! - An administrative expiry index and a purge operation for the sweep

pub mod connection;
pub mod names;

use async_trait::async_trait;

pub use crate::Error;
use crate::record::CacheEntry;

pub use connection::CacheDb;
pub use names::EXPIRY_INDEX;

/// Storage seam the lookup path depends on.
///
/// `get` must treat an entry whose expiration time has passed as absent.
#[async_trait]
pub trait NameStore: Send + Sync {
    async fn get(&self, name: &str) -> Result<Option<CacheEntry>, Error>;

    async fn put(&self, entry: &CacheEntry) -> Result<(), Error>;
}
