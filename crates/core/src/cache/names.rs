//! Name cache operations.
//!
//! Rows carry an absolute `expiration_time` (epoch milliseconds). Reads
//! filter on it, so an expired row is invisible whether or not the sweep
//! has physically deleted it yet.

use super::NameStore;
use super::connection::CacheDb;
use crate::Error;
use crate::record::CacheEntry;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Name of the index the expiry sweep relies on.
pub const EXPIRY_INDEX: &str = "idx_name_cache_expiration";

struct Row {
    name: String,
    search_count: String,
    availability_ms: Option<i64>,
    expiration_ms: i64,
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>, Error> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| Error::Internal(format!("timestamp out of range: {ms}")))
}

impl TryFrom<Row> for CacheEntry {
    type Error = Error;

    fn try_from(row: Row) -> Result<Self, Error> {
        Ok(CacheEntry {
            name: row.name,
            search_count: row.search_count,
            availability_time: row.availability_ms.map(from_millis).transpose()?,
            expiration_time: from_millis(row.expiration_ms)?,
        })
    }
}

impl CacheDb {
    /// Get the live entry for a name.
    ///
    /// Returns None if the name was never cached or its entry has expired.
    pub async fn get_name(&self, name: &str) -> Result<Option<CacheEntry>, Error> {
        let name = name.to_string();
        let now = Utc::now().timestamp_millis();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<Row>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT name, search_count, availability_time, expiration_time
                     FROM name_cache WHERE name = ?1 AND expiration_time > ?2",
                )?;

                let result = stmt.query_row(params![name, now], |row| {
                    Ok(Row {
                        name: row.get(0)?,
                        search_count: row.get(1)?,
                        availability_ms: row.get(2)?,
                        expiration_ms: row.get(3)?,
                    })
                });

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(CacheEntry::try_from).transpose()
    }

    /// Insert an entry.
    ///
    /// A conflicting row for the same name (a concurrent duplicate, or an
    /// expired row the sweep has not reached yet) is replaced: last write wins.
    pub async fn put_name(&self, entry: &CacheEntry) -> Result<(), Error> {
        let name = entry.name.clone();
        let search_count = entry.search_count.clone();
        let availability_ms = entry.availability_time.map(|t| t.timestamp_millis());
        let expiration_ms = entry.expiration_time.timestamp_millis();
        let inserted_ms = Utc::now().timestamp_millis();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO name_cache (name, search_count, availability_time, expiration_time, inserted_at)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    ON CONFLICT(name) DO UPDATE SET
                        search_count = excluded.search_count,
                        availability_time = excluded.availability_time,
                        expiration_time = excluded.expiration_time,
                        inserted_at = excluded.inserted_at",
                    params![name, search_count, availability_ms, expiration_ms, inserted_ms],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete entries whose expiration time has passed.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_expired(&self) -> Result<u64, Error> {
        let now = Utc::now().timestamp_millis();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM name_cache WHERE expiration_time <= ?1", params![now])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Provision the index on `expiration_time` used by the expiry sweep.
    ///
    /// Administrative, one-time operation; calling it again is a no-op.
    pub async fn create_expiry_index(&self) -> Result<(), Error> {
        self.conn
            .call(|conn| -> Result<(), Error> {
                conn.execute_batch(&format!(
                    "CREATE INDEX IF NOT EXISTS {EXPIRY_INDEX} ON name_cache(expiration_time)"
                ))?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Whether the expiry index exists.
    pub async fn has_expiry_index(&self) -> Result<bool, Error> {
        self.conn
            .call(|conn| -> Result<bool, Error> {
                let exists = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='index' AND name=?1)",
                    params![EXPIRY_INDEX],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Count rows physically present, expired or not.
    pub async fn count_names(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM name_cache", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait]
impl NameStore for CacheDb {
    async fn get(&self, name: &str) -> Result<Option<CacheEntry>, Error> {
        self.get_name(name).await
    }

    async fn put(&self, entry: &CacheEntry) -> Result<(), Error> {
        self.put_name(entry).await
    }
}
