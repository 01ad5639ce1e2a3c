//! Database connection management with pragma configuration.
//!
//! This module handles opening the SQLite database, applying required pragmas
//! for concurrency (WAL mode), and bringing the schema up to date.

use crate::Error;
use std::path::Path;
use std::sync::Arc;
use tokio_rusqlite::{Connection, rusqlite};

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;
     PRAGMA busy_timeout=5000;";

/// Schema generation recorded in `PRAGMA user_version`.
const SCHEMA_VERSION: i64 = 1;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS name_cache (
        name TEXT PRIMARY KEY NOT NULL,
        search_count TEXT NOT NULL,
        availability_time INTEGER,
        expiration_time INTEGER NOT NULL,
        inserted_at INTEGER NOT NULL
    );";

/// Cache database handle.
///
/// Wraps a tokio-rusqlite Connection that runs database operations
/// on a background thread. Cloning shares the same connection.
#[derive(Clone, Debug)]
pub struct CacheDb {
    pub(crate) conn: Connection,
}

impl CacheDb {
    /// Open a database at the specified path.
    ///
    /// Creates the file if it doesn't exist, applies pragmas,
    /// and creates the schema on first open.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| Error::StoreUnavailable(Arc::new(e.into())))?;
        Self::init(conn).await
    }

    /// Open an in-memory database for testing.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::StoreUnavailable(Arc::new(e.into())))?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| -> Result<(), Error> {
            conn.execute_batch(PRAGMAS)?;
            ensure_schema(conn)
        })
        .await?;

        Ok(Self { conn })
    }
}

/// Create the schema when `user_version` is behind, refuse a newer one.
fn ensure_schema(conn: &mut rusqlite::Connection) -> Result<(), Error> {
    let current: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if current > SCHEMA_VERSION {
        return Err(Error::MigrationFailed(format!(
            "database schema version {current} is newer than supported version {SCHEMA_VERSION}"
        )));
    }
    if current == SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn.transaction()?;
    tx.execute_batch(SCHEMA)
        .map_err(|e| Error::MigrationFailed(format!("version {SCHEMA_VERSION}: {e}")))?;
    tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    tx.commit()?;

    tracing::debug!(from = current, to = SCHEMA_VERSION, "cache schema created");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let version = db
            .conn
            .call(|conn| conn.query_row("SELECT sqlite_version()", [], |row| row.get::<_, String>(0)))
            .await
            .unwrap();
        assert!(!version.is_empty());
    }

    #[tokio::test]
    async fn test_open_file_creates_schema() {
        let path = std::env::temp_dir().join(format!("namewatch-open-{}.sqlite", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let db = CacheDb::open(&path).await.unwrap();
        let has_table: bool = db
            .conn
            .call(|conn| {
                conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='name_cache')",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert!(has_table);

        drop(db);
        let _ = std::fs::remove_file(&path);
    }

    async fn user_version(db: &CacheDb) -> i64 {
        db.conn
            .call(|conn| conn.pragma_query_value(None, "user_version", |row| row.get(0)))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_schema_version_recorded() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert_eq!(user_version(&db).await, SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_reopen_keeps_rows() {
        let path = std::env::temp_dir().join(format!("namewatch-reopen-{}.sqlite", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let db = CacheDb::open(&path).await.unwrap();
        db.conn
            .call(|conn| {
                conn.execute(
                    "INSERT INTO name_cache (name, search_count, expiration_time, inserted_at) VALUES ('foo', '3', 9999999999, 0)",
                    [],
                )
            })
            .await
            .unwrap();
        drop(db);

        let db = CacheDb::open(&path).await.unwrap();
        let rows: i64 = db
            .conn
            .call(|conn| conn.query_row("SELECT COUNT(*) FROM name_cache", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(rows, 1);
        assert_eq!(user_version(&db).await, SCHEMA_VERSION);

        drop(db);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_newer_schema_is_refused() {
        let path = std::env::temp_dir().join(format!("namewatch-newer-{}.sqlite", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let conn = Connection::open(&path).await.unwrap();
        conn.call(|conn| conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1))
            .await
            .unwrap();
        drop(conn);

        let err = CacheDb::open(&path).await.unwrap_err();
        assert!(matches!(err, Error::MigrationFailed(msg) if msg.contains("newer")));

        let _ = std::fs::remove_file(&path);
    }
}
