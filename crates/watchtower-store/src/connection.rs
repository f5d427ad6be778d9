//! Pooled SQLite handle
//!
//! Every connection runs with WAL, foreign keys and a busy timeout so
//! concurrent collectors interleave at statement granularity.

use crate::error::Result;
use crate::migrate::{run_migrations, MigrationReport};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

const POOL_SIZE: u32 = 8;
const BUSY_TIMEOUT_MS: u32 = 5_000;

#[derive(Debug)]
struct PragmaCustomizer;

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for PragmaCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.execute_batch(&format!(
            "PRAGMA journal_mode = WAL;\
             PRAGMA busy_timeout = {BUSY_TIMEOUT_MS};\
             PRAGMA foreign_keys = ON;\
             PRAGMA synchronous = NORMAL;"
        ))
    }
}

/// Shared store handle, cheap to clone
#[derive(Clone, Debug)]
pub struct Store {
    pool: Pool<SqliteConnectionManager>,
}

impl Store {
    /// Open (creating if needed) a database file
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::build(SqliteConnectionManager::file(path), Pool::builder().max_size(POOL_SIZE))
    }

    /// Single-connection in-memory database. The database lives exactly as
    /// long as that connection, so the pool never retires it.
    pub fn open_in_memory() -> Result<Self> {
        let builder = Pool::builder()
            .max_size(1)
            .min_idle(Some(1))
            .max_lifetime(None)
            .idle_timeout(None);
        Self::build(SqliteConnectionManager::memory(), builder)
    }

    fn build(
        manager: SqliteConnectionManager,
        builder: r2d2::Builder<SqliteConnectionManager>,
    ) -> Result<Self> {
        let pool = builder
            .connection_timeout(Duration::from_secs(10))
            .connection_customizer(Box::new(PragmaCustomizer))
            .build(manager)?;
        Ok(Self { pool })
    }

    pub fn conn(&self) -> Result<PooledConnection> {
        Ok(self.pool.get()?)
    }

    /// Apply pending migrations from `dir`
    pub fn migrate(&self, dir: &Path) -> Result<MigrationReport> {
        let conn = self.conn()?;
        run_migrations(&conn, dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_uses_wal() {
        let temp = TempDir::new().unwrap();
        let store = Store::open(&temp.path().join("nested").join("w.db")).unwrap();
        let conn = store.conn().unwrap();

        let mode: String = conn.query_row("PRAGMA journal_mode", [], |r| r.get(0)).unwrap();
        let fk: i64 = conn.query_row("PRAGMA foreign_keys", [], |r| r.get(0)).unwrap();
        assert_eq!(mode, "wal");
        assert_eq!(fk, 1);
    }

    #[test]
    fn test_in_memory_connection_is_never_recycled() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.pool.max_size(), 1);
        assert_eq!(store.pool.max_lifetime(), None);
        assert_eq!(store.pool.idle_timeout(), None);

        store
            .conn()
            .unwrap()
            .execute_batch("CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (7);")
            .unwrap();
        for _ in 0..3 {
            let x: i64 = store
                .clone()
                .conn()
                .unwrap()
                .query_row("SELECT x FROM t", [], |r| r.get(0))
                .unwrap();
            assert_eq!(x, 7);
        }
    }

    #[test]
    fn test_clones_share_database() {
        let temp = TempDir::new().unwrap();
        let store = Store::open(&temp.path().join("w.db")).unwrap();
        let other = store.clone();

        store
            .conn()
            .unwrap()
            .execute_batch("CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (1);")
            .unwrap();
        let count: i64 = other
            .conn()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
