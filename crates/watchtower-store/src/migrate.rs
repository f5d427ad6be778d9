//! Checksummed schema migrations
//!
//! Files ending in `.sql` are applied in lexical filename order, each inside
//! its own transaction. Applied files are recorded in `_migrations` by name
//! with a SHA-256 of their content; a recorded file whose content changed is
//! a hard error.

use crate::error::{Result, StoreError};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use watchtower_core::hash::sha256_hex;
use watchtower_core::time::now_ts;

/// Outcome of one migration run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
}

/// Migration files in `dir`, sorted by file name
pub fn migration_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("sql") {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

pub fn run_migrations(conn: &Connection, dir: &Path) -> Result<MigrationReport> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            checksum TEXT NOT NULL,
            applied_at TEXT NOT NULL
        );",
    )?;

    let mut report = MigrationReport::default();
    for path in migration_files(dir)? {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let sql = std::fs::read_to_string(&path)?;
        let checksum = sha256_hex(&sql);

        let recorded: Option<String> = conn
            .query_row(
                "SELECT checksum FROM _migrations WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;

        match recorded {
            Some(existing) if existing == checksum => {
                debug!(migration = %name, "migration already applied, skipping");
                report.skipped.push(name);
            }
            Some(_) => return Err(StoreError::ChecksumMismatch { name }),
            None => {
                apply(conn, &name, &sql, &checksum)?;
                info!(migration = %name, "applied migration");
                report.applied.push(name);
            }
        }
    }

    Ok(report)
}

fn apply(conn: &Connection, name: &str, sql: &str, checksum: &str) -> Result<()> {
    let failed = |e: rusqlite::Error| StoreError::Migration {
        name: name.to_string(),
        message: e.to_string(),
    };

    let tx = conn.unchecked_transaction().map_err(failed)?;
    tx.execute_batch(sql).map_err(failed)?;
    tx.execute(
        "INSERT INTO _migrations (name, checksum, applied_at) VALUES (?1, ?2, ?3)",
        params![name, checksum, now_ts()],
    )
    .map_err(failed)?;
    tx.commit().map_err(failed)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, sql: &str) {
        std::fs::write(dir.join(name), sql).unwrap();
    }

    fn table_exists(conn: &Connection, table: &str) -> bool {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |r| r.get::<_, i64>(0),
        )
        .unwrap()
            == 1
    }

    #[test]
    fn test_applies_in_lexical_order_then_skips() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "0002_b.sql", "ALTER TABLE a ADD COLUMN y INTEGER;");
        write(dir.path(), "0001_a.sql", "CREATE TABLE a (x INTEGER);");
        write(dir.path(), "README.md", "not a migration");
        let conn = Connection::open_in_memory().unwrap();

        let first = run_migrations(&conn, dir.path()).unwrap();
        assert_eq!(first.applied, vec!["0001_a.sql", "0002_b.sql"]);

        let second = run_migrations(&conn, dir.path()).unwrap();
        assert!(second.applied.is_empty());
        assert_eq!(second.skipped.len(), 2);
    }

    #[test]
    fn test_checksum_mismatch_is_fatal() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "0001_a.sql", "CREATE TABLE a (x INTEGER);");
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn, dir.path()).unwrap();

        write(dir.path(), "0001_a.sql", "CREATE TABLE a (x TEXT);");
        let err = run_migrations(&conn, dir.path()).unwrap_err();
        assert!(matches!(err, StoreError::ChecksumMismatch { ref name } if name == "0001_a.sql"));
        assert!(err.to_string().contains("checksum mismatch"));
    }

    #[test]
    fn test_failed_migration_rolls_back() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "0001_bad.sql",
            "CREATE TABLE half (x INTEGER); INSERT INTO missing VALUES (1);",
        );
        let conn = Connection::open_in_memory().unwrap();

        let err = run_migrations(&conn, dir.path()).unwrap_err();
        assert!(matches!(err, StoreError::Migration { .. }));
        assert!(!table_exists(&conn, "half"));
        let recorded: i64 = conn
            .query_row("SELECT COUNT(*) FROM _migrations", [], |r| r.get(0))
            .unwrap();
        assert_eq!(recorded, 0);
    }

    #[test]
    fn test_missing_dir_errors() {
        let dir = TempDir::new().unwrap();
        let conn = Connection::open_in_memory().unwrap();
        assert!(matches!(
            run_migrations(&conn, &dir.path().join("nope")),
            Err(StoreError::Io(_))
        ));
    }
}
