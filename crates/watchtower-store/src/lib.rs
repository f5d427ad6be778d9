//! Relational record of everything the collectors observe
//!
//! A pooled SQLite [`Store`], the checksummed migration runner, idempotent
//! upserts and the read-model queries served to the presentation layer.

mod connection;
mod error;
pub mod migrate;
pub mod read;
mod types;
pub mod upserts;

pub use connection::{PooledConnection, Store};
pub use error::{Result, StoreError};
pub use migrate::{run_migrations, MigrationReport};
pub use types::*;

pub use rusqlite::Connection;

/// Migrations shipped with the workspace
pub fn bundled_migrations_dir() -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("migrations")
}
