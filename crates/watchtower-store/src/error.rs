//! Store errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// An applied migration file changed on disk
    #[error("checksum mismatch for migration {name}")]
    ChecksumMismatch { name: String },

    #[error("migration {name} failed: {message}")]
    Migration { name: String, message: String },
}

pub type Result<T> = std::result::Result<T, StoreError>;
