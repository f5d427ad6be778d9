//! Shared records, configuration, classification and redaction

pub mod classify;
mod config;
pub mod hash;
pub mod redact;
pub mod time;
mod types;

pub use config::{AppConfig, ConfigError, ProbeCommands};
pub use redact::{redact_json, redact_text, Redaction, EXCLUDED_PATH_SENTINEL};
pub use types::{
    CollectedSnapshot, CronJobRecord, CronRunRecord, CronSnapshot, HealthStatus, MemoryDocRecord,
    MemoryKind, RunType, SessionRecord, SessionStatus, SourceMetadata, SourceType, StatusSnapshot,
    Transport,
};
