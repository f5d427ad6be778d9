//! Normalized records produced by the source adapters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which adapter produced a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Sessions,
    Cron,
    Status,
    Memory,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Sessions => "sessions",
            SourceType::Cron => "cron",
            SourceType::Status => "status",
            SourceType::Memory => "memory",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a probe reached the observed runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Command,
    Filesystem,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Command => "command",
            Transport::Filesystem => "filesystem",
        }
    }
}

/// Provenance attached to every snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMetadata {
    pub source_type: SourceType,
    pub captured_at: DateTime<Utc>,
    pub transport: Transport,
    pub source_ref: String,
    pub read_only: bool,
}

impl SourceMetadata {
    pub fn new(source_type: SourceType, transport: Transport, source_ref: impl Into<String>) -> Self {
        Self {
            source_type,
            captured_at: Utc::now(),
            transport,
            source_ref: source_ref.into(),
            read_only: true,
        }
    }
}

/// One capture from one adapter
#[derive(Debug, Clone)]
pub struct CollectedSnapshot<T> {
    pub metadata: SourceMetadata,
    pub data: T,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Recent,
    Unknown,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Recent => "recent",
            SessionStatus::Unknown => "unknown",
        }
    }
}

/// Run type derived from the session key's structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunType {
    Main,
    Subagent,
    Cron,
    Agent,
    Unknown,
}

impl RunType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunType::Main => "main",
            RunType::Subagent => "subagent",
            RunType::Cron => "cron",
            RunType::Agent => "agent",
            RunType::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_key: String,
    pub session_id: Option<String>,
    pub label: String,
    pub status: SessionStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub runtime_ms: Option<i64>,
    pub model: Option<String>,
    pub agent_id: Option<String>,
    pub session_kind: Option<String>,
    pub run_type: RunType,
    pub last_update_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronJobRecord {
    pub job_id: String,
    pub name: String,
    pub schedule_kind: String,
    pub enabled: bool,
    pub next_run_at: Option<DateTime<Utc>>,
    /// Full probe object, kept for rich-detail reconstruction
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronRunRecord {
    pub run_id: String,
    pub job_id: String,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub summary: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CronSnapshot {
    pub jobs: Vec<CronJobRecord>,
    pub runs: Vec<CronRunRecord>,
}

/// Gateway health as read from the status probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Degraded,
    Offline,
    Unknown,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Ok => "ok",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Offline => "offline",
            HealthStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub status: HealthStatus,
    pub raw: String,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryKind {
    Core,
    Memory,
}

impl MemoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryKind::Core => "core",
            MemoryKind::Memory => "memory",
        }
    }
}

/// A workspace document. `content` never reaches the store unredacted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryDocRecord {
    pub path: String,
    pub kind: MemoryKind,
    pub updated_at: DateTime<Utc>,
    pub content: String,
}
