//! Row types written and read by the store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use watchtower_core::{MemoryKind, SourceType, Transport};

/// One redacted, normalized snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRow {
    pub source_type: SourceType,
    pub captured_at: DateTime<Utc>,
    pub payload_hash: String,
    pub transport: Transport,
    pub source_ref: String,
    pub read_only: bool,
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRow {
    pub ts: DateTime<Utc>,
    pub category: String,
    pub severity: String,
    pub title: String,
    pub details: String,
    pub source_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryDocRow {
    pub path: String,
    pub kind: MemoryKind,
    pub updated_at: DateTime<Utc>,
    pub summary: String,
    pub redacted: bool,
    pub indicators: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOffsetRow {
    pub session_id: String,
    pub session_key: Option<String>,
    pub transcript_path: String,
    pub last_byte_offset: u64,
    pub last_line_number: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionEventRow {
    pub session_id: String,
    pub session_key: Option<String>,
    pub event_id: String,
    pub parent_event_id: Option<String>,
    pub event_type: String,
    pub event_ts: Option<DateTime<Utc>>,
    pub source_line: u64,
    pub raw_json: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionMessageRow {
    pub session_id: String,
    pub session_key: Option<String>,
    pub event_id: String,
    pub role: String,
    pub message_ts: Option<DateTime<Utc>>,
    pub text_preview: Option<String>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub stop_reason: Option<String>,
    pub usage_input: Option<i64>,
    pub usage_output: Option<i64>,
    pub usage_total: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRow {
    pub session_id: String,
    pub session_key: Option<String>,
    pub tool_call_id: String,
    pub event_id_call: String,
    pub tool_name: Option<String>,
    pub arguments: Option<Value>,
    pub started_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolResultRow {
    pub session_id: String,
    pub session_key: Option<String>,
    pub tool_call_id: String,
    pub event_id_result: String,
    pub tool_name: Option<String>,
    pub result: Option<Value>,
    pub is_error: bool,
    pub finished_at: Option<DateTime<Utc>>,
}

// Read-model views. Timestamps stay in their stored RFC 3339 form.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_key: String,
    pub session_id: Option<String>,
    pub label: String,
    pub status: String,
    pub started_at: Option<String>,
    pub ended_at: Option<String>,
    pub runtime_ms: Option<i64>,
    /// now - startedAt, for active sessions only
    pub elapsed_ms: Option<i64>,
    pub model: Option<String>,
    pub agent_id: Option<String>,
    pub session_kind: Option<String>,
    pub run_type: String,
    pub last_update_at: Option<String>,
}

/// Rich job metadata rebuilt from the latest cron snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronJobDetail {
    pub schedule: Option<Value>,
    pub delivery: Option<Value>,
    pub state: Option<Value>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronJobView {
    pub job_id: String,
    pub name: String,
    pub schedule_kind: String,
    pub enabled: bool,
    pub next_run_at: Option<String>,
    pub detail: Option<CronJobDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronRunView {
    pub run_id: String,
    pub job_id: String,
    pub status: String,
    pub started_at: Option<String>,
    pub ended_at: Option<String>,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectorStateView {
    pub collector_name: String,
    pub last_success_at: Option<String>,
    pub last_error_at: Option<String>,
    pub error_count: i64,
    pub stale: bool,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventView {
    pub event_id: String,
    pub ts: String,
    pub category: String,
    pub severity: String,
    pub title: String,
    pub details: String,
    pub source_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryDocView {
    pub path: String,
    pub kind: String,
    pub updated_at: String,
    pub summary: String,
    pub redacted: bool,
}

/// A stored status snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub captured_at: String,
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSpanView {
    pub session_id: String,
    pub tool_call_id: String,
    pub tool_name: Option<String>,
    pub is_error: bool,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub duration_ms: Option<i64>,
}
