//! Transcript record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// A session transcript to tail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptTarget {
    pub session_id: String,
    pub transcript_path: PathBuf,
}

/// Where a previous pass left off
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamPosition {
    pub byte_offset: u64,
    pub line_number: u64,
}

/// Complete lines read past a [`StreamPosition`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Increment {
    /// Non-empty, trimmed lines with their 1-based line numbers
    pub lines: Vec<(u64, String)>,
    /// Position after the last complete line consumed
    pub next: StreamPosition,
    /// The file was shorter than the stored offset and was re-read from 0
    pub truncated: bool,
}

/// Token usage reported on an assistant turn
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input: Option<i64>,
    pub output: Option<i64>,
    pub total: Option<i64>,
}

/// Call side of a tool invocation, from a `toolCall` content block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallBlock {
    pub tool_call_id: String,
    pub tool_name: Option<String>,
    pub arguments: Option<Value>,
}

/// Result side of a tool invocation, from a `toolResult` message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultBlock {
    pub tool_call_id: String,
    pub tool_name: Option<String>,
    pub content: Option<Value>,
    pub is_error: bool,
}

/// A chat turn carried by a `message` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedMessage {
    pub role: String,
    pub text_preview: Option<String>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub stop_reason: Option<String>,
    pub usage: Usage,
    pub tool_calls: Vec<ToolCallBlock>,
    pub tool_result: Option<ToolResultBlock>,
}

/// One parsed transcript line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedEvent {
    pub event_id: String,
    pub event_type: String,
    pub event_ts: Option<DateTime<Utc>>,
    pub parent_event_id: Option<String>,
    pub line_number: u64,
    /// Compact projection of the line, never the full record
    pub raw_json: Value,
    pub message: Option<ParsedMessage>,
}
