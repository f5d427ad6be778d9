//! Transcript line parsing

use crate::types::{ParsedEvent, ParsedMessage, ToolCallBlock, ToolResultBlock, Usage};
use serde_json::{json, Map, Value};
use watchtower_core::hash::sha256_hex;
use watchtower_core::time::parse_ts;

/// Max characters kept in a message text preview
pub const PREVIEW_CHARS: usize = 480;

const PREVIEW_SEPARATOR: &str = " · ";

/// Stable id for a line without its own: line number plus a content digest
pub fn derived_event_id(line: &str, line_number: u64) -> String {
    let digest = sha256_hex(line);
    format!("line_{line_number}_{}", &digest[..10])
}

fn str_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

fn int_field(map: &Map<String, Value>, key: &str) -> Option<i64> {
    map.get(key).and_then(Value::as_i64)
}

/// Joined text blocks of a message, capped at [`PREVIEW_CHARS`]
pub fn text_preview(message: &Map<String, Value>) -> Option<String> {
    let blocks = message.get("content")?.as_array()?;
    let parts: Vec<&str> = blocks
        .iter()
        .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|block| block.get("text").and_then(Value::as_str))
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect();

    if parts.is_empty() {
        return None;
    }
    Some(parts.join(PREVIEW_SEPARATOR).chars().take(PREVIEW_CHARS).collect())
}

fn tool_calls(message: &Map<String, Value>) -> Vec<ToolCallBlock> {
    let Some(blocks) = message.get("content").and_then(Value::as_array) else {
        return Vec::new();
    };
    blocks
        .iter()
        .filter_map(Value::as_object)
        .filter(|block| block.get("type").and_then(Value::as_str) == Some("toolCall"))
        .filter_map(|block| {
            Some(ToolCallBlock {
                tool_call_id: str_field(block, "id")?,
                tool_name: str_field(block, "name"),
                arguments: block
                    .get("arguments")
                    .or_else(|| block.get("partialJson"))
                    .cloned(),
            })
        })
        .collect()
}

fn parse_message(message: &Map<String, Value>) -> ParsedMessage {
    let role = str_field(message, "role").unwrap_or_else(|| "unknown".to_string());
    let usage = message
        .get("usage")
        .and_then(Value::as_object)
        .map(|u| Usage {
            input: int_field(u, "input"),
            output: int_field(u, "output"),
            total: int_field(u, "totalTokens"),
        })
        .unwrap_or_default();

    let tool_result = if role == "toolResult" {
        str_field(message, "toolCallId").map(|tool_call_id| ToolResultBlock {
            tool_call_id,
            tool_name: str_field(message, "toolName"),
            content: message.get("content").cloned(),
            is_error: message.get("isError").and_then(Value::as_bool).unwrap_or(false),
        })
    } else {
        None
    };

    ParsedMessage {
        text_preview: text_preview(message),
        provider: str_field(message, "provider"),
        model: str_field(message, "model"),
        stop_reason: str_field(message, "stopReason"),
        usage,
        tool_calls: tool_calls(message),
        tool_result,
        role,
    }
}

fn compact_json(record: &Map<String, Value>, message: Option<&Map<String, Value>>) -> Value {
    let mut compact = json!({
        "id": record.get("id").cloned().unwrap_or(Value::Null),
        "type": record.get("type").cloned().unwrap_or_else(|| json!("unknown")),
        "timestamp": record.get("timestamp").cloned().unwrap_or(Value::Null),
        "parentId": record.get("parentId").cloned().unwrap_or(Value::Null),
    });

    if let Some(msg) = message {
        let mut summary = json!({
            "role": str_field(msg, "role"),
            "model": str_field(msg, "model"),
            "provider": str_field(msg, "provider"),
            "stopReason": str_field(msg, "stopReason"),
            "textPreview": text_preview(msg),
        });
        if msg.get("role").and_then(Value::as_str) == Some("toolResult") {
            summary["toolCallId"] = json!(str_field(msg, "toolCallId"));
            summary["toolName"] = json!(str_field(msg, "toolName"));
            summary["isError"] = json!(msg.get("isError").and_then(Value::as_bool).unwrap_or(false));
        }
        compact["message"] = summary;
    }
    compact
}

/// Parse one transcript line. Returns `None` for anything but a JSON object.
pub fn parse_line(line: &str, line_number: u64) -> Option<ParsedEvent> {
    let value: Value = serde_json::from_str(line).ok()?;
    let record = value.as_object()?;

    let event_type = str_field(record, "type").unwrap_or_else(|| "unknown".to_string());
    let message_obj = record.get("message").and_then(Value::as_object);
    let message = if event_type == "message" {
        message_obj.map(parse_message)
    } else {
        None
    };

    Some(ParsedEvent {
        event_id: str_field(record, "id").unwrap_or_else(|| derived_event_id(line, line_number)),
        event_ts: record.get("timestamp").and_then(parse_ts),
        parent_event_id: str_field(record, "parentId"),
        line_number,
        raw_json: compact_json(record, message_obj),
        message,
        event_type,
    })
}
