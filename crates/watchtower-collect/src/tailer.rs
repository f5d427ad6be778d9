//! Transcript tailing
//!
//! Each pass reads only the complete lines appended since the stored offset
//! of a session, writes one row per parsed event plus the message and tool
//! span projections, then advances the offset. Rows are keyed by
//! `(session_id, event_id)` so re-reading the same bytes writes nothing new.

use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};
use watchtower_core::redact::{redact_json, redact_text};
use watchtower_sources::probe::{run_template, CommandRunner};
use watchtower_store::{
    upserts, Connection, EventRow, Result, SessionEventRow, SessionMessageRow, StreamOffsetRow,
    ToolCallRow, ToolResultRow,
};
use watchtower_transcript::{
    discover_targets, parse_line, parse_targets, read_increment, ParsedEvent, StreamPosition,
    TranscriptTarget,
};

/// Outcome of tailing one transcript
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TargetReport {
    pub lines: usize,
    pub new_events: usize,
    pub truncated: bool,
    pub next: StreamPosition,
}

/// Outcome of one pass over every target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TailReport {
    pub targets: usize,
    /// Targets whose file could not be read this pass
    pub unreadable: usize,
    pub lines: usize,
    pub new_events: usize,
    pub truncated: usize,
}

/// Transcript targets from the probe, or from the agents directory when the
/// probe yields none. The directory scan runs off the async runtime and is
/// abandoned after `scan_timeout`.
pub async fn resolve_targets(
    runner: &dyn CommandRunner,
    command: &[String],
    agents_root: &Path,
    scan_timeout: Duration,
) -> Vec<TranscriptTarget> {
    let output = run_template(runner, command).await;
    if output.success() {
        match serde_json::from_str(&output.stdout) {
            Ok(value) => {
                let targets = parse_targets(&value);
                if !targets.is_empty() {
                    return targets;
                }
            }
            Err(e) => debug!(error = %e, "transcript probe output is not json"),
        }
    } else {
        debug!(error = output.failure_text(), "transcript probe failed");
    }

    let root = agents_root.to_path_buf();
    let scan = tokio::task::spawn_blocking(move || discover_targets(&root));
    match tokio::time::timeout(scan_timeout, scan).await {
        Ok(Ok(targets)) => targets,
        Ok(Err(e)) => {
            warn!(error = %e, "transcript discovery aborted");
            Vec::new()
        }
        Err(_) => {
            warn!(
                agents_root = %agents_root.display(),
                timeout_ms = scan_timeout.as_millis() as u64,
                "transcript discovery timed out"
            );
            Vec::new()
        }
    }
}

fn stored_position(stored: Option<&StreamOffsetRow>, path: &str) -> StreamPosition {
    match stored {
        // A session pointed at a new file starts over
        Some(row) if row.transcript_path == path => StreamPosition {
            byte_offset: row.last_byte_offset,
            line_number: row.last_line_number,
        },
        _ => StreamPosition::default(),
    }
}

/// Write one parsed line. Returns whether the event row was new.
fn store_event(
    conn: &Connection,
    session_id: &str,
    session_key: Option<&str>,
    event: ParsedEvent,
) -> Result<bool> {
    let session_id = session_id.to_string();
    let session_key = session_key.map(str::to_string);

    let inserted = upserts::insert_session_event(
        conn,
        &SessionEventRow {
            session_id: session_id.clone(),
            session_key: session_key.clone(),
            event_id: event.event_id.clone(),
            parent_event_id: event.parent_event_id.clone(),
            event_type: event.event_type.clone(),
            event_ts: event.event_ts,
            source_line: event.line_number,
            raw_json: redact_json(&event.raw_json).0,
        },
    )?;

    let Some(message) = event.message else {
        return Ok(inserted);
    };

    upserts::upsert_session_message(
        conn,
        &SessionMessageRow {
            session_id: session_id.clone(),
            session_key: session_key.clone(),
            event_id: event.event_id.clone(),
            role: message.role.clone(),
            message_ts: event.event_ts,
            text_preview: message
                .text_preview
                .as_deref()
                .map(|text| redact_text(text, None).value),
            provider: message.provider.clone(),
            model: message.model.clone(),
            stop_reason: message.stop_reason.clone(),
            usage_input: message.usage.input,
            usage_output: message.usage.output,
            usage_total: message.usage.total,
        },
    )?;

    for call in message.tool_calls {
        upserts::upsert_tool_call(
            conn,
            &ToolCallRow {
                session_id: session_id.clone(),
                session_key: session_key.clone(),
                tool_call_id: call.tool_call_id,
                event_id_call: event.event_id.clone(),
                tool_name: call.tool_name,
                arguments: call.arguments.as_ref().map(|args| redact_json(args).0),
                started_at: event.event_ts,
            },
        )?;
    }

    if let Some(result) = message.tool_result {
        upserts::upsert_tool_result(
            conn,
            &ToolResultRow {
                session_id,
                session_key,
                tool_call_id: result.tool_call_id,
                event_id_result: event.event_id,
                tool_name: result.tool_name,
                result: result.content.as_ref().map(|content| redact_json(content).0),
                is_error: result.is_error,
                finished_at: event.event_ts,
            },
        )?;
    }

    Ok(inserted)
}

/// Tail one transcript. Returns `None` when the file cannot be read; store
/// failures are errors.
pub fn tail_target(
    conn: &Connection,
    target: &TranscriptTarget,
    now: DateTime<Utc>,
) -> Result<Option<TargetReport>> {
    let path = target.transcript_path.display().to_string();
    let stored = upserts::get_stream_offset(conn, &target.session_id)?;
    let from = stored_position(stored.as_ref(), &path);

    let increment = match read_increment(&target.transcript_path, from) {
        Ok(increment) => increment,
        Err(e) => {
            debug!(session_id = %target.session_id, path = %path, error = %e, "transcript unreadable");
            return Ok(None);
        }
    };

    if increment.truncated {
        warn!(
            session_id = %target.session_id,
            path = %path,
            previous_offset = from.byte_offset,
            "transcript truncated, rereading from start"
        );
        upserts::insert_event(
            conn,
            &EventRow {
                ts: now,
                category: "transcript".to_string(),
                severity: "warning".to_string(),
                title: "transcript_truncated".to_string(),
                details: format!(
                    "session {} shrank below offset {}",
                    target.session_id, from.byte_offset
                ),
                source_ref: Some(path.clone()),
            },
        )?;
    }

    let session_key = upserts::session_key_for(conn, &target.session_id)?;
    let mut new_events = 0;
    for (line_number, line) in &increment.lines {
        let Some(event) = parse_line(line, *line_number) else {
            debug!(session_id = %target.session_id, line_number, "skipping unparsable transcript line");
            continue;
        };
        if store_event(conn, &target.session_id, session_key.as_deref(), event)? {
            new_events += 1;
        }
    }

    let moved = stored.is_none() || increment.truncated || increment.next != from;
    if moved {
        upserts::upsert_stream_offset(
            conn,
            &StreamOffsetRow {
                session_id: target.session_id.clone(),
                session_key,
                transcript_path: path,
                last_byte_offset: increment.next.byte_offset,
                last_line_number: increment.next.line_number,
            },
            now,
        )?;
    }

    Ok(Some(TargetReport {
        lines: increment.lines.len(),
        new_events,
        truncated: increment.truncated,
        next: increment.next,
    }))
}

pub fn tail_all(conn: &Connection, targets: &[TranscriptTarget], now: DateTime<Utc>) -> Result<TailReport> {
    let mut report = TailReport {
        targets: targets.len(),
        ..TailReport::default()
    };
    for target in targets {
        match tail_target(conn, target, now)? {
            Some(target_report) => {
                report.lines += target_report.lines;
                report.new_events += target_report.new_events;
                if target_report.truncated {
                    report.truncated += 1;
                }
            }
            None => report.unreadable += 1,
        }
    }
    Ok(report)
}
