//! Idempotent writes
//!
//! Every write is a single statement: an upsert or an insert that ignores
//! duplicates. Nothing here deletes rows.

use crate::error::Result;
use crate::types::{
    EventRow, MemoryDocRow, SessionEventRow, SessionMessageRow, SnapshotRow, StreamOffsetRow,
    ToolCallRow, ToolResultRow,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;
use watchtower_core::hash::sha256_hex;
use watchtower_core::time::format_ts;
use watchtower_core::{CronJobRecord, CronRunRecord, SessionRecord, SessionStatus};

fn opt_ts(ts: Option<DateTime<Utc>>) -> Option<String> {
    ts.as_ref().map(format_ts)
}

/// `(sourceType, capturedAt, payloadHash)` key of a snapshot
pub fn snapshot_key(row: &SnapshotRow) -> String {
    format!(
        "{}::{}::{}",
        row.source_type,
        format_ts(&row.captured_at),
        row.payload_hash
    )
}

/// Insert a snapshot unless an identical one exists. Returns the row id
/// and whether a new row was written.
pub fn insert_snapshot(conn: &Connection, row: &SnapshotRow) -> Result<(String, bool)> {
    let key = snapshot_key(row);
    let id = Uuid::new_v4().to_string();
    let inserted = conn.execute(
        "INSERT INTO source_snapshots
            (id, source_type, captured_at, payload_hash, idempotency_key, transport, source_ref, read_only, payload)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(idempotency_key) DO NOTHING",
        params![
            id,
            row.source_type.as_str(),
            format_ts(&row.captured_at),
            row.payload_hash,
            key,
            row.transport.as_str(),
            row.source_ref,
            row.read_only,
            serde_json::to_string(&row.payload)?,
        ],
    )?;

    if inserted == 1 {
        return Ok((id, true));
    }
    let existing: String = conn.query_row(
        "SELECT id FROM source_snapshots WHERE idempotency_key = ?1",
        params![key],
        |r| r.get(0),
    )?;
    Ok((existing, false))
}

/// Event key: category, severity, title and ts plus a digest of the details
pub fn event_key(row: &EventRow) -> String {
    let digest = sha256_hex(&row.details);
    format!(
        "{}::{}::{}::{}::{}",
        row.category,
        row.severity,
        row.title,
        format_ts(&row.ts),
        &digest[..16]
    )
}

/// Append an event; duplicates collapse. Returns whether a row was written.
pub fn insert_event(conn: &Connection, row: &EventRow) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT INTO events (event_id, idempotency_key, ts, category, severity, title, details, source_ref)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(idempotency_key) DO NOTHING",
        params![
            Uuid::new_v4().to_string(),
            event_key(row),
            format_ts(&row.ts),
            row.category,
            row.severity,
            row.title,
            row.details,
            row.source_ref,
        ],
    )?;
    Ok(inserted == 1)
}

/// Upsert a polled session.
///
/// `started_at` is written once and kept; a missing probe value falls back
/// to `captured_at` when the session is active. Leaving `active` stamps
/// `ended_at`, returning to it clears `ended_at`. `last_update_at` only
/// moves forward.
pub fn upsert_session(conn: &Connection, session: &SessionRecord, captured_at: DateTime<Utc>) -> Result<()> {
    let captured = format_ts(&captured_at);
    let active = session.status == SessionStatus::Active;
    let started_at = opt_ts(session.started_at).or_else(|| active.then(|| captured.clone()));
    let ended_at = if active { None } else { opt_ts(session.ended_at) };

    conn.execute(
        "INSERT INTO sessions
            (session_key, session_id, label, status, started_at, ended_at, runtime_ms, model,
             agent_id, session_kind, run_type, last_update_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
         ON CONFLICT(session_key) DO UPDATE SET
            session_id = COALESCE(excluded.session_id, sessions.session_id),
            label = CASE WHEN excluded.label = 'unlabeled' THEN sessions.label ELSE excluded.label END,
            status = excluded.status,
            started_at = COALESCE(sessions.started_at, excluded.started_at),
            ended_at = CASE
                WHEN excluded.status = 'active' THEN NULL
                WHEN sessions.status = 'active' THEN COALESCE(excluded.ended_at, excluded.updated_at)
                ELSE COALESCE(excluded.ended_at, sessions.ended_at)
            END,
            runtime_ms = COALESCE(excluded.runtime_ms, sessions.runtime_ms),
            model = COALESCE(excluded.model, sessions.model),
            agent_id = COALESCE(excluded.agent_id, sessions.agent_id),
            session_kind = COALESCE(excluded.session_kind, sessions.session_kind),
            run_type = excluded.run_type,
            last_update_at = CASE
                WHEN sessions.last_update_at IS NULL THEN excluded.last_update_at
                WHEN excluded.last_update_at IS NULL THEN sessions.last_update_at
                ELSE MAX(sessions.last_update_at, excluded.last_update_at)
            END,
            updated_at = excluded.updated_at",
        params![
            session.session_key,
            session.session_id,
            session.label,
            session.status.as_str(),
            started_at,
            ended_at,
            session.runtime_ms,
            session.model,
            session.agent_id,
            session.session_kind,
            session.run_type.as_str(),
            opt_ts(session.last_update_at),
            captured,
        ],
    )?;
    Ok(())
}

pub fn upsert_cron_job(conn: &Connection, job: &CronJobRecord, captured_at: DateTime<Utc>) -> Result<()> {
    conn.execute(
        "INSERT INTO cron_jobs (job_id, name, schedule_kind, enabled, next_run_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(job_id) DO UPDATE SET
            name = excluded.name,
            schedule_kind = excluded.schedule_kind,
            enabled = excluded.enabled,
            next_run_at = excluded.next_run_at,
            updated_at = excluded.updated_at",
        params![
            job.job_id,
            job.name,
            job.schedule_kind,
            job.enabled,
            opt_ts(job.next_run_at),
            format_ts(&captured_at),
        ],
    )?;
    Ok(())
}

pub fn upsert_cron_run(conn: &Connection, run: &CronRunRecord, captured_at: DateTime<Utc>) -> Result<()> {
    conn.execute(
        "INSERT INTO cron_runs (run_id, job_id, status, started_at, ended_at, summary, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(run_id) DO UPDATE SET
            job_id = excluded.job_id,
            status = excluded.status,
            started_at = COALESCE(excluded.started_at, cron_runs.started_at),
            ended_at = COALESCE(excluded.ended_at, cron_runs.ended_at),
            summary = CASE WHEN excluded.summary = '' THEN cron_runs.summary ELSE excluded.summary END,
            updated_at = excluded.updated_at",
        params![
            run.run_id,
            run.job_id,
            run.status,
            opt_ts(run.started_at),
            opt_ts(run.ended_at),
            run.summary,
            format_ts(&captured_at),
        ],
    )?;
    Ok(())
}

pub fn upsert_memory_doc(conn: &Connection, doc: &MemoryDocRow, captured_at: DateTime<Utc>) -> Result<()> {
    conn.execute(
        "INSERT INTO memory_docs (path, kind, updated_at, summary, redacted, indicators, captured_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(path) DO UPDATE SET
            kind = excluded.kind,
            updated_at = excluded.updated_at,
            summary = excluded.summary,
            redacted = excluded.redacted,
            indicators = excluded.indicators,
            captured_at = excluded.captured_at",
        params![
            doc.path,
            doc.kind.as_str(),
            format_ts(&doc.updated_at),
            doc.summary,
            doc.redacted,
            serde_json::to_string(&doc.indicators)?,
            format_ts(&captured_at),
        ],
    )?;
    Ok(())
}

/// Success resets the error count and clears staleness
pub fn mark_collector_success(conn: &Connection, name: &str, at: DateTime<Utc>) -> Result<()> {
    conn.execute(
        "INSERT INTO collector_state (collector_name, last_success_at, error_count, stale, last_error)
         VALUES (?1, ?2, 0, 0, NULL)
         ON CONFLICT(collector_name) DO UPDATE SET
            last_success_at = excluded.last_success_at,
            error_count = 0,
            stale = 0,
            last_error = NULL",
        params![name, format_ts(&at)],
    )?;
    Ok(())
}

/// Failure increments the error count; `stale` is set only on the final attempt
pub fn mark_collector_failure(
    conn: &Connection,
    name: &str,
    at: DateTime<Utc>,
    error: &str,
    stale: bool,
) -> Result<()> {
    conn.execute(
        "INSERT INTO collector_state (collector_name, last_error_at, error_count, stale, last_error)
         VALUES (?1, ?2, 1, ?3, ?4)
         ON CONFLICT(collector_name) DO UPDATE SET
            last_error_at = excluded.last_error_at,
            error_count = collector_state.error_count + 1,
            stale = excluded.stale,
            last_error = excluded.last_error",
        params![name, format_ts(&at), stale, error],
    )?;
    Ok(())
}

pub fn get_stream_offset(conn: &Connection, session_id: &str) -> Result<Option<StreamOffsetRow>> {
    let row = conn
        .query_row(
            "SELECT session_id, session_key, transcript_path, last_byte_offset, last_line_number
             FROM session_stream_offsets WHERE session_id = ?1",
            params![session_id],
            |r| {
                Ok(StreamOffsetRow {
                    session_id: r.get(0)?,
                    session_key: r.get(1)?,
                    transcript_path: r.get(2)?,
                    last_byte_offset: r.get::<_, i64>(3)?.max(0) as u64,
                    last_line_number: r.get::<_, i64>(4)?.max(0) as u64,
                })
            },
        )
        .optional()?;
    Ok(row)
}

pub fn upsert_stream_offset(conn: &Connection, row: &StreamOffsetRow, at: DateTime<Utc>) -> Result<()> {
    conn.execute(
        "INSERT INTO session_stream_offsets
            (session_id, session_key, transcript_path, last_byte_offset, last_line_number, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(session_id) DO UPDATE SET
            session_key = COALESCE(excluded.session_key, session_stream_offsets.session_key),
            transcript_path = excluded.transcript_path,
            last_byte_offset = excluded.last_byte_offset,
            last_line_number = excluded.last_line_number,
            updated_at = excluded.updated_at",
        params![
            row.session_id,
            row.session_key,
            row.transcript_path,
            row.last_byte_offset as i64,
            row.last_line_number as i64,
            format_ts(&at),
        ],
    )?;
    Ok(())
}

/// Session key of the session that owns `session_id`, if polled yet
pub fn session_key_for(conn: &Connection, session_id: &str) -> Result<Option<String>> {
    let key = conn
        .query_row(
            "SELECT session_key FROM sessions WHERE session_id = ?1 LIMIT 1",
            params![session_id],
            |r| r.get(0),
        )
        .optional()?;
    Ok(key)
}

/// Returns whether the event was new
pub fn insert_session_event(conn: &Connection, row: &SessionEventRow) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT INTO session_events
            (session_id, event_id, session_key, parent_event_id, event_type, event_ts, source_line, raw_json)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(session_id, event_id) DO NOTHING",
        params![
            row.session_id,
            row.event_id,
            row.session_key,
            row.parent_event_id,
            row.event_type,
            opt_ts(row.event_ts),
            row.source_line as i64,
            serde_json::to_string(&row.raw_json)?,
        ],
    )?;
    Ok(inserted == 1)
}

pub fn upsert_session_message(conn: &Connection, row: &SessionMessageRow) -> Result<()> {
    conn.execute(
        "INSERT INTO session_messages
            (session_id, event_id, session_key, role, message_ts, text_preview, provider, model,
             stop_reason, usage_input, usage_output, usage_total)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
         ON CONFLICT(session_id, event_id) DO UPDATE SET
            session_key = COALESCE(excluded.session_key, session_messages.session_key),
            role = excluded.role,
            message_ts = excluded.message_ts,
            text_preview = excluded.text_preview,
            provider = excluded.provider,
            model = excluded.model,
            stop_reason = excluded.stop_reason,
            usage_input = excluded.usage_input,
            usage_output = excluded.usage_output,
            usage_total = excluded.usage_total",
        params![
            row.session_id,
            row.event_id,
            row.session_key,
            row.role,
            opt_ts(row.message_ts),
            row.text_preview,
            row.provider,
            row.model,
            row.stop_reason,
            row.usage_input,
            row.usage_output,
            row.usage_total,
        ],
    )?;
    Ok(())
}

/// SQL for the milliseconds between two stored timestamps, clamped at zero
fn span_duration(started: &str, finished: &str) -> String {
    format!("MAX(0, CAST(ROUND((julianday({finished}) - julianday({started})) * 86400000) AS INTEGER))")
}

/// Call side of a tool span
pub fn upsert_tool_call(conn: &Connection, row: &ToolCallRow) -> Result<()> {
    let started = "COALESCE(tool_spans.started_at, excluded.started_at)";
    let sql = format!(
        "INSERT INTO tool_spans
            (session_id, tool_call_id, session_key, tool_name, event_id_call, arguments_json, started_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(session_id, tool_call_id) DO UPDATE SET
            session_key = COALESCE(excluded.session_key, tool_spans.session_key),
            tool_name = COALESCE(excluded.tool_name, tool_spans.tool_name),
            event_id_call = excluded.event_id_call,
            arguments_json = COALESCE(excluded.arguments_json, tool_spans.arguments_json),
            started_at = {started},
            duration_ms = CASE
                WHEN {started} IS NOT NULL AND tool_spans.finished_at IS NOT NULL
                THEN {duration}
                ELSE tool_spans.duration_ms
            END",
        duration = span_duration(started, "tool_spans.finished_at"),
    );
    let arguments = row.arguments.as_ref().map(serde_json::to_string).transpose()?;
    conn.execute(
        &sql,
        params![
            row.session_id,
            row.tool_call_id,
            row.session_key,
            row.tool_name,
            row.event_id_call,
            arguments,
            opt_ts(row.started_at),
        ],
    )?;
    Ok(())
}

/// Result side of a tool span
pub fn upsert_tool_result(conn: &Connection, row: &ToolResultRow) -> Result<()> {
    let finished = "COALESCE(excluded.finished_at, tool_spans.finished_at)";
    let sql = format!(
        "INSERT INTO tool_spans
            (session_id, tool_call_id, session_key, tool_name, event_id_result, result_json, is_error, finished_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(session_id, tool_call_id) DO UPDATE SET
            session_key = COALESCE(excluded.session_key, tool_spans.session_key),
            tool_name = COALESCE(tool_spans.tool_name, excluded.tool_name),
            event_id_result = excluded.event_id_result,
            result_json = excluded.result_json,
            is_error = excluded.is_error,
            finished_at = {finished},
            duration_ms = CASE
                WHEN tool_spans.started_at IS NOT NULL AND {finished} IS NOT NULL
                THEN {duration}
                ELSE tool_spans.duration_ms
            END",
        duration = span_duration("tool_spans.started_at", finished),
    );
    let result = row.result.as_ref().map(serde_json::to_string).transpose()?;
    conn.execute(
        &sql,
        params![
            row.session_id,
            row.tool_call_id,
            row.session_key,
            row.tool_name,
            row.event_id_result,
            result,
            row.is_error,
            opt_ts(row.finished_at),
        ],
    )?;
    Ok(())
}
