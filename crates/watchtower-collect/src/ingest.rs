//! Snapshot ingestion
//!
//! Each function takes one adapter snapshot, redacts it, hashes the
//! normalized payload and writes it through the idempotent upserts. The
//! snapshot row is keyed by that hash; entity upserts run even when the
//! snapshot row already existed.

use serde_json::{json, Value};
use watchtower_core::hash::{payload_hash, sha256_hex};
use watchtower_core::redact::{redact_json, redact_text};
use watchtower_core::time::format_ts;
use watchtower_core::{
    CollectedSnapshot, CronJobRecord, CronRunRecord, CronSnapshot, MemoryDocRecord,
    SessionRecord, SessionStatus, SourceMetadata, StatusSnapshot,
};
use watchtower_store::{upserts, Connection, EventRow, MemoryDocRow, Result, SnapshotRow};

/// Rows of a list kept in a snapshot payload
const PAYLOAD_ROW_CAP: usize = 200;
const MEMORY_SUMMARY_CHARS: usize = 240;
const STATUS_SUMMARY_CHARS: usize = 2048;

/// What one ingestion wrote
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub snapshot_id: String,
    pub snapshot_inserted: bool,
    /// Entity rows upserted
    pub records: usize,
    /// Warning events newly appended
    pub warnings_logged: usize,
}

fn record_snapshot(conn: &Connection, metadata: &SourceMetadata, payload: Value) -> Result<(String, bool)> {
    let row = SnapshotRow {
        source_type: metadata.source_type,
        captured_at: metadata.captured_at,
        payload_hash: payload_hash(&payload)?,
        transport: metadata.transport,
        source_ref: metadata.source_ref.clone(),
        read_only: metadata.read_only,
        payload,
    };
    upserts::insert_snapshot(conn, &row)
}

/// One redacted event per warning. Returns how many were new.
fn record_warnings(conn: &Connection, metadata: &SourceMetadata, warnings: &[String]) -> Result<usize> {
    let category = metadata.source_type.as_str();
    let mut written = 0;
    for warning in warnings {
        let event = EventRow {
            ts: metadata.captured_at,
            category: category.to_string(),
            severity: "warning".to_string(),
            title: format!("{category}_adapter_warning"),
            details: redact_text(warning, None).value,
            source_ref: Some(metadata.source_ref.clone()),
        };
        if upserts::insert_event(conn, &event)? {
            written += 1;
        }
    }
    Ok(written)
}

pub fn ingest_sessions(conn: &Connection, snapshot: &CollectedSnapshot<Vec<SessionRecord>>) -> Result<IngestReport> {
    let sessions: Vec<SessionRecord> = snapshot
        .data
        .iter()
        .map(|session| SessionRecord {
            label: redact_text(&session.label, None).value,
            ..session.clone()
        })
        .collect();

    let active = sessions
        .iter()
        .filter(|s| s.status == SessionStatus::Active)
        .count();
    let rows: Vec<Value> = sessions
        .iter()
        .take(PAYLOAD_ROW_CAP)
        .map(|s| {
            json!({
                "sessionKey": s.session_key,
                "status": s.status.as_str(),
                "agentId": s.agent_id,
                "runType": s.run_type.as_str(),
                "lastUpdateAt": s.last_update_at.as_ref().map(format_ts),
            })
        })
        .collect();
    let payload = json!({
        "total": sessions.len(),
        "active": active,
        "sessions": rows,
    });

    let (snapshot_id, snapshot_inserted) = record_snapshot(conn, &snapshot.metadata, payload)?;
    for session in &sessions {
        upserts::upsert_session(conn, session, snapshot.metadata.captured_at)?;
    }
    let warnings_logged = record_warnings(conn, &snapshot.metadata, &snapshot.warnings)?;

    Ok(IngestReport {
        snapshot_id,
        snapshot_inserted,
        records: sessions.len(),
        warnings_logged,
    })
}

pub fn ingest_cron(conn: &Connection, snapshot: &CollectedSnapshot<CronSnapshot>) -> Result<IngestReport> {
    let jobs: Vec<CronJobRecord> = snapshot
        .data
        .jobs
        .iter()
        .map(|job| CronJobRecord {
            name: redact_text(&job.name, None).value,
            raw: redact_json(&job.raw).0,
            ..job.clone()
        })
        .collect();
    let runs: Vec<CronRunRecord> = snapshot
        .data
        .runs
        .iter()
        .map(|run| CronRunRecord {
            summary: redact_text(&run.summary, None).value,
            ..run.clone()
        })
        .collect();

    let payload = json!({
        "jobs": jobs,
        "runs": runs.iter().take(PAYLOAD_ROW_CAP).collect::<Vec<_>>(),
    });
    let (snapshot_id, snapshot_inserted) = record_snapshot(conn, &snapshot.metadata, payload)?;

    let captured_at = snapshot.metadata.captured_at;
    for job in &jobs {
        upserts::upsert_cron_job(conn, job, captured_at)?;
    }
    for run in &runs {
        upserts::upsert_cron_run(conn, run, captured_at)?;
    }
    let warnings_logged = record_warnings(conn, &snapshot.metadata, &snapshot.warnings)?;

    Ok(IngestReport {
        snapshot_id,
        snapshot_inserted,
        records: jobs.len() + runs.len(),
        warnings_logged,
    })
}

pub fn ingest_status(conn: &Connection, snapshot: &CollectedSnapshot<StatusSnapshot>) -> Result<IngestReport> {
    let status = &snapshot.data;
    let raw = redact_text(&status.raw, None);
    let errors: Vec<String> = status
        .errors
        .iter()
        .map(|error| redact_text(error, None).value)
        .collect();

    let payload = json!({
        "status": status.status.as_str(),
        "errors": errors,
        "rawSummary": raw.value.chars().take(STATUS_SUMMARY_CHARS).collect::<String>(),
        "redactionIndicators": raw.indicators,
    });
    let (snapshot_id, snapshot_inserted) = record_snapshot(conn, &snapshot.metadata, payload)?;
    let warnings_logged = record_warnings(conn, &snapshot.metadata, &snapshot.warnings)?;

    Ok(IngestReport {
        snapshot_id,
        snapshot_inserted,
        records: 1,
        warnings_logged,
    })
}

/// Memory content is redacted with its path, so excluded files never
/// contribute more than the sentinel.
pub fn ingest_memory(conn: &Connection, snapshot: &CollectedSnapshot<Vec<MemoryDocRecord>>) -> Result<IngestReport> {
    let mut docs = Vec::with_capacity(snapshot.data.len());
    let mut entries = Vec::with_capacity(snapshot.data.len());
    for doc in &snapshot.data {
        let redaction = redact_text(&doc.content, Some(&doc.path));
        entries.push(json!({
            "path": doc.path,
            "kind": doc.kind.as_str(),
            "updatedAt": format_ts(&doc.updated_at),
            "redacted": redaction.redacted,
            "indicators": redaction.indicators,
            "contentHash": sha256_hex(&redaction.value),
        }));
        docs.push(MemoryDocRow {
            path: doc.path.clone(),
            kind: doc.kind,
            updated_at: doc.updated_at,
            summary: redaction.value.chars().take(MEMORY_SUMMARY_CHARS).collect(),
            redacted: redaction.redacted,
            indicators: redaction.indicators,
        });
    }

    let (snapshot_id, snapshot_inserted) =
        record_snapshot(conn, &snapshot.metadata, Value::Array(entries))?;
    for doc in &docs {
        upserts::upsert_memory_doc(conn, doc, snapshot.metadata.captured_at)?;
    }
    let warnings_logged = record_warnings(conn, &snapshot.metadata, &snapshot.warnings)?;

    Ok(IngestReport {
        snapshot_id,
        snapshot_inserted,
        records: docs.len(),
        warnings_logged,
    })
}
