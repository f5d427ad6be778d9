//! Read-model queries over the persisted record

use crate::error::Result;
use crate::types::{
    CollectorStateView, CronJobDetail, CronJobView, CronRunView, EventView, MemoryDocView,
    SessionView, StatusView, ToolSpanView,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::collections::HashMap;
use watchtower_core::time::parse_ts_str;

/// Sessions by most recent update, with `elapsed_ms` derived for active ones
pub fn list_sessions(conn: &Connection, now: DateTime<Utc>, limit: usize) -> Result<Vec<SessionView>> {
    let mut stmt = conn.prepare(
        "SELECT session_key, session_id, label, status, started_at, ended_at, runtime_ms, model,
                agent_id, session_kind, run_type, last_update_at
         FROM sessions
         ORDER BY COALESCE(last_update_at, updated_at) DESC
         LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit as i64], |r| {
        Ok(SessionView {
            session_key: r.get(0)?,
            session_id: r.get(1)?,
            label: r.get(2)?,
            status: r.get(3)?,
            started_at: r.get(4)?,
            ended_at: r.get(5)?,
            runtime_ms: r.get(6)?,
            elapsed_ms: None,
            model: r.get(7)?,
            agent_id: r.get(8)?,
            session_kind: r.get(9)?,
            run_type: r.get(10)?,
            last_update_at: r.get(11)?,
        })
    })?;

    let mut sessions = Vec::new();
    for row in rows {
        let mut session = row?;
        if session.status == "active" {
            session.elapsed_ms = session
                .started_at
                .as_deref()
                .and_then(parse_ts_str)
                .map(|started| (now - started).num_milliseconds().max(0));
        }
        sessions.push(session);
    }
    Ok(sessions)
}

fn detail_from_raw(raw: &Value) -> CronJobDetail {
    CronJobDetail {
        schedule: raw.get("schedule").cloned(),
        delivery: raw.get("delivery").cloned(),
        state: raw.get("state").cloned(),
        description: raw
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

/// Raw job objects from the most recent cron snapshot, by job id
fn latest_cron_details(conn: &Connection) -> Result<HashMap<String, CronJobDetail>> {
    let payload: Option<String> = conn
        .query_row(
            "SELECT payload FROM source_snapshots
             WHERE source_type = 'cron'
             ORDER BY captured_at DESC LIMIT 1",
            [],
            |r| r.get(0),
        )
        .optional()?;

    let mut details = HashMap::new();
    let Some(payload) = payload else {
        return Ok(details);
    };
    let payload: Value = serde_json::from_str(&payload)?;
    if let Some(jobs) = payload.get("jobs").and_then(Value::as_array) {
        for job in jobs {
            let id = job.get("jobId").and_then(Value::as_str);
            if let (Some(id), Some(raw)) = (id, job.get("raw")) {
                details.insert(id.to_string(), detail_from_raw(raw));
            }
        }
    }
    Ok(details)
}

/// Jobs with rich detail rebuilt from the latest cron snapshot
pub fn list_cron_jobs(conn: &Connection) -> Result<Vec<CronJobView>> {
    let mut details = latest_cron_details(conn)?;
    let mut stmt = conn.prepare(
        "SELECT job_id, name, schedule_kind, enabled, next_run_at FROM cron_jobs ORDER BY name, job_id",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok(CronJobView {
            job_id: r.get(0)?,
            name: r.get(1)?,
            schedule_kind: r.get(2)?,
            enabled: r.get(3)?,
            next_run_at: r.get(4)?,
            detail: None,
        })
    })?;

    let mut jobs = Vec::new();
    for row in rows {
        let mut job = row?;
        job.detail = details.remove(&job.job_id);
        jobs.push(job);
    }
    Ok(jobs)
}

pub fn list_cron_runs(conn: &Connection, job_id: Option<&str>, limit: usize) -> Result<Vec<CronRunView>> {
    let mut stmt = conn.prepare(
        "SELECT run_id, job_id, status, started_at, ended_at, summary FROM cron_runs
         WHERE ?1 IS NULL OR job_id = ?1
         ORDER BY started_at DESC LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![job_id, limit as i64], |r| {
        Ok(CronRunView {
            run_id: r.get(0)?,
            job_id: r.get(1)?,
            status: r.get(2)?,
            started_at: r.get(3)?,
            ended_at: r.get(4)?,
            summary: r.get(5)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<_, _>>()?)
}

pub fn list_collector_states(conn: &Connection) -> Result<Vec<CollectorStateView>> {
    let mut stmt = conn.prepare(
        "SELECT collector_name, last_success_at, last_error_at, error_count, stale, last_error
         FROM collector_state ORDER BY collector_name",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok(CollectorStateView {
            collector_name: r.get(0)?,
            last_success_at: r.get(1)?,
            last_error_at: r.get(2)?,
            error_count: r.get(3)?,
            stale: r.get(4)?,
            last_error: r.get(5)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<_, _>>()?)
}

pub fn get_collector_state(conn: &Connection, name: &str) -> Result<Option<CollectorStateView>> {
    Ok(list_collector_states(conn)?
        .into_iter()
        .find(|state| state.collector_name == name))
}

/// Newest first
pub fn recent_events(conn: &Connection, limit: usize) -> Result<Vec<EventView>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, ts, category, severity, title, details, source_ref
         FROM events ORDER BY ts DESC, rowid DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit as i64], |r| {
        Ok(EventView {
            event_id: r.get(0)?,
            ts: r.get(1)?,
            category: r.get(2)?,
            severity: r.get(3)?,
            title: r.get(4)?,
            details: r.get(5)?,
            source_ref: r.get(6)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<_, _>>()?)
}

pub fn list_memory_docs(conn: &Connection) -> Result<Vec<MemoryDocView>> {
    let mut stmt = conn.prepare(
        "SELECT path, kind, updated_at, summary, redacted FROM memory_docs ORDER BY kind, path",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok(MemoryDocView {
            path: r.get(0)?,
            kind: r.get(1)?,
            updated_at: r.get(2)?,
            summary: r.get(3)?,
            redacted: r.get(4)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<_, _>>()?)
}

/// Status snapshots, newest first
pub fn status_history(conn: &Connection, limit: usize) -> Result<Vec<StatusView>> {
    let mut stmt = conn.prepare(
        "SELECT captured_at, payload FROM source_snapshots
         WHERE source_type = 'status'
         ORDER BY captured_at DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit as i64], |r| {
        Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
    })?;

    let mut history = Vec::new();
    for row in rows {
        let (captured_at, payload) = row?;
        history.push(StatusView {
            captured_at,
            payload: serde_json::from_str(&payload)?,
        });
    }
    Ok(history)
}

pub fn latest_status(conn: &Connection) -> Result<Option<StatusView>> {
    Ok(status_history(conn, 1)?.into_iter().next())
}

pub fn list_tool_spans(conn: &Connection, session_id: &str) -> Result<Vec<ToolSpanView>> {
    let mut stmt = conn.prepare(
        "SELECT session_id, tool_call_id, tool_name, is_error, started_at, finished_at, duration_ms
         FROM tool_spans WHERE session_id = ?1 ORDER BY COALESCE(started_at, finished_at), tool_call_id",
    )?;
    let rows = stmt.query_map(params![session_id], |r| {
        Ok(ToolSpanView {
            session_id: r.get(0)?,
            tool_call_id: r.get(1)?,
            tool_name: r.get(2)?,
            is_error: r.get(3)?,
            started_at: r.get(4)?,
            finished_at: r.get(5)?,
            duration_ms: r.get(6)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<_, _>>()?)
}

/// Event ids stored for a session, in transcript order
pub fn session_event_ids(conn: &Connection, session_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT event_id FROM session_events WHERE session_id = ?1 ORDER BY source_line, event_id",
    )?;
    let rows = stmt.query_map(params![session_id], |r| r.get(0))?;
    Ok(rows.collect::<std::result::Result<_, _>>()?)
}
