//! Session-list adapter

use crate::base::{command_ref, first_i64, first_str, first_ts, object_rows, JsonObject, SourceAdapter};
use crate::probe::{run_template, CommandRunner};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use watchtower_core::classify::{classify_run_type, derive_session_status, infer_agent_id};
use watchtower_core::{
    CollectedSnapshot, SessionRecord, SourceMetadata, SourceType, Transport,
};

pub struct SessionsAdapter {
    runner: Arc<dyn CommandRunner>,
    primary: Vec<String>,
    fallback: Vec<String>,
    active_window: Duration,
    limit: usize,
}

impl SessionsAdapter {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        primary: Vec<String>,
        fallback: Vec<String>,
        active_window: Duration,
        limit: usize,
    ) -> Self {
        Self {
            runner,
            primary,
            fallback,
            active_window,
            limit,
        }
    }

    /// Run one probe; `Err` carries the warning for this attempt
    async fn probe(&self, template: &[String]) -> Result<Value, String> {
        let output = run_template(self.runner.as_ref(), template).await;
        if !output.success() {
            return Err(format!("sessions_command_failed:{}", output.failure_text()));
        }
        serde_json::from_str(&output.stdout).map_err(|_| "sessions_output_not_json".to_string())
    }
}

#[async_trait]
impl SourceAdapter for SessionsAdapter {
    type Data = Vec<SessionRecord>;

    fn source_type(&self) -> SourceType {
        SourceType::Sessions
    }

    async fn collect(&self) -> CollectedSnapshot<Vec<SessionRecord>> {
        let mut metadata = SourceMetadata::new(
            SourceType::Sessions,
            Transport::Command,
            command_ref(&self.primary),
        );
        let now = metadata.captured_at;

        let parsed = match self.probe(&self.primary).await {
            Ok(value) => Ok(value),
            Err(primary_warning) => {
                tracing::debug!(warning = %primary_warning, "primary session probe failed, trying fallback");
                match self.probe(&self.fallback).await {
                    Ok(value) => {
                        metadata.source_ref = command_ref(&self.fallback);
                        Ok(value)
                    }
                    Err(fallback_warning) => Err(vec![primary_warning, fallback_warning]),
                }
            }
        };

        match parsed {
            Ok(value) => CollectedSnapshot {
                metadata,
                data: normalize_sessions(&value, now, self.active_window, self.limit),
                warnings: Vec::new(),
            },
            Err(warnings) => CollectedSnapshot {
                metadata,
                data: Vec::new(),
                warnings,
            },
        }
    }
}

/// Normalize any accepted session-list shape
pub fn normalize_sessions(
    value: &Value,
    now: DateTime<Utc>,
    active_window: Duration,
    limit: usize,
) -> Vec<SessionRecord> {
    object_rows(value, "sessions")
        .into_iter()
        .take(limit)
        .map(|row| normalize_session(row, now, active_window))
        .collect()
}

fn normalize_session(row: &JsonObject, now: DateTime<Utc>, active_window: Duration) -> SessionRecord {
    let session_key = first_str(row, &["sessionKey", "session_key", "key", "id"])
        .unwrap_or_else(|| "unknown".to_string());

    let last_update_at = first_ts(row, &["updatedAt", "lastUpdateAt", "updated_at"]).or_else(|| {
        first_i64(row, &["ageMs", "age_ms"]).and_then(|age| {
            // An age outside chrono's range carries no recency signal
            ChronoDuration::try_milliseconds(age).and_then(|age| now.checked_sub_signed(age))
        })
    });
    let explicit_status = first_str(row, &["status"]);

    SessionRecord {
        session_id: first_str(row, &["sessionId", "session_id"]),
        label: first_str(row, &["label", "displayName"]).unwrap_or_else(|| "unlabeled".to_string()),
        status: derive_session_status(explicit_status.as_deref(), last_update_at, now, active_window),
        started_at: first_ts(row, &["startedAt", "started_at"]),
        ended_at: first_ts(row, &["endedAt", "ended_at"]),
        runtime_ms: first_i64(row, &["runtimeMs", "runtime_ms"]),
        model: first_str(row, &["model"]),
        agent_id: first_str(row, &["agentId", "agent_id"]).or_else(|| infer_agent_id(&session_key)),
        session_kind: first_str(row, &["sessionKind", "kind"]),
        run_type: classify_run_type(&session_key),
        last_update_at,
        session_key,
    }
}
