//! Scheduled-job adapter

use crate::base::{command_ref, first_str, first_ts, object_rows, truthy, JsonObject, SourceAdapter};
use crate::probe::{run_template, CommandRunner};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use watchtower_core::time::parse_ts;
use watchtower_core::{
    CollectedSnapshot, CronJobRecord, CronRunRecord, CronSnapshot, SourceMetadata, SourceType,
    Transport,
};

pub struct CronAdapter {
    runner: Arc<dyn CommandRunner>,
    command: Vec<String>,
}

impl CronAdapter {
    pub fn new(runner: Arc<dyn CommandRunner>, command: Vec<String>) -> Self {
        Self { runner, command }
    }
}

#[async_trait]
impl SourceAdapter for CronAdapter {
    type Data = CronSnapshot;

    fn source_type(&self) -> SourceType {
        SourceType::Cron
    }

    async fn collect(&self) -> CollectedSnapshot<CronSnapshot> {
        let metadata = SourceMetadata::new(SourceType::Cron, Transport::Command, command_ref(&self.command));
        let output = run_template(self.runner.as_ref(), &self.command).await;

        let mut warnings = Vec::new();
        let data = if !output.success() {
            warnings.push(format!("cron_command_failed:{}", output.failure_text()));
            CronSnapshot::default()
        } else {
            match serde_json::from_str::<Value>(&output.stdout) {
                Ok(value) => normalize_cron(&value),
                Err(_) => {
                    warnings.push("cron_output_not_json".to_string());
                    CronSnapshot::default()
                }
            }
        };

        CollectedSnapshot {
            metadata,
            data,
            warnings,
        }
    }
}

/// Normalize `{jobs, runs}` or a bare job array
pub fn normalize_cron(value: &Value) -> CronSnapshot {
    CronSnapshot {
        jobs: object_rows(value, "jobs").into_iter().map(normalize_job).collect(),
        runs: object_rows(value, "runs").into_iter().map(normalize_run).collect(),
    }
}

fn nested<'a>(row: &'a JsonObject, outer: &str, inner: &str) -> Option<&'a Value> {
    row.get(outer).and_then(|v| v.get(inner))
}

fn normalize_job(row: &JsonObject) -> CronJobRecord {
    CronJobRecord {
        job_id: first_str(row, &["jobId", "job_id", "id"]).unwrap_or_else(|| "unknown".to_string()),
        name: first_str(row, &["name"]).unwrap_or_else(|| "unnamed".to_string()),
        schedule_kind: first_str(row, &["scheduleKind", "schedule_kind"])
            .or_else(|| nested(row, "schedule", "kind").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| "unknown".to_string()),
        enabled: truthy(row.get("enabled")),
        next_run_at: first_ts(row, &["nextRunAt", "next_run_at"])
            .or_else(|| nested(row, "state", "nextRunAtMs").and_then(parse_ts)),
        raw: Value::Object(row.clone()),
    }
}

fn normalize_run(row: &JsonObject) -> CronRunRecord {
    CronRunRecord {
        run_id: first_str(row, &["runId", "run_id", "id"]).unwrap_or_else(|| "unknown".to_string()),
        job_id: first_str(row, &["jobId", "job_id"]).unwrap_or_else(|| "unknown".to_string()),
        status: first_str(row, &["status"]).unwrap_or_else(|| "unknown".to_string()),
        started_at: first_ts(row, &["startedAt", "started_at"]),
        ended_at: first_ts(row, &["endedAt", "ended_at"]),
        summary: first_str(row, &["summary"]).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_jobs_normalized_with_defaults() {
        let value = json!({"jobs": [
            {"id": "job-1", "name": "Sweep", "enabled": 1},
            {"jobId": "job-2", "enabled": false}
        ]});
        let snapshot = normalize_cron(&value);

        assert_eq!(snapshot.jobs.len(), 2);
        assert!(snapshot.jobs[0].enabled);
        assert_eq!(snapshot.jobs[0].name, "Sweep");
        assert!(!snapshot.jobs[1].enabled);
        assert_eq!(snapshot.jobs[1].name, "unnamed");
        assert_eq!(snapshot.jobs[1].schedule_kind, "unknown");
        assert!(snapshot.runs.is_empty());
    }

    #[test]
    fn test_nested_schedule_and_state() {
        let value = json!([{
            "id": "j",
            "schedule": {"kind": "cron", "expr": "0 * * * *"},
            "state": {"nextRunAtMs": 1_700_000_000_000i64}
        }]);
        let job = &normalize_cron(&value).jobs[0];
        assert_eq!(job.schedule_kind, "cron");
        assert_eq!(job.next_run_at.map(|t| t.timestamp_millis()), Some(1_700_000_000_000));
        assert_eq!(job.raw["schedule"]["expr"], "0 * * * *");
    }

    #[test]
    fn test_runs_normalized() {
        let value = json!({"jobs": [], "runs": [{"runId": "r1", "jobId": "j1", "startedAt": "2024-01-01T00:00:00Z"}, {}]});
        let runs = normalize_cron(&value).runs;
        assert_eq!(runs[0].run_id, "r1");
        assert_eq!(runs[0].status, "unknown");
        assert_eq!(runs[0].summary, "");
        assert!(runs[0].started_at.is_some());
        assert_eq!(runs[1].job_id, "unknown");
    }
}
