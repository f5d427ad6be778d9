//! Rule tables for classifying sessions and gateway health
//!
//! Each table is ordered; the first matching rule wins.

use crate::types::{HealthStatus, RunType, SessionStatus};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// How a rule matches a session key
#[derive(Debug, Clone, Copy)]
enum KeyPattern {
    Contains(&'static str),
    Prefix(&'static str),
}

impl KeyPattern {
    fn matches(&self, key: &str) -> bool {
        match self {
            KeyPattern::Contains(needle) => key.contains(needle),
            KeyPattern::Prefix(prefix) => key.starts_with(prefix),
        }
    }
}

const RUN_TYPE_RULES: &[(KeyPattern, RunType)] = &[
    (KeyPattern::Contains(":subagent:"), RunType::Subagent),
    (KeyPattern::Contains(":cron:"), RunType::Cron),
    (KeyPattern::Prefix("agent:main:"), RunType::Main),
    (KeyPattern::Prefix("agent:"), RunType::Agent),
];

const HEALTH_RULES: &[(&[&str], HealthStatus)] = &[
    (&["degraded", "warning"], HealthStatus::Degraded),
    (&["offline", "stopped"], HealthStatus::Offline),
    (&["healthy", "running", "ok"], HealthStatus::Ok),
];

/// Classify a session key into its run type
pub fn classify_run_type(session_key: &str) -> RunType {
    RUN_TYPE_RULES
        .iter()
        .find(|(pattern, _)| pattern.matches(session_key))
        .map(|(_, run_type)| *run_type)
        .unwrap_or(RunType::Unknown)
}

/// Agent id is the second colon-delimited segment of the key
pub fn infer_agent_id(session_key: &str) -> Option<String> {
    let mut parts = session_key.split(':');
    parts.next()?;
    parts
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

/// Session status from an explicit probe value, else from recency
pub fn derive_session_status(
    explicit: Option<&str>,
    last_update_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    active_window: Duration,
) -> SessionStatus {
    if let Some(status) = explicit {
        match status.trim().to_ascii_lowercase().as_str() {
            "active" | "running" => return SessionStatus::Active,
            "recent" | "idle" | "done" | "ended" | "completed" => return SessionStatus::Recent,
            _ => {}
        }
    }

    let Some(updated) = last_update_at else {
        return SessionStatus::Unknown;
    };
    let window_ms = i64::try_from(active_window.as_millis()).unwrap_or(i64::MAX);
    if (now - updated).num_milliseconds() <= window_ms {
        SessionStatus::Active
    } else {
        SessionStatus::Recent
    }
}

/// Keyword classification of status probe text
pub fn classify_health(raw: &str) -> HealthStatus {
    let text = raw.to_lowercase();
    HEALTH_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| text.contains(k)))
        .map(|(_, status)| *status)
        .unwrap_or(HealthStatus::Unknown)
}
