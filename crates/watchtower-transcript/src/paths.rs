//! Transcript target resolution

use crate::types::TranscriptTarget;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Upper bound on transcripts tailed in one pass
pub const MAX_TARGETS: usize = 120;

/// Targets from a `{sessions: [{sessionId, transcriptPath}]}` probe payload
pub fn parse_targets(value: &Value) -> Vec<TranscriptTarget> {
    let Some(rows) = value.get("sessions").and_then(Value::as_array) else {
        return Vec::new();
    };

    rows.iter()
        .filter_map(|row| {
            let session_id = row.get("sessionId")?.as_str()?;
            let transcript_path = row.get("transcriptPath")?.as_str()?;
            if session_id.is_empty() || transcript_path.is_empty() {
                return None;
            }
            Some(TranscriptTarget {
                session_id: session_id.to_string(),
                transcript_path: PathBuf::from(transcript_path),
            })
        })
        .take(MAX_TARGETS)
        .collect()
}

/// Session id from a transcript file name: the stem before any `-topic-`
pub fn session_id_from_file(path: &Path) -> Option<String> {
    let stem = path.file_name()?.to_str()?.strip_suffix(".jsonl")?;
    let id = stem.split("-topic-").next().unwrap_or(stem);
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// Scan `<agents_root>/<agent>/sessions/*.jsonl`
pub fn discover_targets(agents_root: &Path) -> Vec<TranscriptTarget> {
    let Ok(agents) = std::fs::read_dir(agents_root) else {
        return Vec::new();
    };

    let mut agent_dirs: Vec<PathBuf> = agents
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|entry| entry.path())
        .collect();
    agent_dirs.sort();

    let mut targets = Vec::new();
    for agent_dir in agent_dirs {
        let Ok(entries) = std::fs::read_dir(agent_dir.join("sessions")) else {
            continue;
        };
        let mut files: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .collect();
        files.sort();

        for path in files {
            let Some(session_id) = session_id_from_file(&path) else {
                continue;
            };
            targets.push(TranscriptTarget {
                session_id,
                transcript_path: path,
            });
            if targets.len() >= MAX_TARGETS {
                return targets;
            }
        }
    }
    targets
}
