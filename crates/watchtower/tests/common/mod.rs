use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use watchtower_store::{bundled_migrations_dir, Store};
use watchtower_transcript::TranscriptTarget;

/// A migrated file-backed store inside `temp`
pub fn open_store(temp: &TempDir) -> Store {
    let store = Store::open(&temp.path().join("watchtower.db")).unwrap();
    store.migrate(&bundled_migrations_dir()).unwrap();
    store
}

pub fn transcript(temp: &TempDir, session_id: &str) -> TranscriptTarget {
    TranscriptTarget {
        session_id: session_id.to_string(),
        transcript_path: temp.path().join(format!("{session_id}.jsonl")),
    }
}

pub fn append(path: &Path, lines: &[String]) {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
}

pub fn user_line(id: &str, minute: u32, text: &str) -> String {
    format!(
        r#"{{"type":"message","id":"{id}","timestamp":"2024-05-01T10:{minute:02}:00.000Z","message":{{"role":"user","content":[{{"type":"text","text":"{text}"}}]}}}}"#
    )
}

pub fn tool_call_line(id: &str, minute: u32, call_id: &str) -> String {
    format!(
        r#"{{"type":"message","id":"{id}","timestamp":"2024-05-01T10:{minute:02}:00.000Z","message":{{"role":"assistant","content":[{{"type":"toolCall","id":"{call_id}","name":"exec","arguments":{{"cmd":"ls"}}}}]}}}}"#
    )
}

pub fn tool_result_line(id: &str, minute: u32, call_id: &str) -> String {
    format!(
        r#"{{"type":"message","id":"{id}","timestamp":"2024-05-01T10:{minute:02}:00.000Z","message":{{"role":"toolResult","toolCallId":"{call_id}","toolName":"exec","content":[{{"type":"text","text":"ok"}}]}}}}"#
    )
}

pub fn db_path(temp: &TempDir) -> PathBuf {
    temp.path().join("watchtower.db")
}
