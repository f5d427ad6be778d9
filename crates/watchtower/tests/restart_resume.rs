mod common;

use chrono::Utc;
use tempfile::TempDir;
use watchtower_collect::tailer::tail_all;
use watchtower_store::{read, upserts, Store};

#[test]
fn test_tailing_resumes_across_restart() {
    let temp = TempDir::new().unwrap();
    let target = common::transcript(&temp, "s1");
    common::append(
        &target.transcript_path,
        &[
            common::user_line("e1", 0, "start"),
            common::tool_call_line("e2", 1, "call-1"),
        ],
    );

    {
        let store = common::open_store(&temp);
        let conn = store.conn().unwrap();
        let report = tail_all(&conn, std::slice::from_ref(&target), Utc::now()).unwrap();
        assert_eq!(report.new_events, 2);
    }

    // Process restarts; the transcript grew meanwhile
    common::append(
        &target.transcript_path,
        &[common::tool_result_line("e3", 3, "call-1")],
    );
    let store = Store::open(&common::db_path(&temp)).unwrap();
    let conn = store.conn().unwrap();
    let offset = upserts::get_stream_offset(&conn, "s1").unwrap().unwrap();
    assert_eq!(offset.last_line_number, 2);

    let report = tail_all(&conn, std::slice::from_ref(&target), Utc::now()).unwrap();
    assert_eq!(report.lines, 1);
    assert_eq!(report.new_events, 1);

    assert_eq!(read::session_event_ids(&conn, "s1").unwrap(), vec!["e1", "e2", "e3"]);
    let spans = read::list_tool_spans(&conn, "s1").unwrap();
    assert_eq!(spans[0].duration_ms, Some(2 * 60 * 1000));

    let offset = upserts::get_stream_offset(&conn, "s1").unwrap().unwrap();
    assert_eq!(offset.last_line_number, 3);
    assert_eq!(
        offset.last_byte_offset,
        std::fs::metadata(&target.transcript_path).unwrap().len()
    );
}

#[test]
fn test_reopening_store_skips_applied_migrations() {
    let temp = TempDir::new().unwrap();
    drop(common::open_store(&temp));

    let store = Store::open(&common::db_path(&temp)).unwrap();
    let report = store
        .migrate(&watchtower_store::bundled_migrations_dir())
        .unwrap();
    assert!(report.applied.is_empty());
    assert_eq!(report.skipped, vec!["0001_init.sql"]);
}

#[test]
fn test_messages_projected_with_previews() {
    let temp = TempDir::new().unwrap();
    let target = common::transcript(&temp, "s2");
    common::append(
        &target.transcript_path,
        &[common::user_line("e1", 0, "deploy with token=abcdef0123456789")],
    );
    let store = common::open_store(&temp);
    let conn = store.conn().unwrap();
    tail_all(&conn, std::slice::from_ref(&target), Utc::now()).unwrap();

    let preview: String = conn
        .query_row(
            "SELECT text_preview FROM session_messages WHERE session_id = 's2'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert!(preview.starts_with("deploy with"));
    assert!(!preview.contains("abcdef0123456789"));
}
