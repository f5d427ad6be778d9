use std::sync::Arc;
use std::time::Duration;
use watchtower_core::{RunType, SessionStatus};
use watchtower_sources::fake::StaticRunner;
use watchtower_sources::{CommandOutput, SessionsAdapter, SourceAdapter};

const PRIMARY: &str = "openclaw sessions list --json";
const FALLBACK: &str = "openclaw sessions --json";

fn words(line: &str) -> Vec<String> {
    line.split(' ').map(str::to_string).collect()
}

fn adapter(runner: Arc<StaticRunner>) -> SessionsAdapter {
    SessionsAdapter::new(
        runner,
        words(PRIMARY),
        words(FALLBACK),
        Duration::from_secs(600),
        500,
    )
}

#[tokio::test]
async fn test_primary_probe_used() {
    let runner = Arc::new(StaticRunner::new().respond(
        PRIMARY,
        CommandOutput::ok(r#"[{"sessionKey":"agent:main:cron:nightly","label":"Nightly"}]"#),
    ));

    let snapshot = adapter(runner.clone()).collect().await;

    assert!(snapshot.warnings.is_empty());
    assert_eq!(snapshot.data.len(), 1);
    assert_eq!(snapshot.data[0].run_type, RunType::Cron);
    assert_eq!(snapshot.data[0].label, "Nightly");
    assert_eq!(snapshot.metadata.source_ref, PRIMARY);
    assert!(snapshot.metadata.read_only);
    assert_eq!(runner.calls(), vec![PRIMARY]);
}

#[tokio::test]
async fn test_fallback_after_command_failure() {
    let runner = Arc::new(
        StaticRunner::new()
            .respond(PRIMARY, CommandOutput::failed(1, "unknown subcommand"))
            .respond(
                FALLBACK,
                CommandOutput::ok(r#"{"sessions":[{"key":"agent:ops:main","status":"active"}]}"#),
            ),
    );

    let snapshot = adapter(runner.clone()).collect().await;

    assert!(snapshot.warnings.is_empty());
    assert_eq!(snapshot.data[0].status, SessionStatus::Active);
    assert_eq!(snapshot.data[0].agent_id.as_deref(), Some("ops"));
    assert_eq!(snapshot.metadata.source_ref, FALLBACK);
    assert_eq!(runner.calls(), vec![PRIMARY, FALLBACK]);
}

#[tokio::test]
async fn test_fallback_after_non_json() {
    let runner = Arc::new(
        StaticRunner::new()
            .respond(PRIMARY, CommandOutput::ok("Sessions: 2 active"))
            .respond(FALLBACK, CommandOutput::ok("[]")),
    );

    let snapshot = adapter(runner).collect().await;
    assert!(snapshot.warnings.is_empty());
    assert!(snapshot.data.is_empty());
}

#[tokio::test]
async fn test_both_probes_failing_reports_warnings() {
    let runner = Arc::new(
        StaticRunner::new()
            .respond(PRIMARY, CommandOutput::ok("not json"))
            .respond(FALLBACK, CommandOutput::failed(2, "")),
    );

    let snapshot = adapter(runner).collect().await;

    assert!(snapshot.data.is_empty());
    assert_eq!(
        snapshot.warnings,
        vec!["sessions_output_not_json", "sessions_command_failed:unknown"]
    );
}

#[tokio::test]
async fn test_out_of_range_age_is_no_recency_signal() {
    let runner = Arc::new(StaticRunner::new().respond(
        PRIMARY,
        CommandOutput::ok(
            r#"[
                {"key":"agent:main:main","ageMs":9007199254740991},
                {"key":"agent:ops:main","ageMs":-9223372036854775808},
                {"key":"agent:qa:main","ageMs":1.0e300}
            ]"#,
        ),
    ));

    let snapshot = adapter(runner).collect().await;

    assert!(snapshot.warnings.is_empty());
    assert_eq!(snapshot.data.len(), 3);
    for session in &snapshot.data {
        assert_eq!(session.last_update_at, None, "{}", session.session_key);
        assert_eq!(session.status, SessionStatus::Unknown);
    }
}

#[tokio::test]
async fn test_small_age_still_marks_active() {
    let runner = Arc::new(StaticRunner::new().respond(
        PRIMARY,
        CommandOutput::ok(r#"[{"key":"agent:main:main","ageMs":30000}]"#),
    ));

    let snapshot = adapter(runner).collect().await;

    assert_eq!(snapshot.data[0].status, SessionStatus::Active);
    assert!(snapshot.data[0].last_update_at.is_some());
}
