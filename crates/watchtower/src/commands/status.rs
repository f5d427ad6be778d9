use super::{load_config, open_store};
use serde_json::{json, Value};
use watchtower_store::{read, Store};

/// Collector health, latest gateway status and recent events
pub fn status_report(store: &Store, events: usize) -> anyhow::Result<Value> {
    let conn = store.conn()?;
    let collectors = read::list_collector_states(&conn)?;
    let latest = read::latest_status(&conn)?;
    let recent = read::recent_events(&conn, events)?;

    Ok(json!({
        "collectors": collectors,
        "stale": collectors.iter().filter(|c| c.stale).map(|c| c.collector_name.as_str()).collect::<Vec<_>>(),
        "gateway": latest,
        "events": recent,
    }))
}

pub fn run(events: usize) -> anyhow::Result<()> {
    let config = load_config()?;
    let (store, _) = open_store(&config)?;
    let report = status_report(&store, events)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::scratch_config;
    use tempfile::TempDir;
    use watchtower_store::upserts;

    #[test]
    fn test_status_report_lists_stale_collectors() {
        let temp = TempDir::new().unwrap();
        let (store, _) = open_store(&scratch_config(&temp)).unwrap();
        {
            let conn = store.conn().unwrap();
            let now = chrono::Utc::now();
            upserts::mark_collector_success(&conn, "cron_hot", now).unwrap();
            upserts::mark_collector_failure(&conn, "health_hot", now, "exit 1", true).unwrap();
        }

        let report = status_report(&store, 5).unwrap();
        assert_eq!(report["collectors"].as_array().unwrap().len(), 2);
        assert_eq!(report["stale"], json!(["health_hot"]));
        assert_eq!(report["gateway"], Value::Null);
    }
}
