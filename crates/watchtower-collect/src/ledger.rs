//! Collector health ledger

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use watchtower_core::redact::redact_text;
use watchtower_store::{upserts, Connection, EventRow, Store};

/// Where the scheduler records the outcome of every attempt
#[async_trait]
pub trait CollectorLedger: Send + Sync {
    async fn record_success(&self, collector: &str, at: DateTime<Utc>) -> anyhow::Result<()>;

    /// A failed attempt; `stale` is set on the final attempt of a cycle
    async fn record_failure(
        &self,
        collector: &str,
        at: DateTime<Utc>,
        error: &str,
        stale: bool,
    ) -> anyhow::Result<()>;

    /// A cycle that exhausted its retries
    async fn record_permanent_failure(
        &self,
        collector: &str,
        at: DateTime<Utc>,
        error: &str,
    ) -> anyhow::Result<()>;
}

/// Run blocking store work off the async runtime
pub async fn on_store<F, T>(store: &Store, work: F) -> anyhow::Result<T>
where
    F: FnOnce(&Connection) -> watchtower_store::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let store = store.clone();
    let value = tokio::task::spawn_blocking(move || {
        let conn = store.conn()?;
        work(&conn)
    })
    .await??;
    Ok(value)
}

#[async_trait]
impl CollectorLedger for Store {
    async fn record_success(&self, collector: &str, at: DateTime<Utc>) -> anyhow::Result<()> {
        let collector = collector.to_string();
        on_store(self, move |conn| upserts::mark_collector_success(conn, &collector, at)).await
    }

    async fn record_failure(
        &self,
        collector: &str,
        at: DateTime<Utc>,
        error: &str,
        stale: bool,
    ) -> anyhow::Result<()> {
        let collector = collector.to_string();
        let error = redact_text(error, None).value;
        on_store(self, move |conn| {
            upserts::mark_collector_failure(conn, &collector, at, &error, stale)
        })
        .await
    }

    async fn record_permanent_failure(
        &self,
        collector: &str,
        at: DateTime<Utc>,
        error: &str,
    ) -> anyhow::Result<()> {
        let event = EventRow {
            ts: at,
            category: "collector".to_string(),
            severity: "error".to_string(),
            title: format!("{collector}_failed"),
            details: redact_text(error, None).value,
            source_ref: Some(collector.to_string()),
        };
        on_store(self, move |conn| upserts::insert_event(conn, &event).map(|_| ())).await
    }
}
