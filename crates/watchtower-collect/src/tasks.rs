//! The collector tasks wired from configuration

use crate::cadence::Cadence;
use crate::ingest::{ingest_cron, ingest_memory, ingest_sessions, ingest_status, IngestReport};
use crate::ledger::on_store;
use crate::scheduler::CollectorTask;
use crate::tailer::{resolve_targets, tail_all};
use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use watchtower_core::{AppConfig, CollectedSnapshot};
use watchtower_sources::{CommandRunner, FileSource, SourceAdapter, SourceSet};
use watchtower_store::{Connection, Store};

pub const SESSIONS_HOT: &str = "sessions_hot";
pub const CRON_HOT: &str = "cron_hot";
pub const HEALTH_HOT: &str = "health_hot";
pub const MEMORY_WARM: &str = "memory_warm";
pub const SESSION_STREAM_HOT: &str = "session_stream_hot";

pub const TASK_NAMES: [&str; 5] = [
    SESSIONS_HOT,
    CRON_HOT,
    HEALTH_HOT,
    MEMORY_WARM,
    SESSION_STREAM_HOT,
];

pub type IngestFn<D> = fn(&Connection, &CollectedSnapshot<D>) -> watchtower_store::Result<IngestReport>;

/// Collect from one adapter, then ingest the snapshot
pub struct SourceTask<A: SourceAdapter> {
    name: &'static str,
    cadence: Cadence,
    adapter: A,
    store: Store,
    ingest: IngestFn<A::Data>,
}

impl<A: SourceAdapter> SourceTask<A> {
    pub fn new(name: &'static str, cadence: Cadence, adapter: A, store: Store, ingest: IngestFn<A::Data>) -> Self {
        Self {
            name,
            cadence,
            adapter,
            store,
            ingest,
        }
    }
}

#[async_trait]
impl<A> CollectorTask for SourceTask<A>
where
    A: SourceAdapter + 'static,
    A::Data: 'static,
{
    fn name(&self) -> &str {
        self.name
    }

    fn cadence(&self) -> Cadence {
        self.cadence
    }

    async fn run(&self) -> anyhow::Result<()> {
        let snapshot = self.adapter.collect().await;
        let ingest = self.ingest;
        let report = on_store(&self.store, move |conn| ingest(conn, &snapshot)).await?;
        debug!(
            collector = self.name,
            source = %self.adapter.source_type(),
            records = report.records,
            snapshot_inserted = report.snapshot_inserted,
            warnings = report.warnings_logged,
            "snapshot ingested"
        );
        Ok(())
    }
}

/// Tail every known transcript
pub struct TranscriptTask {
    cadence: Cadence,
    runner: Arc<dyn CommandRunner>,
    command: Vec<String>,
    agents_root: PathBuf,
    scan_timeout: Duration,
    store: Store,
}

impl TranscriptTask {
    pub fn new(config: &AppConfig, runner: Arc<dyn CommandRunner>, store: Store) -> Self {
        Self {
            cadence: Cadence::hot(config),
            runner,
            command: config.commands.transcripts.clone(),
            agents_root: config.agents_root.clone(),
            scan_timeout: config.probe_timeout,
            store,
        }
    }
}

#[async_trait]
impl CollectorTask for TranscriptTask {
    fn name(&self) -> &str {
        SESSION_STREAM_HOT
    }

    fn cadence(&self) -> Cadence {
        self.cadence
    }

    async fn run(&self) -> anyhow::Result<()> {
        let targets = resolve_targets(
            self.runner.as_ref(),
            &self.command,
            &self.agents_root,
            self.scan_timeout,
        )
        .await;
        let report = on_store(&self.store, move |conn| tail_all(conn, &targets, Utc::now())).await?;
        debug!(
            collector = SESSION_STREAM_HOT,
            targets = report.targets,
            unreadable = report.unreadable,
            lines = report.lines,
            new_events = report.new_events,
            truncated = report.truncated,
            "transcripts tailed"
        );
        Ok(())
    }
}

/// All five collector tasks over the given probe primitives
pub fn collector_tasks(
    config: &AppConfig,
    runner: Arc<dyn CommandRunner>,
    fs: Arc<dyn FileSource>,
    store: Store,
) -> Vec<Arc<dyn CollectorTask>> {
    let sources = SourceSet::new(config, runner.clone(), fs);
    let mut tasks: Vec<Arc<dyn CollectorTask>> = Vec::with_capacity(TASK_NAMES.len());
    tasks.push(Arc::new(SourceTask::new(
        SESSIONS_HOT,
        Cadence::hot(config),
        sources.sessions,
        store.clone(),
        ingest_sessions,
    )));
    tasks.push(Arc::new(SourceTask::new(
        CRON_HOT,
        Cadence::hot(config),
        sources.cron,
        store.clone(),
        ingest_cron,
    )));
    tasks.push(Arc::new(SourceTask::new(
        HEALTH_HOT,
        Cadence::hot(config),
        sources.status,
        store.clone(),
        ingest_status,
    )));
    tasks.push(Arc::new(SourceTask::new(
        MEMORY_WARM,
        Cadence::warm(config),
        sources.memory,
        store.clone(),
        ingest_memory,
    )));
    tasks.push(Arc::new(TranscriptTask::new(config, runner, store)));
    tasks
}
