//! The four source adapters wired from configuration

use crate::cron::CronAdapter;
use crate::fs::{FileSource, LocalFs};
use crate::memory::MemoryAdapter;
use crate::probe::{CommandRunner, TokioCommandRunner};
use crate::sessions::SessionsAdapter;
use crate::status::StatusAdapter;
use std::sync::Arc;
use watchtower_core::AppConfig;

/// All adapters, sharing one command runner and one filesystem
pub struct SourceSet {
    pub sessions: SessionsAdapter,
    pub cron: CronAdapter,
    pub status: StatusAdapter,
    pub memory: MemoryAdapter,
}

impl SourceSet {
    /// Build adapters over injected probe primitives
    pub fn new(config: &AppConfig, runner: Arc<dyn CommandRunner>, fs: Arc<dyn FileSource>) -> Self {
        let commands = &config.commands;
        Self {
            sessions: SessionsAdapter::new(
                runner.clone(),
                commands.sessions.clone(),
                commands.sessions_fallback.clone(),
                config.session_active_window,
                config.sessions_list_limit,
            ),
            cron: CronAdapter::new(runner.clone(), commands.cron.clone()),
            status: StatusAdapter::new(runner, commands.status.clone()),
            memory: MemoryAdapter::new(fs, config.workspace_root.clone())
                .with_timeout(config.probe_timeout),
        }
    }

    /// Build adapters over real subprocesses and the local filesystem
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config,
            Arc::new(TokioCommandRunner::new(config.probe_timeout)),
            Arc::new(LocalFs),
        )
    }
}
