pub mod collect;
pub mod migrate;
pub mod run;
pub mod status;
pub mod version;

use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use watchtower_collect::{collector_tasks, RetryPolicy, Scheduler};
use watchtower_core::AppConfig;
use watchtower_sources::{LocalFs, TokioCommandRunner};
use watchtower_store::{bundled_migrations_dir, MigrationReport, Store};

pub fn load_config() -> anyhow::Result<AppConfig> {
    AppConfig::from_env().context("invalid configuration")
}

/// The configured migrations directory, or the bundled one when the
/// configured path does not exist
pub fn migrations_dir(config: &AppConfig) -> PathBuf {
    if config.migrations_dir.is_dir() {
        return config.migrations_dir.clone();
    }
    let bundled = bundled_migrations_dir();
    if bundled.is_dir() {
        bundled
    } else {
        config.migrations_dir.clone()
    }
}

/// Open the store and bring its schema up to date. Any migration error is
/// fatal.
pub fn open_store(config: &AppConfig) -> anyhow::Result<(Store, MigrationReport)> {
    let store = Store::open(&config.database_path)
        .with_context(|| format!("opening {}", config.database_path.display()))?;
    let dir = migrations_dir(config);
    let report = store
        .migrate(&dir)
        .with_context(|| format!("applying migrations from {}", dir.display()))?;
    info!(
        database = %config.database_path.display(),
        applied = report.applied.len(),
        skipped = report.skipped.len(),
        "store ready"
    );
    Ok((store, report))
}

/// Scheduler with every collector over real probes
pub fn scheduler(config: &AppConfig, store: Store) -> Scheduler {
    let runner = Arc::new(TokioCommandRunner::new(config.probe_timeout));
    let mut scheduler = Scheduler::new(Arc::new(store.clone()), RetryPolicy::from_config(config));
    for task in collector_tasks(config, runner, Arc::new(LocalFs), store) {
        scheduler.register(task);
    }
    scheduler
}

#[cfg(test)]
pub(crate) mod testing {
    use tempfile::TempDir;
    use watchtower_core::AppConfig;

    /// Config rooted in a scratch directory with nothing to probe
    pub fn scratch_config(temp: &TempDir) -> AppConfig {
        let mut config = AppConfig::new();
        config.database_path = temp.path().join("db").join("watchtower.db");
        config.migrations_dir = temp.path().join("no-such-dir");
        config.workspace_root = temp.path().join("workspace");
        config.agents_root = temp.path().join("agents");
        config
    }
}

#[cfg(test)]
mod tests {
    use super::testing::scratch_config;
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_missing_migrations_dir_uses_bundled() {
        let temp = TempDir::new().unwrap();
        let config = scratch_config(&temp);
        assert_eq!(migrations_dir(&config), bundled_migrations_dir());
    }

    #[test]
    fn test_open_store_migrates_once() {
        let temp = TempDir::new().unwrap();
        let config = scratch_config(&temp);

        let (_, first) = open_store(&config).unwrap();
        assert!(!first.applied.is_empty());
        let (_, second) = open_store(&config).unwrap();
        assert!(second.applied.is_empty());
    }

    #[test]
    fn test_scheduler_registers_every_collector() {
        let temp = TempDir::new().unwrap();
        let config = scratch_config(&temp);
        let (store, _) = open_store(&config).unwrap();
        let scheduler = scheduler(&config, store);
        assert_eq!(scheduler.task_names(), watchtower_collect::TASK_NAMES.to_vec());
    }

    #[test]
    #[serial]
    fn test_load_config_rejects_bad_env() {
        std::env::set_var("HOT_INTERVAL_MS", "soon");
        let result = load_config();
        std::env::remove_var("HOT_INTERVAL_MS");
        let err = result.unwrap_err();
        assert!(format!("{err:#}").contains("HOT_INTERVAL_MS"));
    }
}
