//! Configuration for collectors and probes

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors surfaced at startup
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {name}: {value}")]
    Invalid { name: &'static str, value: String },

    #[error("invalid command template in {name}: {reason}")]
    Command { name: &'static str, reason: String },
}

/// Command templates for the read-only probes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeCommands {
    pub sessions: Vec<String>,
    pub sessions_fallback: Vec<String>,
    pub cron: Vec<String>,
    pub status: Vec<String>,
    pub transcripts: Vec<String>,
}

impl ProbeCommands {
    pub fn new() -> Self {
        Self {
            sessions: words(&["openclaw", "sessions", "list", "--json"]),
            sessions_fallback: words(&["openclaw", "sessions", "--json"]),
            cron: words(&["openclaw", "cron", "list", "--json"]),
            status: words(&["openclaw", "gateway", "status"]),
            transcripts: words(&["openclaw", "sessions", "--json"]),
        }
    }
}

impl Default for ProbeCommands {
    fn default() -> Self {
        Self::new()
    }
}

fn words(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

/// Collector configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Directory holding `*.sql` migrations
    pub migrations_dir: PathBuf,

    /// Agent workspace (core docs + `memory/`)
    pub workspace_root: PathBuf,

    /// Root of per-agent transcript directories
    pub agents_root: PathBuf,

    /// HOT cadence: frequent, cheap sources
    pub hot_interval: Duration,

    /// WARM cadence: infrequent, expensive sources
    pub warm_interval: Duration,

    /// Retries after the first failed attempt
    pub max_retries: u32,

    /// Backoff base delay
    pub backoff_base: Duration,

    /// Backoff ceiling
    pub backoff_max: Duration,

    /// A session updated within this window counts as active
    pub session_active_window: Duration,

    /// Max sessions kept from one probe call
    pub sessions_list_limit: usize,

    /// Upper bound on a single probe call
    pub probe_timeout: Duration,

    /// Probe command templates
    pub commands: ProbeCommands,
}

impl AppConfig {
    pub fn new() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let data_dir = dirs::data_dir().unwrap_or_else(|| home.clone());

        Self {
            database_path: data_dir.join("watchtower").join("watchtower.db"),
            migrations_dir: PathBuf::from("migrations"),
            workspace_root: home.join(".openclaw").join("workspace"),
            agents_root: home.join(".openclaw").join("agents"),
            hot_interval: Duration::from_millis(10_000),
            warm_interval: Duration::from_millis(120_000),
            max_retries: 3,
            backoff_base: Duration::from_millis(500),
            backoff_max: Duration::from_millis(10_000),
            session_active_window: Duration::from_millis(15 * 60 * 1000),
            sessions_list_limit: 500,
            probe_timeout: Duration::from_millis(10_000),
            commands: ProbeCommands::new(),
        }
    }

    /// Build from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::new();

        let millis = |name: &'static str, fallback: Duration| -> Result<Duration, ConfigError> {
            match get(name) {
                Some(raw) => positive_int(name, &raw).map(Duration::from_millis),
                None => Ok(fallback),
            }
        };
        let command = |name: &'static str, fallback: &[String]| -> Result<Vec<String>, ConfigError> {
            match get(name) {
                Some(raw) => parse_command(name, &raw),
                None => Ok(fallback.to_vec()),
            }
        };

        let max_retries = match get("COLLECTOR_MAX_RETRIES") {
            Some(raw) => u32::try_from(positive_int("COLLECTOR_MAX_RETRIES", &raw)?).map_err(|_| {
                ConfigError::Invalid {
                    name: "COLLECTOR_MAX_RETRIES",
                    value: raw.clone(),
                }
            })?,
            None => defaults.max_retries,
        };
        let sessions_list_limit = match get("SESSIONS_LIST_LIMIT") {
            Some(raw) => positive_int("SESSIONS_LIST_LIMIT", &raw)? as usize,
            None => defaults.sessions_list_limit,
        };

        Ok(Self {
            database_path: get("WATCHTOWER_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            migrations_dir: get("WATCHTOWER_MIGRATIONS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.migrations_dir),
            workspace_root: get("OPENCLAW_WORKSPACE")
                .map(PathBuf::from)
                .unwrap_or(defaults.workspace_root),
            agents_root: get("OPENCLAW_AGENTS_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.agents_root),
            hot_interval: millis("HOT_INTERVAL_MS", defaults.hot_interval)?,
            warm_interval: millis("WARM_INTERVAL_MS", defaults.warm_interval)?,
            max_retries,
            backoff_base: millis("COLLECTOR_BACKOFF_BASE_MS", defaults.backoff_base)?,
            backoff_max: millis("COLLECTOR_BACKOFF_MAX_MS", defaults.backoff_max)?,
            session_active_window: millis(
                "SESSION_ACTIVE_WINDOW_MS",
                defaults.session_active_window,
            )?,
            sessions_list_limit,
            probe_timeout: millis("PROBE_TIMEOUT_MS", defaults.probe_timeout)?,
            commands: ProbeCommands {
                sessions: command("SESSIONS_COMMAND", &defaults.commands.sessions)?,
                sessions_fallback: command(
                    "SESSIONS_FALLBACK_COMMAND",
                    &defaults.commands.sessions_fallback,
                )?,
                cron: command("CRON_COMMAND", &defaults.commands.cron)?,
                status: command("STATUS_COMMAND", &defaults.commands.status)?,
                transcripts: command("TRANSCRIPTS_COMMAND", &defaults.commands.transcripts)?,
            },
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn positive_int(name: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::Invalid {
            name,
            value: raw.to_string(),
        }),
    }
}

fn parse_command(name: &'static str, raw: &str) -> Result<Vec<String>, ConfigError> {
    let parts = shell_words::split(raw).map_err(|e| ConfigError::Command {
        name,
        reason: e.to_string(),
    })?;
    if parts.is_empty() {
        return Err(ConfigError::Command {
            name,
            reason: "empty command".to_string(),
        });
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_config_defaults() {
        let config = AppConfig::new();
        assert_eq!(config.hot_interval, Duration::from_secs(10));
        assert_eq!(config.warm_interval, Duration::from_secs(120));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.backoff_base, Duration::from_millis(500));
        assert_eq!(config.backoff_max, Duration::from_secs(10));
        assert_eq!(config.session_active_window, Duration::from_secs(900));
        assert_eq!(config.sessions_list_limit, 500);
        assert_eq!(config.commands.status, vec!["openclaw", "gateway", "status"]);
        assert!(config.workspace_root.ends_with(".openclaw/workspace"));
    }

    #[test]
    fn test_lookup_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("HOT_INTERVAL_MS", "5000"),
            ("WARM_INTERVAL_MS", " 25000 "),
            ("COLLECTOR_MAX_RETRIES", "5"),
            ("OPENCLAW_WORKSPACE", "/tmp/workspace"),
            ("STATUS_COMMAND", "oc status --format 'plain text'"),
        ]))
        .unwrap();

        assert_eq!(config.hot_interval, Duration::from_millis(5000));
        assert_eq!(config.warm_interval, Duration::from_millis(25000));
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.workspace_root, PathBuf::from("/tmp/workspace"));
        assert_eq!(
            config.commands.status,
            vec!["oc", "status", "--format", "plain text"]
        );
        // Untouched values keep their defaults
        assert_eq!(config.sessions_list_limit, 500);
    }

    #[test]
    fn test_blank_values_fall_back() {
        let config = AppConfig::from_lookup(lookup(&[("HOT_INTERVAL_MS", "  ")])).unwrap();
        assert_eq!(config.hot_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_invalid_int_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("HOT_INTERVAL_MS", "fast")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                name: "HOT_INTERVAL_MS",
                value: "fast".to_string()
            }
        );
        assert_eq!(err.to_string(), "invalid HOT_INTERVAL_MS: fast");
    }

    #[test]
    fn test_zero_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("COLLECTOR_MAX_RETRIES", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "COLLECTOR_MAX_RETRIES", .. }));
    }

    #[test]
    fn test_unbalanced_command_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("CRON_COMMAND", "oc 'cron")])).unwrap_err();
        assert!(matches!(err, ConfigError::Command { name: "CRON_COMMAND", .. }));
    }

    #[test]
    #[serial]
    fn test_from_env_reads_process_environment() {
        std::env::set_var("SESSIONS_LIST_LIMIT", "42");
        let config = AppConfig::from_env();
        std::env::remove_var("SESSIONS_LIST_LIMIT");

        assert_eq!(config.unwrap().sessions_list_limit, 42);
    }
}
