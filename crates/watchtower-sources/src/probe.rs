//! Command-execution boundary used by the command-backed adapters

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Captured result of one probe invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: 0,
        }
    }

    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Failure text for warnings: stderr, or `unknown` when empty
    pub fn failure_text(&self) -> &str {
        if self.stderr.is_empty() {
            "unknown"
        } else {
            &self.stderr
        }
    }
}

/// Runs a probe command. Implementations never fail: spawn errors and
/// timeouts come back as a non-zero exit code.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn execute(&self, command: &str, args: &[String]) -> CommandOutput;
}

/// Split a command template and run it
pub async fn run_template(runner: &dyn CommandRunner, template: &[String]) -> CommandOutput {
    match template.split_first() {
        Some((command, args)) => runner.execute(command, args).await,
        None => CommandOutput::failed(1, "empty command"),
    }
}

/// Real subprocess runner with a bounded timeout
#[derive(Debug, Clone)]
pub struct TokioCommandRunner {
    timeout: Duration,
}

impl TokioCommandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TokioCommandRunner {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn execute(&self, command: &str, args: &[String]) -> CommandOutput {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => CommandOutput {
                stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                exit_code: output.status.code().unwrap_or(-1),
            },
            Ok(Err(e)) => {
                tracing::debug!(command, error = %e, "probe spawn failed");
                CommandOutput::failed(1, e.to_string())
            }
            Err(_) => {
                tracing::warn!(command, timeout_ms = self.timeout.as_millis() as u64, "probe timed out");
                CommandOutput::failed(-1, format!("timed out after {}ms", self.timeout.as_millis()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_failure_text_defaults_to_unknown() {
        assert_eq!(CommandOutput::failed(2, "").failure_text(), "unknown");
        assert_eq!(CommandOutput::failed(2, "boom").failure_text(), "boom");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_command_and_trims_output() {
        let runner = TokioCommandRunner::default();
        let out = runner.execute("echo", &args(&["  hello  "])).await;
        assert!(out.success());
        assert_eq!(out.stdout, "hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_code_captured() {
        let runner = TokioCommandRunner::default();
        let out = runner
            .execute("sh", &args(&["-c", "echo nope >&2; exit 3"]))
            .await;
        assert_eq!(out.exit_code, 3);
        assert_eq!(out.stderr, "nope");
    }

    #[tokio::test]
    async fn test_missing_binary_is_exit_one() {
        let runner = TokioCommandRunner::default();
        let out = runner.execute("definitely-not-a-real-binary-xyz", &[]).await;
        assert_eq!(out.exit_code, 1);
        assert!(!out.stderr.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_maps_to_negative_exit() {
        let runner = TokioCommandRunner::new(Duration::from_millis(50));
        let out = runner.execute("sleep", &args(&["5"])).await;
        assert_eq!(out.exit_code, -1);
        assert_eq!(out.stderr, "timed out after 50ms");
    }

    #[tokio::test]
    async fn test_empty_template() {
        let runner = TokioCommandRunner::default();
        let out = run_template(&runner, &[]).await;
        assert_eq!(out.exit_code, 1);
    }
}
