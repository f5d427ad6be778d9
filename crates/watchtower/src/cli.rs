use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "watchtower")]
#[command(version)]
#[command(about = "Read-only collector for an agent runtime")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply migrations, then run every collector until Ctrl-C
    Run,

    /// Apply pending migrations and report what ran
    Migrate,

    /// Run one collector cycle now, with retries
    Collect {
        /// Collector name, e.g. sessions_hot
        task: String,
    },

    /// Print collector health and the latest gateway status as JSON
    Status {
        /// Recent events to include
        #[arg(long, default_value_t = 10)]
        events: usize,
    },

    /// Print version information
    Version,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_version() {
        let cli = Cli::try_parse_from(["watchtower", "version"]);
        assert!(cli.is_ok());
        assert!(matches!(cli.unwrap().command, Commands::Version));
    }

    #[test]
    fn test_cli_parse_collect() {
        let cli = Cli::try_parse_from(["watchtower", "collect", "cron_hot"]);
        if let Commands::Collect { task } = cli.unwrap().command {
            assert_eq!(task, "cron_hot");
        } else {
            panic!("Expected Collect command");
        }
    }

    #[test]
    fn test_cli_collect_requires_task() {
        assert!(Cli::try_parse_from(["watchtower", "collect"]).is_err());
    }

    #[test]
    fn test_cli_parse_status_events() {
        let cli = Cli::try_parse_from(["watchtower", "status", "--events", "3"]).unwrap();
        assert!(matches!(cli.command, Commands::Status { events: 3 }));

        let cli = Cli::try_parse_from(["watchtower", "status"]).unwrap();
        assert!(matches!(cli.command, Commands::Status { events: 10 }));
    }
}
