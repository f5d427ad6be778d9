mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run => commands::run::run().await,
        Commands::Migrate => commands::migrate::run(),
        Commands::Collect { task } => commands::collect::run(&task).await,
        Commands::Status { events } => commands::status::run(events),
        Commands::Version => commands::version::run(),
    }
}
