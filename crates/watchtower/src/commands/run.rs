use super::{load_config, open_store, scheduler};
use anyhow::Context;
use tracing::info;

pub async fn run() -> anyhow::Result<()> {
    let config = load_config()?;
    let (store, _) = open_store(&config)?;

    let scheduler = scheduler(&config, store);
    scheduler.start();

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("shutdown requested, waiting for in-flight collectors");
    scheduler.stop().await;
    Ok(())
}
