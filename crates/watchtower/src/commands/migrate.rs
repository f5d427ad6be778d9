use super::{load_config, open_store};

pub fn run() -> anyhow::Result<()> {
    let config = load_config()?;
    let (_, report) = open_store(&config)?;
    let output = serde_json::json!({
        "database": config.database_path.display().to_string(),
        "applied": report.applied,
        "skipped": report.skipped,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
