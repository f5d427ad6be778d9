pub fn run() -> anyhow::Result<()> {
    println!("watchtower {}", env!("CARGO_PKG_VERSION"));
    println!("Read-only collection and ingestion for an agent runtime");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_output() {
        let result = run();
        assert!(result.is_ok());
    }
}
