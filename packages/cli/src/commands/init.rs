// cli/src/commands/init.rs
use std::path::Path;
use anyhow::{Context, Result};
use crate::config::write_default_config;

pub async fn init_config(path: &Path) -> Result<()> {
    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    write_default_config(path).context("Failed to write config file")?;

    println!("Created new configuration at {}", path.display());
    Ok(())
}
