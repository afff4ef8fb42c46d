// packages/cli/src/config.rs

use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use playground_core::PlaygroundConfig;

pub const DEFAULT_CONFIG_FILE: &str = "playground.yml";

/// Picks the configuration file to use: an explicit path, then
/// `./playground.yml`, then `<config dir>/playground/playground.yml`.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("playground").join(DEFAULT_CONFIG_FILE))
        .filter(|path| path.exists())
}

/// Loads and validates the configuration. Environment overrides apply on
/// top of the file, exactly as they do for the server.
pub fn load_config(explicit: Option<&Path>) -> Result<PlaygroundConfig> {
    let mut config = match resolve_config_path(explicit) {
        Some(path) => PlaygroundConfig::from_file(&path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => PlaygroundConfig::default(),
    };
    config.apply_env_overrides(|key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

pub fn write_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
    let yaml = PlaygroundConfig::default().to_yaml()?;
    std::fs::write(path, yaml)?;
    Ok(())
}
