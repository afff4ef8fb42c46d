// cli/src/commands/validate.rs
use std::io::Write;
use std::path::Path;
use anyhow::Result;
use colored::Colorize;
use tabwriter::TabWriter;
use playground_core::{PlaygroundConfig, Variant};
use crate::config::load_config;
use super::utils::format_duration;

pub async fn validate_config(path: &Path) -> Result<PlaygroundConfig> {
    let config = load_config(Some(path))?;

    println!("{}", "✓ Configuration is valid".green());
    println!("\nWorkspace root: {}", config.workspace_root.display());
    println!("Templates:      {}", config.template_dir.display());
    match config.max_concurrent_builds {
        Some(limit) => println!("Concurrency:    at most {} builds", limit),
        None => println!("Concurrency:    unbounded"),
    }
    println!();
    print!("{}", render_variant_table(&config)?);

    Ok(config)
}

pub fn render_variant_table(config: &PlaygroundConfig) -> Result<String> {
    let mut tw = TabWriter::new(Vec::new());
    writeln!(tw, "VARIANT\tCOMMAND\tTIMEOUT\tENTRY POINT\tTEMPLATES")?;
    for variant in Variant::ALL {
        let settings = config.variants.get(variant);
        let templates = if settings.templates.is_empty() {
            "-".to_string()
        } else {
            settings.templates.join(", ")
        };
        writeln!(
            tw,
            "{}\t{}\t{}\t{}\t{}",
            variant,
            settings.command,
            format_duration(settings.timeout_seconds),
            settings.entry_point.display(),
            templates
        )?;
    }
    tw.flush()?;
    let bytes = tw
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to render table: {}", e))?;
    Ok(String::from_utf8(bytes)?)
}
