// cli/src/commands/compile.rs
use std::path::Path;
use anyhow::{Context, Result};
use colored::Colorize;
use playground_core::{BuildEngine, BuildRequest, BuildResult, PlaygroundConfig, Variant};

/// Builds `file` through the same pipeline the server uses.
pub async fn compile_file(config: &PlaygroundConfig, file: &Path, variant: &str) -> Result<BuildResult> {
    let variant: Variant = variant.parse()?;
    let source = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let request = BuildRequest::new(variant, source)?;

    let engine = BuildEngine::from_config(config).await?;
    Ok(engine.build(request).await)
}

pub fn print_result(result: &BuildResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    if let Some(warnings) = result.warnings.as_deref().filter(|w| !w.is_empty()) {
        eprintln!("{}", "Warnings:".yellow().bold());
        eprintln!("{}", warnings.trim_end());
    }

    if result.success {
        println!("{}", result.output);
    } else {
        eprintln!("{}", "✗ Build failed".red().bold());
        if let Some(error) = &result.error {
            eprintln!("{}", error.trim_end());
        }
    }
    Ok(())
}
