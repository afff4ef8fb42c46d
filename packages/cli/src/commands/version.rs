// cli/src/commands/version.rs
use anyhow::{Context, Result};
use playground_core::{Executor, Invocation, LocalExecutor, PlaygroundConfig, ToolchainVersion};
use playground_core::engine::VERSION_TIMEOUT;
use playground_core::executors::DEFAULT_SHELL;

/// Runs the version command from the current directory. Nothing under the
/// workspace root is touched.
pub async fn show_version(config: &PlaygroundConfig, bash: bool) -> Result<ToolchainVersion> {
    let shell = if bash { "/bin/bash" } else { DEFAULT_SHELL };
    let working_dir = std::env::current_dir().context("Failed to resolve current directory")?;

    let invocation = Invocation::new(config.version_command.clone(), working_dir, VERSION_TIMEOUT)
        .with_shell(shell);
    let output = LocalExecutor::new(config.shell.clone()).execute(&invocation).await?;
    let version = ToolchainVersion {
        stdout: output.stdout,
        stderr: output.stderr,
    };

    print!("{}", version.stdout);
    if !version.stderr.is_empty() {
        eprint!("{}", version.stderr);
    }
    Ok(version)
}
