use crate::models::{CommandOutput, EngineError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;
use tokio::{
    process::Command,
    time::{timeout, Duration},
};
use log::debug;

pub const DEFAULT_SHELL: &str = "/bin/sh";

/// One shell command line to run inside a directory.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub command: String,
    pub working_dir: PathBuf,
    pub timeout: Duration,
    /// Added to (not replacing) the inherited environment.
    pub environment: HashMap<String, String>,
    /// Overrides the executor's default shell.
    pub shell: Option<PathBuf>,
}

impl Invocation {
    pub fn new(command: impl Into<String>, working_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            working_dir: working_dir.into(),
            timeout,
            environment: HashMap::new(),
            shell: None,
        }
    }

    pub fn with_environment(mut self, environment: HashMap<String, String>) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_shell(mut self, shell: impl Into<PathBuf>) -> Self {
        self.shell = Some(shell.into());
        self
    }
}

/// Runs invocations to completion and captures both streams.
///
/// A non-zero exit is not an error at this level; callers inspect
/// `CommandOutput::exit_code`. Errors are reserved for spawn failures and
/// timeouts.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, invocation: &Invocation) -> Result<CommandOutput, EngineError>;
}

#[derive(Debug, Clone)]
pub struct LocalExecutor {
    default_shell: PathBuf,
}

impl LocalExecutor {
    pub fn new(default_shell: impl Into<PathBuf>) -> Self {
        Self { default_shell: default_shell.into() }
    }
}

impl Default for LocalExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_SHELL)
    }
}

#[async_trait]
impl Executor for LocalExecutor {
    async fn execute(&self, invocation: &Invocation) -> Result<CommandOutput, EngineError> {
        let started_at = Instant::now();
        let shell = invocation.shell.as_ref().unwrap_or(&self.default_shell);
        debug!("Running `{}` via {} in {:?}", invocation.command, shell.display(), invocation.working_dir);

        let mut command = Command::new(shell);
        command
            .arg("-c")
            .arg(&invocation.command)
            .current_dir(&invocation.working_dir)
            .envs(&invocation.environment)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the wait future on timeout kills the shell.
            .kill_on_drop(true);

        let child = command
            .spawn()
            .map_err(|e| EngineError::ExecutorError(format!("Failed to execute command: {}", e)))?;

        let output = match timeout(invocation.timeout, child.wait_with_output()).await {
            Ok(result) => result
                .map_err(|e| EngineError::ExecutorError(format!("Failed to collect command output: {}", e)))?,
            Err(_) => {
                return Err(EngineError::Timeout {
                    command: invocation.command.clone(),
                    seconds: invocation.timeout.as_secs(),
                });
            }
        };

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code(),
            duration_ms: started_at.elapsed().as_millis() as u64,
        })
    }
}
