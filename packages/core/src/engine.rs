use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use log::{info, error, debug};
use crate::admission::{Admission, AdmissionPolicy};
use crate::classifier;
use crate::config::{PlaygroundConfig, VariantsConfig};
use crate::executors::{Executor, Invocation, LocalExecutor};
use crate::models::{BuildRequest, BuildResult, CommandOutput, EngineError, ToolchainVersion, Workspace};
use crate::traits::WorkspaceManager;
use crate::workspace::{FileSystemWorkspaceManager, WorkspaceLease};

pub const VERSION_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs one build per call: lease a workspace, write the source, run the
/// variant's command, classify, release.
pub struct BuildEngine {
    workspaces: Arc<dyn WorkspaceManager>,
    executor: Arc<dyn Executor>,
    variants: VariantsConfig,
    admission: Admission,
    version_command: String,
    version_dir: PathBuf,
}

impl BuildEngine {
    pub fn new(
        workspaces: Arc<dyn WorkspaceManager>,
        executor: Arc<dyn Executor>,
        variants: VariantsConfig,
        admission: AdmissionPolicy,
    ) -> Self {
        Self {
            workspaces,
            executor,
            variants,
            admission: Admission::new(admission),
            version_command: "cabal --version".to_string(),
            version_dir: std::env::temp_dir(),
        }
    }

    /// Wires the local executor and filesystem workspaces from configuration.
    pub async fn from_config(config: &PlaygroundConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let executor: Arc<dyn Executor> = Arc::new(LocalExecutor::new(config.shell.clone()));
        let workspaces = FileSystemWorkspaceManager::from_config(config, Arc::clone(&executor)).await?;

        let mut engine = Self::new(
            Arc::new(workspaces),
            executor,
            config.variants.clone(),
            config.admission_policy(),
        );
        engine.version_command = config.version_command.clone();
        engine.version_dir = config.workspace_root.clone();
        Ok(engine)
    }

    pub fn admission(&self) -> &Admission {
        &self.admission
    }

    /// Never fails: provisioning errors, spawn failures and timeouts all come
    /// back as `success: false` with the error message.
    pub async fn build(&self, request: BuildRequest) -> BuildResult {
        let _permit = self.admission.admit().await;
        info!("Starting {} build ({} bytes of source)", request.variant(), request.source().len());

        match self.try_build(&request).await {
            Ok(result) => {
                info!("Finished {} build: success={}", request.variant(), result.success);
                result
            }
            Err(e) => {
                error!("Compilation error: {}", e);
                BuildResult::failure(e.to_string())
            }
        }
    }

    async fn try_build(&self, request: &BuildRequest) -> Result<BuildResult, EngineError> {
        let lease = WorkspaceLease::acquire(Arc::clone(&self.workspaces), request.variant()).await?;
        let outcome = self.run_in(lease.workspace(), request).await;
        lease.release().await;
        outcome
    }

    async fn run_in(&self, workspace: &Workspace, request: &BuildRequest) -> Result<BuildResult, EngineError> {
        let settings = self.variants.get(request.variant());
        workspace.write_source(&settings.entry_point, request.source()).await?;

        let invocation = Invocation::new(settings.command.clone(), workspace.root.clone(), settings.timeout())
            .with_environment(settings.environment.clone());
        let output = self.executor.execute(&invocation).await?;
        debug!("`{}` exited with {:?} after {}ms", settings.command, output.exit_code, output.duration_ms);

        if output.success() {
            Ok(classifier::classify(&output.stdout, &output.stderr))
        } else {
            Ok(command_failed(&settings.command, output))
        }
    }

    /// Runs the toolchain's version command through `shell`.
    pub async fn toolchain_version(&self, shell: Option<PathBuf>) -> Result<ToolchainVersion, EngineError> {
        let mut invocation = Invocation::new(self.version_command.clone(), self.version_dir.clone(), VERSION_TIMEOUT);
        invocation.shell = shell;
        let output = self.executor.execute(&invocation).await?;
        Ok(ToolchainVersion {
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// A non-zero exit means the build tool itself gave up; the program never
/// ran, so there is no program output to extract.
fn command_failed(command: &str, output: CommandOutput) -> BuildResult {
    let error = if output.stderr.is_empty() {
        match output.exit_code {
            Some(code) => format!("Command failed with exit status {}: {}", code, command),
            None => format!("Command terminated by signal: {}", command),
        }
    } else {
        output.stderr
    };

    BuildResult {
        success: false,
        output: String::new(),
        full_output: Some(output.stdout),
        warnings: None,
        error: Some(error),
    }
}
