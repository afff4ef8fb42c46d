use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::path::{Component, Path, PathBuf};
use std::io;
use std::fmt;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Workspace error: {0}")]
    WorkspaceError(String),
    #[error("Template error: {0}")]
    TemplateError(String),
    #[error("Executor error: {0}")]
    ExecutorError(String),
    #[error("Command timed out after {seconds}s: {command}")]
    Timeout { command: String, seconds: u64 },
    #[error("Config error: {0}")]
    ConfigError(String),
}

impl From<io::Error> for EngineError {
    fn from(err: io::Error) -> Self {
        EngineError::WorkspaceError(format!("IO error: {}", err))
    }
}

impl From<serde_yaml::Error> for EngineError {
    fn from(err: serde_yaml::Error) -> Self {
        EngineError::ConfigError(err.to_string())
    }
}

/// The two build kinds the playground supports.
///
/// `Haskell` is a direct build: the project descriptor produced by the build
/// tool's init is used as-is. `Plutus` is templated: the generated descriptor
/// is replaced by files from the template store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Haskell,
    Plutus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildKind {
    Direct,
    Templated,
}

impl Variant {
    pub const ALL: [Variant; 2] = [Variant::Haskell, Variant::Plutus];

    pub fn tag(&self) -> &'static str {
        match self {
            Variant::Haskell => "haskell",
            Variant::Plutus => "plutus",
        }
    }

    pub fn kind(&self) -> BuildKind {
        match self {
            Variant::Haskell => BuildKind::Direct,
            Variant::Plutus => BuildKind::Templated,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl std::str::FromStr for Variant {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "haskell" => Ok(Variant::Haskell),
            "plutus" => Ok(Variant::Plutus),
            _ => Err(EngineError::ValidationError(format!("Unknown build variant: {}", s))),
        }
    }
}

/// An ephemeral directory owned by exactly one build attempt.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub id: Uuid,
    pub root: PathBuf,
    pub variant: Variant,
    pub created_at: DateTime<Utc>,
}

impl Workspace {
    /// Directory name under the workspace root: `{variant}-{id}`.
    pub fn dir_name(variant: Variant, id: Uuid) -> String {
        format!("{}-{}", variant.tag(), id)
    }

    /// Writes `contents` verbatim to `relative_path` inside the workspace,
    /// creating parent directories as needed.
    pub async fn write_source(&self, relative_path: &Path, contents: &str) -> Result<PathBuf, EngineError> {
        ensure_relative(relative_path)?;
        let target = self.root.join(relative_path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| EngineError::WorkspaceError(format!("Failed to create {}: {}", parent.display(), e)))?;
        }
        tokio::fs::write(&target, contents)
            .await
            .map_err(|e| EngineError::WorkspaceError(format!("Failed to write {}: {}", target.display(), e)))?;
        Ok(target)
    }
}

/// Rejects paths that could land outside a workspace root.
pub fn ensure_relative(path: &Path) -> Result<(), EngineError> {
    if path.as_os_str().is_empty() {
        return Err(EngineError::ValidationError("Path must not be empty".to_string()));
    }
    let escapes = path.components().any(|c| {
        !matches!(c, Component::Normal(_) | Component::CurDir)
    });
    if escapes {
        return Err(EngineError::ValidationError(
            format!("Path must stay within the workspace: {}", path.display())
        ));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct BuildRequest {
    variant: Variant,
    source: String,
}

impl BuildRequest {
    /// Empty source is rejected here, before any workspace exists.
    pub fn new(variant: Variant, source: impl Into<String>) -> Result<Self, EngineError> {
        let source = source.into();
        if source.is_empty() {
            return Err(EngineError::ValidationError("No source code provided".to_string()));
        }
        Ok(Self { variant, source })
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildResult {
    pub success: bool,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BuildResult {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            full_output: None,
            warnings: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolchainVersion {
    pub stdout: String,
    pub stderr: String,
}
