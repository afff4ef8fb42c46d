use crate::config::PlaygroundConfig;
use crate::executors::{Executor, Invocation};
use crate::models::{BuildKind, EngineError, Variant, Workspace};
use crate::traits::WorkspaceManager;
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, error, warn};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// How a fresh workspace is turned into a buildable project.
#[derive(Debug, Clone)]
pub struct ScaffoldConfig {
    pub shell: PathBuf,
    pub init_command: String,
    pub init_timeout: Duration,
    pub descriptor_extension: String,
    pub templates: HashMap<Variant, Vec<String>>,
}

impl ScaffoldConfig {
    pub fn from_config(config: &PlaygroundConfig) -> Self {
        let templates = Variant::ALL
            .iter()
            .map(|variant| (*variant, config.variants.get(*variant).templates.clone()))
            .collect();

        Self {
            shell: config.shell.clone(),
            init_command: config.init_command.clone(),
            init_timeout: config.init_timeout(),
            descriptor_extension: config.descriptor_extension.clone(),
            templates,
        }
    }

    fn templates_for(&self, variant: Variant) -> &[String] {
        self.templates.get(&variant).map(Vec::as_slice).unwrap_or(&[])
    }
}

pub struct FileSystemWorkspaceManager {
    root_path: PathBuf,
    template_dir: PathBuf,
    scaffold: ScaffoldConfig,
    executor: Arc<dyn Executor>,
}

impl FileSystemWorkspaceManager {
    pub async fn new(
        root_path: PathBuf,
        template_dir: PathBuf,
        scaffold: ScaffoldConfig,
        executor: Arc<dyn Executor>,
    ) -> Result<Self, EngineError> {
        tokio::fs::create_dir_all(&root_path)
            .await
            .map_err(|e| EngineError::WorkspaceError(format!("Failed to create workspace directory: {}", e)))?;

        Ok(Self {
            root_path,
            template_dir,
            scaffold,
            executor,
        })
    }

    pub async fn from_config(config: &PlaygroundConfig, executor: Arc<dyn Executor>) -> Result<Self, EngineError> {
        Self::new(
            config.workspace_root.clone(),
            config.template_dir.clone(),
            ScaffoldConfig::from_config(config),
            executor,
        ).await
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    async fn scaffold(&self, workspace: &Workspace) -> Result<(), EngineError> {
        let invocation = Invocation::new(
            self.scaffold.init_command.clone(),
            workspace.root.clone(),
            self.scaffold.init_timeout,
        ).with_shell(self.scaffold.shell.clone());

        let output = self.executor.execute(&invocation).await?;
        if !output.success() {
            return Err(EngineError::WorkspaceError(format!(
                "`{}` exited with status {}: {}",
                self.scaffold.init_command,
                output.exit_code.map_or_else(|| "unknown".to_string(), |c| c.to_string()),
                output.stderr.trim()
            )));
        }

        match workspace.variant.kind() {
            BuildKind::Direct => Ok(()),
            BuildKind::Templated => self.apply_templates(workspace).await,
        }
    }

    async fn apply_templates(&self, workspace: &Workspace) -> Result<(), EngineError> {
        let descriptor = self.find_descriptor(&workspace.root).await?;
        debug!("Replacing generated descriptor {:?}", descriptor);
        tokio::fs::remove_file(&descriptor)
            .await
            .map_err(|e| EngineError::WorkspaceError(format!("Failed to remove {}: {}", descriptor.display(), e)))?;

        for template in self.scaffold.templates_for(workspace.variant) {
            let source = self.template_dir.join(template);
            let destination = workspace.root.join(template);
            tokio::fs::copy(&source, &destination)
                .await
                .map_err(|e| EngineError::TemplateError(format!("Failed to copy {}: {}", source.display(), e)))?;
        }
        Ok(())
    }

    async fn find_descriptor(&self, dir: &Path) -> Result<PathBuf, EngineError> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let is_descriptor = entry
                .file_name()
                .to_string_lossy()
                .ends_with(&self.scaffold.descriptor_extension);
            if is_descriptor && entry.file_type().await?.is_file() {
                return Ok(entry.path());
            }
        }

        Err(EngineError::WorkspaceError(format!(
            "No {} descriptor was generated in {}",
            self.scaffold.descriptor_extension,
            dir.display()
        )))
    }
}

#[async_trait]
impl WorkspaceManager for FileSystemWorkspaceManager {
    async fn create(&self, variant: Variant) -> Result<Workspace, EngineError> {
        let id = Uuid::new_v4();
        let workspace = Workspace {
            id,
            root: self.root_path.join(Workspace::dir_name(variant, id)),
            variant,
            created_at: Utc::now(),
        };
        debug!("Creating workspace directory at {:?}", workspace.root);

        tokio::fs::create_dir_all(&self.root_path)
            .await
            .map_err(|e| EngineError::WorkspaceError(format!("Failed to create workspace root: {}", e)))?;
        // `create_dir` (not `_all`) so an existing directory is never adopted.
        tokio::fs::create_dir(&workspace.root)
            .await
            .map_err(|e| EngineError::WorkspaceError(format!("Failed to create workspace: {}", e)))?;

        if let Err(e) = self.scaffold(&workspace).await {
            error!("Failed to scaffold workspace {:?}: {}", workspace.root, e);
            self.destroy(&workspace).await;
            return Err(e);
        }

        Ok(workspace)
    }

    async fn destroy(&self, workspace: &Workspace) {
        if !workspace.root.starts_with(&self.root_path) {
            error!("Refusing to remove {:?}: outside workspace root {:?}", workspace.root, self.root_path);
            return;
        }

        debug!("Cleaning up workspace at {:?}", workspace.root);
        match tokio::fs::remove_dir_all(&workspace.root).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Workspace {:?} already removed", workspace.root);
            }
            Err(e) => warn!("Failed to cleanup workspace {:?}: {}", workspace.root, e),
        }
    }
}

/// Exclusive use of one workspace for one build.
///
/// `release` destroys the workspace. A lease that is dropped without being
/// released (a panic, or the owning future being cancelled) schedules the
/// destroy on the current runtime, or removes the directory synchronously
/// when there is none.
pub struct WorkspaceLease {
    workspace: Workspace,
    manager: Arc<dyn WorkspaceManager>,
    released: bool,
}

impl WorkspaceLease {
    pub async fn acquire(manager: Arc<dyn WorkspaceManager>, variant: Variant) -> Result<Self, EngineError> {
        let workspace = manager.create(variant).await?;
        Ok(Self {
            workspace,
            manager,
            released: false,
        })
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub async fn release(mut self) {
        self.manager.destroy(&self.workspace).await;
        self.released = true;
    }
}

impl Drop for WorkspaceLease {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        warn!("Workspace {:?} dropped without release, cleaning up", self.workspace.root);
        let workspace = self.workspace.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let manager = Arc::clone(&self.manager);
                handle.spawn(async move {
                    manager.destroy(&workspace).await;
                });
            }
            Err(_) => {
                if let Err(e) = std::fs::remove_dir_all(&workspace.root) {
                    if e.kind() != ErrorKind::NotFound {
                        warn!("Failed to cleanup workspace {:?}: {}", workspace.root, e);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executors::LocalExecutor;
    use std::collections::HashSet;
    use tempfile::{tempdir, TempDir};
    use tokio::task::JoinSet;

    const INIT: &str = "mkdir -p app && echo 'name: generated' > generated.cabal && echo 'main = pure ()' > app/Main.hs";

    fn scaffold(init_command: &str) -> ScaffoldConfig {
        let mut templates = HashMap::new();
        templates.insert(Variant::Haskell, Vec::new());
        templates.insert(Variant::Plutus, vec!["playground-plutus.cabal".to_string(), "cabal.project".to_string()]);
        ScaffoldConfig {
            shell: PathBuf::from("/bin/sh"),
            init_command: init_command.to_string(),
            init_timeout: Duration::from_secs(10),
            descriptor_extension: ".cabal".to_string(),
            templates,
        }
    }

    fn template_store() -> TempDir {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("playground-plutus.cabal"), "name: playground-plutus\n").unwrap();
        std::fs::write(dir.path().join("cabal.project"), "packages: .\n").unwrap();
        dir
    }

    async fn manager(root: &Path, templates: &Path, init_command: &str) -> FileSystemWorkspaceManager {
        FileSystemWorkspaceManager::new(
            root.to_path_buf(),
            templates.to_path_buf(),
            scaffold(init_command),
            Arc::new(LocalExecutor::default()),
        ).await.unwrap()
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_workspace_lifecycle() {
        let root = tempdir().unwrap();
        let templates = template_store();
        let manager = manager(root.path(), templates.path(), INIT).await;

        // Test workspace creation
        let workspace = manager.create(Variant::Haskell).await.unwrap();
        assert!(workspace.root.is_dir());
        assert_eq!(workspace.root.parent().unwrap(), root.path());
        let name = workspace.root.file_name().unwrap().to_string_lossy().to_string();
        assert_eq!(name, format!("haskell-{}", workspace.id));
        assert!(workspace.root.join("generated.cabal").exists());
        assert!(!workspace.root.join("cabal.project").exists());

        // Test workspace cleanup, twice
        manager.destroy(&workspace).await;
        assert!(!workspace.root.exists());
        manager.destroy(&workspace).await;
    }

    #[tokio::test]
    async fn test_templated_workspace_replaces_descriptor() {
        let root = tempdir().unwrap();
        let templates = template_store();
        let manager = manager(root.path(), templates.path(), INIT).await;

        let workspace = manager.create(Variant::Plutus).await.unwrap();
        assert!(!workspace.root.join("generated.cabal").exists());
        assert_eq!(
            std::fs::read_to_string(workspace.root.join("playground-plutus.cabal")).unwrap(),
            "name: playground-plutus\n"
        );
        assert_eq!(std::fs::read_to_string(workspace.root.join("cabal.project")).unwrap(), "packages: .\n");
        assert!(workspace.root.join("app/Main.hs").exists());

        manager.destroy(&workspace).await;
        assert_eq!(entries(root.path()), 0);
    }

    #[tokio::test]
    async fn test_missing_descriptor_aborts_and_cleans_up() {
        let root = tempdir().unwrap();
        let templates = template_store();
        let manager = manager(root.path(), templates.path(), "mkdir -p app").await;

        let result = manager.create(Variant::Plutus).await;
        assert!(matches!(result, Err(EngineError::WorkspaceError(_))));
        assert_eq!(entries(root.path()), 0);
    }

    #[tokio::test]
    async fn test_missing_template_aborts_and_cleans_up() {
        let root = tempdir().unwrap();
        let empty_store = tempdir().unwrap();
        let manager = manager(root.path(), empty_store.path(), INIT).await;

        let result = manager.create(Variant::Plutus).await;
        assert!(matches!(result, Err(EngineError::TemplateError(_))));
        assert_eq!(entries(root.path()), 0);
    }

    #[tokio::test]
    async fn test_failed_init_aborts_and_cleans_up() {
        let root = tempdir().unwrap();
        let templates = template_store();
        let manager = manager(root.path(), templates.path(), "echo 'cabal: not found' >&2; exit 127").await;

        let result = manager.create(Variant::Haskell).await;
        match result {
            Err(EngineError::WorkspaceError(message)) => assert!(message.contains("cabal: not found")),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(entries(root.path()), 0);
    }

    #[tokio::test]
    async fn test_concurrent_workspaces_are_unique() {
        let root = tempdir().unwrap();
        let templates = template_store();
        let manager = Arc::new(manager(root.path(), templates.path(), INIT).await);

        let mut join_set = JoinSet::new();
        for i in 0..8 {
            let manager = Arc::clone(&manager);
            let variant = if i % 2 == 0 { Variant::Haskell } else { Variant::Plutus };
            join_set.spawn(async move { manager.create(variant).await });
        }

        let mut roots = HashSet::new();
        while let Some(result) = join_set.join_next().await {
            let workspace = result.unwrap().unwrap();
            assert!(roots.insert(workspace.root.clone()));
        }
        assert_eq!(roots.len(), 8);
        assert_eq!(entries(root.path()), 8);
    }

    #[tokio::test]
    async fn test_destroy_refuses_foreign_paths() {
        let root = tempdir().unwrap();
        let outside = tempdir().unwrap();
        let templates = template_store();
        let manager = manager(root.path(), templates.path(), INIT).await;

        let foreign = Workspace {
            id: Uuid::new_v4(),
            root: outside.path().to_path_buf(),
            variant: Variant::Haskell,
            created_at: Utc::now(),
        };
        manager.destroy(&foreign).await;
        assert!(outside.path().exists());
    }

    #[tokio::test]
    async fn test_lease_release() {
        let root = tempdir().unwrap();
        let templates = template_store();
        let manager: Arc<dyn WorkspaceManager> = Arc::new(manager(root.path(), templates.path(), INIT).await);

        let lease = WorkspaceLease::acquire(Arc::clone(&manager), Variant::Haskell).await.unwrap();
        let path = lease.workspace().root.clone();
        assert!(path.exists());

        lease.release().await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_dropped_lease_is_cleaned_up() {
        let root = tempdir().unwrap();
        let templates = template_store();
        let manager: Arc<dyn WorkspaceManager> = Arc::new(manager(root.path(), templates.path(), INIT).await);

        let lease = WorkspaceLease::acquire(Arc::clone(&manager), Variant::Plutus).await.unwrap();
        let path = lease.workspace().root.clone();
        drop(lease);

        for _ in 0..100 {
            if !path.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(!path.exists());
    }
}
