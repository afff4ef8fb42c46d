use async_trait::async_trait;
use crate::models::{EngineError, Variant, Workspace};

#[async_trait]
pub trait WorkspaceManager: Send + Sync {
    /// Creates and scaffolds a fresh workspace. On error nothing is left on disk.
    async fn create(&self, variant: Variant) -> Result<Workspace, EngineError>;
    /// Best-effort removal; failures are logged, never returned.
    async fn destroy(&self, workspace: &Workspace);
}
