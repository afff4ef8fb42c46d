pub mod admission;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod executors;
pub mod models;
pub mod server;
pub mod traits;
pub mod workspace;

// Re-export commonly used types
pub use admission::{Admission, AdmissionPolicy};
pub use config::{PlaygroundConfig, VariantConfig};
pub use engine::BuildEngine;
pub use executors::{Executor, Invocation, LocalExecutor};
pub use models::{BuildRequest, BuildResult, EngineError, ToolchainVersion, Variant, Workspace};
pub use traits::WorkspaceManager;
pub use workspace::{FileSystemWorkspaceManager, WorkspaceLease};
