// src/config.rs
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::admission::AdmissionPolicy;
use crate::models::{ensure_relative, BuildKind, EngineError, Variant};

pub const CONFIG_ENV: &str = "PLAYGROUND_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlaygroundConfig {
    /// Parent directory of every per-build workspace
    pub workspace_root: PathBuf,
    /// Read-only store holding the templated variant's project files
    pub template_dir: PathBuf,
    /// Command interpreter used for builds (`<shell> -c <command>`)
    pub shell: PathBuf,
    /// Non-interactive project init run inside each new workspace
    pub init_command: String,
    pub init_timeout_seconds: u64,
    /// Extension of the descriptor the init command generates
    pub descriptor_extension: String,
    pub version_command: String,
    /// Absent means builds are admitted without limit
    pub max_concurrent_builds: Option<usize>,
    pub server: ServerConfig,
    pub variants: VariantsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VariantsConfig {
    pub haskell: VariantConfig,
    pub plutus: VariantConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariantConfig {
    /// Build+run command line, executed from the workspace root
    pub command: String,
    /// Wall-clock bound for the whole command
    pub timeout_seconds: u64,
    /// Where the submitted source is written, relative to the workspace root
    pub entry_point: PathBuf,
    /// Files copied from the template store (templated variant only)
    #[serde(default)]
    pub templates: Vec<String>,
    /// Overrides layered on top of the inherited environment
    #[serde(default)]
    pub environment: HashMap<String, String>,
}

impl Default for PlaygroundConfig {
    fn default() -> Self {
        Self {
            workspace_root: PathBuf::from("/workspace/playground"),
            template_dir: PathBuf::from("/app/template_plutus"),
            shell: PathBuf::from("/bin/bash"),
            init_command: "cabal init -n".to_string(),
            init_timeout_seconds: 120,
            descriptor_extension: ".cabal".to_string(),
            version_command: "cabal --version".to_string(),
            max_concurrent_builds: None,
            server: ServerConfig::default(),
            variants: VariantsConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for VariantsConfig {
    fn default() -> Self {
        Self {
            haskell: VariantConfig {
                command: "cabal run".to_string(),
                timeout_seconds: 10,
                entry_point: PathBuf::from("app/Main.hs"),
                templates: Vec::new(),
                environment: HashMap::new(),
            },
            plutus: VariantConfig {
                command: "cabal build && cabal run".to_string(),
                timeout_seconds: 60,
                entry_point: PathBuf::from("app/Main.hs"),
                templates: vec![
                    "playground-plutus.cabal".to_string(),
                    "cabal.project".to_string(),
                ],
                environment: HashMap::new(),
            },
        }
    }
}

impl VariantsConfig {
    pub fn get(&self, variant: Variant) -> &VariantConfig {
        match variant {
            Variant::Haskell => &self.haskell,
            Variant::Plutus => &self.plutus,
        }
    }

    pub fn get_mut(&mut self, variant: Variant) -> &mut VariantConfig {
        match variant {
            Variant::Haskell => &mut self.haskell,
            Variant::Plutus => &mut self.plutus,
        }
    }
}

impl VariantConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl PlaygroundConfig {
    /// Parses a configuration from YAML; missing fields take their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, EngineError> {
        serde_yaml::from_str(yaml).map_err(|e| {
            EngineError::ConfigError(format!("Failed to parse YAML: {}", e))
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            EngineError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&contents)
    }

    pub fn to_yaml(&self) -> Result<String, EngineError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Defaults, then the file named by `PLAYGROUND_CONFIG` (if set), then
    /// individual environment overrides.
    pub fn load() -> Result<Self, EngineError> {
        let mut config = match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.is_empty() => Self::from_file(path)?,
            _ => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), EngineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup("PLAYGROUND_WORKSPACE_ROOT") {
            self.workspace_root = PathBuf::from(root);
        }
        if let Some(dir) = lookup("PLAYGROUND_TEMPLATE_DIR") {
            self.template_dir = PathBuf::from(dir);
        }
        if let Some(shell) = lookup("PLAYGROUND_SHELL") {
            self.shell = PathBuf::from(shell);
        }
        if let Some(limit) = lookup("PLAYGROUND_MAX_CONCURRENT_BUILDS") {
            self.max_concurrent_builds = if limit.is_empty() || limit == "unbounded" {
                None
            } else {
                Some(limit.parse().map_err(|e| {
                    EngineError::ConfigError(format!("Invalid PLAYGROUND_MAX_CONCURRENT_BUILDS '{}': {}", limit, e))
                })?)
            };
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port.parse().map_err(|e| {
                EngineError::ConfigError(format!("Invalid PORT '{}': {}", port, e))
            })?;
        }
        Ok(())
    }

    pub fn admission_policy(&self) -> AdmissionPolicy {
        match self.max_concurrent_builds {
            Some(limit) => AdmissionPolicy::Bounded(limit),
            None => AdmissionPolicy::Unbounded,
        }
    }

    pub fn init_timeout(&self) -> Duration {
        Duration::from_secs(self.init_timeout_seconds)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.init_command.trim().is_empty() {
            return Err(EngineError::ConfigError("init_command must not be empty".to_string()));
        }
        if self.init_timeout_seconds == 0 {
            return Err(EngineError::ConfigError("init_timeout_seconds must be greater than zero".to_string()));
        }
        if self.descriptor_extension.is_empty() {
            return Err(EngineError::ConfigError("descriptor_extension must not be empty".to_string()));
        }
        if self.max_concurrent_builds == Some(0) {
            return Err(EngineError::ConfigError(
                "max_concurrent_builds must be at least 1 (omit it for no limit)".to_string()
            ));
        }

        for variant in Variant::ALL {
            let settings = self.variants.get(variant);
            if settings.command.trim().is_empty() {
                return Err(EngineError::ConfigError(format!("{}: command must not be empty", variant)));
            }
            if settings.timeout_seconds == 0 {
                return Err(EngineError::ConfigError(format!("{}: timeout_seconds must be greater than zero", variant)));
            }
            ensure_relative(&settings.entry_point).map_err(|e| {
                EngineError::ConfigError(format!("{}: entry_point: {}", variant, e))
            })?;

            match variant.kind() {
                BuildKind::Direct if !settings.templates.is_empty() => {
                    return Err(EngineError::ConfigError(format!(
                        "{}: direct builds keep the generated descriptor and take no templates", variant
                    )));
                }
                BuildKind::Templated if settings.templates.is_empty() => {
                    return Err(EngineError::ConfigError(format!("{}: at least one template is required", variant)));
                }
                _ => {}
            }
            for template in &settings.templates {
                ensure_relative(Path::new(template)).map_err(|e| {
                    EngineError::ConfigError(format!("{}: template: {}", variant, e))
                })?;
            }
        }

        Ok(())
    }
}
