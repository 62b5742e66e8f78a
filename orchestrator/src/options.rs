//! Orchestrator configuration
//!
//! A single settings document with serde defaults, optionally loaded from a
//! JSON file; every subsystem's options live with that subsystem and are
//! aggregated here.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::OrchestratorError;
use crate::filesys::file::File;
use crate::health::gate::HealthOptions;
use crate::models::target::{DeployTarget, Package};
use crate::notify::NotifyOptions;
use crate::pipeline::install::InstallOptions;
use crate::release::retention::RetentionOptions;
use crate::supervisor::SupervisorOptions;

/// Production port assignment per target: a per-package base port plus a
/// stable per-environment offset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortOptions {
    /// Base port for the server package
    #[serde(default = "default_server_base_port")]
    pub server_base_port: u16,

    /// Base port for the client package
    #[serde(default = "default_client_base_port")]
    pub client_base_port: u16,
}

fn default_server_base_port() -> u16 {
    3000
}

fn default_client_base_port() -> u16 {
    4000
}

impl Default for PortOptions {
    fn default() -> Self {
        Self {
            server_base_port: default_server_base_port(),
            client_base_port: default_client_base_port(),
        }
    }
}

impl PortOptions {
    /// The production port a target's service listens on.
    pub fn production_port(&self, target: &DeployTarget) -> u16 {
        let base = match target.package {
            Package::Server => self.server_base_port,
            Package::Client => self.client_base_port,
        };
        base + target.environment.port_offset()
    }
}

/// Main orchestrator options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorOptions {
    /// Base directory for all per-target state
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    /// Directory holding per-(package, environment) env files
    #[serde(default = "default_env_dir")]
    pub env_dir: PathBuf,

    /// Production port assignment
    #[serde(default)]
    pub ports: PortOptions,

    /// History retention
    #[serde(default)]
    pub retention: RetentionOptions,

    /// Health gate
    #[serde(default)]
    pub health: HealthOptions,

    /// Process supervisor
    #[serde(default)]
    pub supervisor: SupervisorOptions,

    /// Dependency install
    #[serde(default)]
    pub install: InstallOptions,

    /// Outbound notifications
    #[serde(default)]
    pub notify: NotifyOptions,
}

fn default_base_dir() -> PathBuf {
    PathBuf::from("/srv/windlass")
}

fn default_env_dir() -> PathBuf {
    PathBuf::from("/etc/windlass/env")
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            env_dir: default_env_dir(),
            ports: PortOptions::default(),
            retention: RetentionOptions::default(),
            health: HealthOptions::default(),
            supervisor: SupervisorOptions::default(),
            install: InstallOptions::default(),
            notify: NotifyOptions::default(),
        }
    }
}

impl OrchestratorOptions {
    /// Load options from a settings file, or fall back to defaults.
    pub async fn load(path: Option<&Path>) -> Result<Self, OrchestratorError> {
        match path {
            Some(path) => {
                let file = File::new(path);
                if !file.exists().await {
                    return Err(OrchestratorError::ConfigError(format!(
                        "settings file not found: {}",
                        path.display()
                    )));
                }
                file.read_json().await
            }
            None => Ok(Self::default()),
        }
    }

    /// Source path of the env file injected into a target's releases.
    pub fn env_file(&self, target: &DeployTarget) -> PathBuf {
        self.env_dir
            .join(format!("{}.{}.env", target.package, target.environment))
    }
}
