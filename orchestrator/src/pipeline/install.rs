//! Runtime dependency installation

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::info;

use crate::errors::OrchestratorError;

/// Dependency install options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallOptions {
    /// Install command
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments; the default installs from the lockfile with no version
    /// resolution, keeping staged releases deterministic
    #[serde(default = "default_args")]
    pub args: Vec<String>,
}

fn default_program() -> String {
    "npm".to_string()
}

fn default_args() -> Vec<String> {
    vec!["ci".to_string(), "--omit=dev".to_string()]
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
        }
    }
}

/// Install runtime dependencies into the staged release from its lockfile.
pub async fn install_dependencies(
    release_dir: &Path,
    options: &InstallOptions,
) -> Result<(), OrchestratorError> {
    info!(
        "Installing dependencies in {} ({} {})",
        release_dir.display(),
        options.program,
        options.args.join(" ")
    );

    let output = Command::new(&options.program)
        .args(&options.args)
        .current_dir(release_dir)
        .output()
        .await
        .map_err(|e| {
            OrchestratorError::DependencyInstallFailed(format!(
                "failed to run {}: {}",
                options.program, e
            ))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail: String = stderr
            .lines()
            .rev()
            .take(5)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect::<Vec<_>>()
            .join("\n");
        return Err(OrchestratorError::DependencyInstallFailed(tail));
    }

    Ok(())
}
