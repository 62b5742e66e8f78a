//! CI artifact download

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::info;

use crate::errors::OrchestratorError;

/// Download the named artifact of a CI run via the `gh` CLI into `dest`,
/// returning the path of the tarball it contains.
pub async fn download_run_artifact(
    run_id: &str,
    name: &str,
    dest: &Path,
) -> Result<PathBuf, OrchestratorError> {
    info!("Downloading artifact {} from run {}", name, run_id);

    let output = Command::new("gh")
        .args(["run", "download", run_id, "--name", name, "--dir"])
        .arg(dest)
        .output()
        .await
        .map_err(|e| OrchestratorError::ArtifactError(format!("failed to run gh: {}", e)))?;

    if !output.status.success() {
        return Err(OrchestratorError::ArtifactError(format!(
            "download of artifact {} from run {} failed: {}",
            name,
            run_id,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    find_tarball(dest).await
}

/// The downloaded payload must contain exactly one tarball.
async fn find_tarball(dest: &Path) -> Result<PathBuf, OrchestratorError> {
    let mut tarballs = Vec::new();
    let mut entries = tokio::fs::read_dir(dest).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            tarballs.push(path);
        }
    }

    match tarballs.len() {
        1 => Ok(tarballs.remove(0)),
        0 => Err(OrchestratorError::ArtifactError(format!(
            "no tarball found in downloaded artifact at {}",
            dest.display()
        ))),
        n => Err(OrchestratorError::ArtifactError(format!(
            "expected one tarball in downloaded artifact at {}, found {}",
            dest.display(),
            n
        ))),
    }
}
