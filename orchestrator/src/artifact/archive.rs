//! Artifact archive handling
//!
//! An artifact is a gzipped tarball with a `manifest.json` at the archive
//! root. The manifest can be read without unpacking, so validation happens
//! before any disk mutation.

use std::path::Path;

use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::OrchestratorError;
use crate::models::manifest::ArtifactManifest;

/// Manifest file name at the archive root
pub const MANIFEST_NAME: &str = "manifest.json";

/// Read the embedded manifest by streaming the single member to stdout.
pub async fn read_manifest(artifact: &Path) -> Result<ArtifactManifest, OrchestratorError> {
    debug!("Reading manifest from artifact {}", artifact.display());

    let output = Command::new("tar")
        .arg("-xzOf")
        .arg(artifact)
        .arg(MANIFEST_NAME)
        .output()
        .await
        .map_err(|e| OrchestratorError::ArtifactError(format!("failed to run tar: {}", e)))?;

    if !output.status.success() {
        return Err(OrchestratorError::ArtifactError(format!(
            "no {} in artifact {}: {}",
            MANIFEST_NAME,
            artifact.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let manifest = serde_json::from_slice(&output.stdout)?;
    Ok(manifest)
}

/// Unpack the whole artifact into `dest`.
pub async fn unpack(artifact: &Path, dest: &Path) -> Result<(), OrchestratorError> {
    info!("Unpacking {} into {}", artifact.display(), dest.display());

    let output = Command::new("tar")
        .arg("-xzf")
        .arg(artifact)
        .arg("-C")
        .arg(dest)
        .output()
        .await
        .map_err(|e| OrchestratorError::StagingError(format!("failed to run tar: {}", e)))?;

    if !output.status.success() {
        return Err(OrchestratorError::StagingError(format!(
            "extraction of {} failed: {}",
            artifact.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(())
}
