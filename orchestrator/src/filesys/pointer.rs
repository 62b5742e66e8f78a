//! Symlink-backed live pointer
//!
//! The one visible "moment of promotion" is repointing this symlink. The swap
//! is create-new-then-rename-over-old, so readers either see the previous
//! target or the new one, never a half-written link.

use std::path::{Path, PathBuf};

use tokio::fs;
use uuid::Uuid;

use crate::errors::OrchestratorError;

/// A named symlink designating the live release directory of one target.
#[derive(Debug, Clone)]
pub struct Pointer {
    path: PathBuf,
}

impl Pointer {
    /// Create a new pointer reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the pointer path (the symlink itself, not its target)
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the pointer exists
    pub async fn exists(&self) -> bool {
        fs::symlink_metadata(&self.path).await.is_ok()
    }

    /// Resolve the pointer to its target path, if the link exists.
    pub async fn read(&self) -> Option<PathBuf> {
        fs::read_link(&self.path).await.ok()
    }

    /// Atomically repoint to `target`.
    pub async fn atomic_set(&self, target: &Path) -> Result<(), OrchestratorError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let staged = self
            .path
            .with_extension(format!("tmp-{}", Uuid::new_v4()));

        #[cfg(unix)]
        fs::symlink(target, &staged).await?;
        #[cfg(windows)]
        fs::symlink_dir(target, &staged).await?;

        fs::rename(&staged, &self.path).await?;
        Ok(())
    }
}
