//! Bounded history retention
//!
//! Two-level pruning after a successful promotion: keep the N most recent
//! distinct commits from ledger history, then the M most recent attempts
//! within each surviving commit directory. Deletion is best-effort; by the
//! time retention runs the deployment has already succeeded, so failures are
//! logged and swallowed.

use std::path::PathBuf;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::filesys::dir::Dir;
use crate::release::ledger::{EntryStatus, Ledger};
use crate::release::paths::{short_commit, ReleasePaths};

/// Retention options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionOptions {
    /// Distinct commits to keep on disk
    #[serde(default = "default_keep_commits")]
    pub keep_commits: usize,

    /// Attempts to keep within each surviving commit directory
    #[serde(default = "default_keep_attempts")]
    pub keep_attempts: usize,
}

fn default_keep_commits() -> usize {
    5
}

fn default_keep_attempts() -> usize {
    2
}

impl Default for RetentionOptions {
    fn default() -> Self {
        Self {
            keep_commits: default_keep_commits(),
            keep_attempts: default_keep_attempts(),
        }
    }
}

/// Prune release directories that fall outside the retention window.
///
/// The keep set is driven by ledger history, not by listing the disk, and the
/// release referenced by the active entry is always exempt.
pub async fn enforce(paths: &ReleasePaths, ledger: &Ledger, options: &RetentionOptions) {
    let history = ledger.history().await;
    let active = history
        .iter()
        .find(|entry| entry.status == EntryStatus::Active)
        .cloned();

    // History is newest-first, so first occurrence of each commit wins.
    let mut keep: Vec<String> = Vec::new();
    for entry in &history {
        let short = short_commit(&entry.commit).to_string();
        if !keep.contains(&short) {
            keep.push(short);
        }
    }
    keep.truncate(options.keep_commits);

    if let Some(entry) = &active {
        let short = short_commit(&entry.commit).to_string();
        if !keep.contains(&short) {
            keep.push(short);
        }
    }

    let releases_root = paths.releases_root();
    if !releases_root.exists().await {
        return;
    }

    let commit_dirs = match releases_root.list_dirs().await {
        Ok(dirs) => dirs,
        Err(e) => {
            warn!("Retention skipped, cannot list releases: {}", e);
            return;
        }
    };

    for commit_dir in commit_dirs {
        let name = match commit_dir.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };

        if keep.contains(&name) {
            prune_attempts(
                &commit_dir,
                active.as_ref().map(|entry| entry.release_path.clone()),
                options.keep_attempts,
            )
            .await;
        } else {
            info!("Retention: removing commit directory {}", commit_dir.display());
            if let Err(e) = Dir::new(&commit_dir).delete().await {
                warn!("Retention: failed to remove {}: {}", commit_dir.display(), e);
            }
        }
    }
}

/// Keep the newest `keep_attempts` attempt directories, never touching the
/// active release.
async fn prune_attempts(commit_dir: &PathBuf, active_release: Option<PathBuf>, keep_attempts: usize) {
    let attempts = match Dir::new(commit_dir).list_dirs().await {
        Ok(dirs) => dirs,
        Err(e) => {
            warn!(
                "Retention: cannot list attempts in {}: {}",
                commit_dir.display(),
                e
            );
            return;
        }
    };

    // Newest first by creation time, directory name as a deterministic
    // tiebreak (attempt names are sortable timestamps).
    let mut dated: Vec<(SystemTime, PathBuf)> = Vec::new();
    for attempt in attempts {
        let created = Dir::new(&attempt)
            .created_at()
            .await
            .unwrap_or(SystemTime::UNIX_EPOCH);
        dated.push((created, attempt));
    }
    dated.sort_by(|a, b| b.cmp(a));

    for (_, attempt) in dated.into_iter().skip(keep_attempts) {
        if Some(&attempt) == active_release.as_ref() {
            debug!(
                "Retention: keeping active release {} outside the attempt window",
                attempt.display()
            );
            continue;
        }
        info!("Retention: removing attempt {}", attempt.display());
        if let Err(e) = Dir::new(&attempt).delete().await {
            warn!("Retention: failed to remove {}: {}", attempt.display(), e);
        }
    }
}
