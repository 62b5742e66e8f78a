//! Canonical release directory layout
//!
//! Pure path arithmetic; nothing here touches the filesystem.

use std::path::{Path, PathBuf};

use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::filesys::pointer::Pointer;
use crate::models::target::DeployTarget;

/// Directory-naming form of a commit hash: the first 7 characters. The full
/// hash lives only in the ledger and the artifact manifest.
pub const SHORT_COMMIT_LEN: usize = 7;

/// Truncate a full commit hash to its directory-naming form.
pub fn short_commit(commit: &str) -> &str {
    &commit[..commit.len().min(SHORT_COMMIT_LEN)]
}

/// Resolved directory layout for one deployment target.
///
/// ```text
/// <base>/<environment>/<package>/
///     current                      -> symlink to the live release
///     versions.json                -> deployment ledger
///     releases/<short>/<attempt>/  -> one staged release per attempt
/// ```
#[derive(Debug, Clone)]
pub struct ReleasePaths {
    root: PathBuf,
}

impl ReleasePaths {
    /// Resolve the layout for a target under a base directory.
    pub fn for_target(base: &Path, target: &DeployTarget) -> Self {
        Self {
            root: base
                .join(target.environment.as_str())
                .join(target.package.as_str()),
        }
    }

    /// Root directory owned by this target
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding all staged releases for this target
    pub fn releases_root(&self) -> Dir {
        Dir::new(self.root.join("releases"))
    }

    /// Directory holding all attempts of one commit
    pub fn commit_dir(&self, commit: &str) -> Dir {
        self.releases_root().subdir(short_commit(commit))
    }

    /// One release directory, keyed by (short commit, attempt timestamp)
    pub fn release_dir(&self, commit: &str, attempt: &str) -> PathBuf {
        self.commit_dir(commit).path().join(attempt)
    }

    /// The live pointer for this target
    pub fn current_pointer(&self) -> Pointer {
        Pointer::new(self.root.join("current"))
    }

    /// The ledger file for this target
    pub fn ledger_file(&self) -> File {
        File::new(self.root.join("versions.json"))
    }
}
