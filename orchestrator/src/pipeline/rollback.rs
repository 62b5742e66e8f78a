//! Rollback engine
//!
//! Selects a prior ledger entry, validates its release directory survived
//! retention, and re-runs the promotion tail against it. Staging, dependency
//! install, and the isolated health check are skipped: the target was
//! already gated when it was first promoted.

use chrono::Utc;
use tracing::info;

use crate::errors::OrchestratorError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::models::target::DeployTarget;
use crate::pipeline::state::PipelineState;
use crate::pipeline::{DeployOutcome, Pipeline};
use crate::release::ledger::{EntryStatus, Ledger, LedgerEntry};
use crate::release::paths::{short_commit, ReleasePaths};

/// Pick the ledger entry to roll back to.
///
/// Modes: default (most recent inactive entry), by commit (equal to or
/// prefixed by the supplied hash), or by exact attempt timestamp, optionally
/// narrowed by commit.
pub fn select_target(
    history: &[LedgerEntry],
    commit: Option<&str>,
    attempt: Option<&str>,
) -> Result<LedgerEntry, OrchestratorError> {
    match (commit, attempt) {
        (None, None) => history
            .iter()
            .find(|entry| entry.status == EntryStatus::Inactive)
            .cloned()
            .ok_or_else(|| {
                OrchestratorError::NoRollbackTarget(
                    "no inactive deployment in history".to_string(),
                )
            }),
        (Some(commit), None) => history
            .iter()
            .find(|entry| entry.commit == commit || entry.commit.starts_with(commit))
            .cloned()
            .ok_or_else(|| OrchestratorError::CommitNotFound(commit.to_string())),
        (maybe_commit, Some(attempt)) => history
            .iter()
            .filter(|entry| match maybe_commit {
                Some(commit) => entry.commit == commit || entry.commit.starts_with(commit),
                None => true,
            })
            .find(|entry| entry.attempt() == Some(attempt))
            .cloned()
            .ok_or_else(|| OrchestratorError::AttemptNotFound(attempt.to_string())),
    }
}

impl Pipeline {
    /// Repoint live to a previously deployed release.
    pub async fn rollback(
        &self,
        target: DeployTarget,
        commit: Option<&str>,
        attempt: Option<&str>,
    ) -> Result<DeployOutcome, OrchestratorError> {
        let paths = ReleasePaths::for_target(&self.options.base_dir, &target);
        let ledger = Ledger::new(paths.ledger_file());

        let entry = select_target(&ledger.history().await, commit, attempt)?;
        info!(
            "Rolling {} back to version {} ({})",
            target,
            entry.version,
            entry.release_path.display()
        );

        // The entry may outlive its release directory: retention prunes old
        // commits but never rewrites history. Surface that distinctly before
        // touching anything.
        let release = Dir::new(&entry.release_path);
        let env_file = File::new(entry.release_path.join(".env"));
        if !release.exists().await || !env_file.exists().await {
            return Err(OrchestratorError::StaleRollbackTarget(format!(
                "release {} for version {} is no longer intact on disk",
                entry.release_path.display(),
                entry.version
            )));
        }

        info!(
            "[{}] Repointing {} -> {}",
            PipelineState::Promoting,
            paths.current_pointer().path().display(),
            entry.release_path.display()
        );
        paths.current_pointer().atomic_set(&entry.release_path).await?;

        self.reload_and_verify(&target, &paths).await?;

        // A rollback is a new deployment of an old release: append a fresh
        // entry reusing the release path rather than re-activating the row.
        let version = format!(
            "{}-{}",
            short_commit(&entry.commit),
            Utc::now().format("%Y%m%d%H%M%S")
        );
        info!("[{}] Recording version {}", PipelineState::LedgerRecord, version);
        ledger
            .record(LedgerEntry {
                version: version.clone(),
                commit: entry.commit.clone(),
                timestamp: Utc::now().to_rfc3339(),
                release_path: entry.release_path.clone(),
                status: EntryStatus::Active,
            })
            .await?;

        info!("[{}] Rolled back to {}", PipelineState::Done, version);
        Ok(DeployOutcome {
            version,
            commit: entry.commit,
            release_path: entry.release_path,
        })
    }
}
