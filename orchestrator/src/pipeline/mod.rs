//! Deployment pipeline
//!
//! The promotion engine stages a validated artifact, gates it behind health
//! checks, atomically promotes it, and records it in the ledger; the rollback
//! engine re-runs the promotion tail against a prior ledger entry.

pub mod install;
pub mod promote;
pub mod rollback;
pub mod state;

use std::sync::Arc;

use crate::errors::OrchestratorError;
use crate::health::gate::HealthGate;
use crate::models::target::DeployTarget;
use crate::options::OrchestratorOptions;
use crate::release::ledger::{Ledger, LedgerEntry};
use crate::release::paths::ReleasePaths;
use crate::supervisor::{ProcessSupervisor, ShellSupervisor};

/// Outcome of a successful promotion or rollback.
#[derive(Debug, Clone)]
pub struct DeployOutcome {
    /// Version label recorded in the ledger
    pub version: String,

    /// Full commit hash
    pub commit: String,

    /// Release directory now live
    pub release_path: std::path::PathBuf,
}

/// Shared engine state for promotions and rollbacks.
pub struct Pipeline {
    pub(crate) options: OrchestratorOptions,
    pub(crate) gate: HealthGate,
    pub(crate) supervisor: Arc<dyn ProcessSupervisor>,
}

impl Pipeline {
    pub fn new(options: OrchestratorOptions) -> Result<Self, OrchestratorError> {
        let supervisor = Arc::new(ShellSupervisor::new(options.supervisor.program.clone()));
        Self::with_supervisor(options, supervisor)
    }

    /// Construct with a caller-provided supervisor.
    pub fn with_supervisor(
        options: OrchestratorOptions,
        supervisor: Arc<dyn ProcessSupervisor>,
    ) -> Result<Self, OrchestratorError> {
        let gate = HealthGate::new(options.health.clone())?;
        Ok(Self {
            options,
            gate,
            supervisor,
        })
    }

    pub fn options(&self) -> &OrchestratorOptions {
        &self.options
    }

    /// Live status of a target.
    pub async fn status(&self, target: &DeployTarget) -> TargetStatus {
        let paths = ReleasePaths::for_target(&self.options.base_dir, target);
        let ledger = Ledger::new(paths.ledger_file());
        TargetStatus {
            active: ledger.active().await,
            pointer_target: paths.current_pointer().read().await,
        }
    }

    /// Deployment history of a target, newest first.
    pub async fn history(&self, target: &DeployTarget) -> Vec<LedgerEntry> {
        let paths = ReleasePaths::for_target(&self.options.base_dir, target);
        Ledger::new(paths.ledger_file()).history().await
    }
}

/// What is live for one target, as seen by the pointer and the ledger.
///
/// The two can disagree if a deployment was interrupted between the pointer
/// swap and its ledger record; that window is reported, not hidden.
#[derive(Debug, Clone)]
pub struct TargetStatus {
    /// The ledger's sole active entry, if any
    pub active: Option<LedgerEntry>,

    /// Where the live pointer currently resolves, if it exists
    pub pointer_target: Option<std::path::PathBuf>,
}

impl TargetStatus {
    /// Whether the pointer and the active ledger entry agree.
    pub fn is_consistent(&self) -> bool {
        match (&self.active, &self.pointer_target) {
            (None, None) => true,
            (Some(active), Some(pointer)) => &active.release_path == pointer,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::ledger::EntryStatus;
    use std::path::PathBuf;

    fn active_entry(path: &str) -> LedgerEntry {
        LedgerEntry {
            version: "aaa1111-20250601000000".to_string(),
            commit: "aaa1111ffff".to_string(),
            timestamp: "2025-06-01T12:00:00Z".to_string(),
            release_path: PathBuf::from(path),
            status: EntryStatus::Active,
        }
    }

    #[test]
    fn test_undeployed_target_is_consistent() {
        let status = TargetStatus {
            active: None,
            pointer_target: None,
        };
        assert!(status.is_consistent());
    }

    #[test]
    fn test_matching_pointer_and_entry_are_consistent() {
        let status = TargetStatus {
            active: Some(active_entry("/srv/deploys/main/server/releases/aaa1111/1")),
            pointer_target: Some(PathBuf::from("/srv/deploys/main/server/releases/aaa1111/1")),
        };
        assert!(status.is_consistent());
    }

    #[test]
    fn test_interrupted_deployment_window_is_visible() {
        // pointer swapped but the ledger record never happened
        let status = TargetStatus {
            active: Some(active_entry("/srv/deploys/main/server/releases/aaa1111/1")),
            pointer_target: Some(PathBuf::from("/srv/deploys/main/server/releases/bbb2222/1")),
        };
        assert!(!status.is_consistent());

        let status = TargetStatus {
            active: None,
            pointer_target: Some(PathBuf::from("/srv/deploys/main/server/releases/bbb2222/1")),
        };
        assert!(!status.is_consistent());
    }
}
