//! Version ledger
//!
//! Durable, newest-first record of deployment attempts for one target. The
//! ledger file is a single-writer read-modify-write document replaced
//! atomically on every record, and it is the source of truth for what is
//! live and what can be rolled back to.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::OrchestratorError;
use crate::filesys::file::File;

/// Ledger entry status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Active,
    Inactive,
}

/// One recorded deployment attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    /// Version label, unique per attempt
    pub version: String,

    /// Full commit hash
    pub commit: String,

    /// When the entry was recorded
    pub timestamp: String,

    /// Staged release directory this entry refers to
    pub release_path: PathBuf,

    /// Whether this entry is the live one
    pub status: EntryStatus,
}

impl LedgerEntry {
    /// Trailing attempt-timestamp component of the release path.
    pub fn attempt(&self) -> Option<&str> {
        self.release_path.file_name().and_then(|s| s.to_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LedgerDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    current: Option<String>,

    #[serde(default)]
    deployments: Vec<LedgerEntry>,
}

/// Deployment history for one target, persisted as a single JSON file.
#[derive(Debug, Clone)]
pub struct Ledger {
    file: File,
}

impl Ledger {
    pub fn new(file: File) -> Self {
        Self { file }
    }

    /// All entries, newest first.
    ///
    /// A missing, unreadable, or corrupt ledger file is treated as an empty
    /// history so a fresh target deploys cleanly; it never fails the caller.
    pub async fn history(&self) -> Vec<LedgerEntry> {
        if !self.file.exists().await {
            return Vec::new();
        }

        match self.file.read_json::<LedgerDocument>().await {
            Ok(document) => document.deployments,
            Err(e) => {
                warn!(
                    "Ledger at {} is unreadable, treating as empty history: {}",
                    self.file.path().display(),
                    e
                );
                Vec::new()
            }
        }
    }

    /// The at-most-one active entry.
    pub async fn active(&self) -> Option<LedgerEntry> {
        self.history()
            .await
            .into_iter()
            .find(|entry| entry.status == EntryStatus::Active)
    }

    /// Record a deployment: the entry becomes the sole active one and is
    /// prepended to history.
    ///
    /// Idempotent by version label, so a retried caller cannot double-record
    /// the same attempt.
    pub async fn record(&self, entry: LedgerEntry) -> Result<(), OrchestratorError> {
        let mut deployments = self.history().await;

        if deployments.iter().any(|e| e.version == entry.version) {
            debug!("Version {} already recorded, skipping", entry.version);
            return Ok(());
        }

        for existing in &mut deployments {
            existing.status = EntryStatus::Inactive;
        }

        let current = entry.version.clone();
        deployments.insert(
            0,
            LedgerEntry {
                status: EntryStatus::Active,
                ..entry
            },
        );

        let document = LedgerDocument {
            current: Some(current),
            deployments,
        };
        self.file.write_json_atomic(&document).await
    }
}
