//! Error types for the windlass orchestrator

use thiserror::Error;

/// Which health-gate phase rejected a deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthPhase {
    /// Candidate release checked in isolation on a scratch port
    Isolated,

    /// Promoted release checked on its production port
    Production,

    /// Sampled probe of externally hosted static assets
    Assets,
}

impl std::fmt::Display for HealthPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HealthPhase::Isolated => "isolated",
            HealthPhase::Production => "production",
            HealthPhase::Assets => "asset",
        };
        write!(f, "{}", name)
    }
}

/// Main error type for the orchestrator
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid deployment target: {0}")]
    InvalidTarget(String),

    #[error("Artifact manifest does not match the requested target: {0}")]
    ManifestMismatch(String),

    #[error("Missing environment file: {0}")]
    MissingEnvironmentFile(String),

    #[error("Dependency install failed: {0}")]
    DependencyInstallFailed(String),

    #[error("{phase} health check failed: {reason}")]
    HealthCheckFailed { phase: HealthPhase, reason: String },

    #[error("Service reload failed: {0}")]
    ServiceReloadFailed(String),

    #[error("Rollback target is no longer on disk: {0}")]
    StaleRollbackTarget(String),

    #[error("No rollback target: {0}")]
    NoRollbackTarget(String),

    #[error("Commit not found in deployment history: {0}")]
    CommitNotFound(String),

    #[error("Attempt not found in deployment history: {0}")]
    AttemptNotFound(String),

    #[error("Artifact error: {0}")]
    ArtifactError(String),

    #[error("Staging error: {0}")]
    StagingError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Queue error: {0}")]
    QueueError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OrchestratorError {
    /// Shorthand for a failed health-gate phase.
    pub fn health(phase: HealthPhase, reason: impl Into<String>) -> Self {
        OrchestratorError::HealthCheckFailed {
            phase,
            reason: reason.into(),
        }
    }
}

impl From<anyhow::Error> for OrchestratorError {
    fn from(err: anyhow::Error) -> Self {
        OrchestratorError::Internal(err.to_string())
    }
}
