//! Pipeline states

/// Strictly ordered pipeline states; each is a potential exit point on
/// failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineState {
    Validating,
    Staging,
    DependencyInstall,
    IsolatedHealthCheck,
    Promoting,
    ServiceReload,
    ProductionHealthCheck,
    AssetHealthCheck,
    LedgerRecord,
    Retention,
    Done,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Validating => "validating",
            PipelineState::Staging => "staging",
            PipelineState::DependencyInstall => "dependency-install",
            PipelineState::IsolatedHealthCheck => "isolated-health-check",
            PipelineState::Promoting => "promoting",
            PipelineState::ServiceReload => "service-reload",
            PipelineState::ProductionHealthCheck => "production-health-check",
            PipelineState::AssetHealthCheck => "asset-health-check",
            PipelineState::LedgerRecord => "ledger-record",
            PipelineState::Retention => "retention",
            PipelineState::Done => "done",
        }
    }

    /// States from the atomic swap onward touch live state (pointer, running
    /// service, ledger); everything earlier can only leave a staged directory
    /// behind.
    pub fn mutates_live_state(&self) -> bool {
        *self >= PipelineState::Promoting
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
