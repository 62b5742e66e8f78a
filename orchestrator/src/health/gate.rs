//! Health gate
//!
//! Two checks with distinct risk profiles: an isolated boot of the candidate
//! release on a scratch port before promotion, and a re-verification of the
//! promoted release on its production port. Any unmet check is fatal to the
//! current pipeline run.

use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::{HealthPhase, OrchestratorError};
use crate::health::ports::find_free_port;
use crate::health::process::CandidateServer;

/// Health gate options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthOptions {
    /// Start of the reserved scratch port range
    #[serde(default = "default_scratch_port_start")]
    pub scratch_port_start: u16,

    /// End of the reserved scratch port range (inclusive)
    #[serde(default = "default_scratch_port_end")]
    pub scratch_port_end: u16,

    /// Command that boots a release's server from its directory
    #[serde(default = "default_start_program")]
    pub start_program: String,

    /// Arguments to the start command
    #[serde(default = "default_start_args")]
    pub start_args: Vec<String>,

    /// Stdout substring that signals successful startup
    #[serde(default = "default_startup_pattern")]
    pub startup_pattern: String,

    /// Seconds to wait for the startup signal
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,

    /// Liveness endpoint path
    #[serde(default = "default_liveness_path")]
    pub liveness_path: String,

    /// Liveness probe attempts
    #[serde(default = "default_probe_retries")]
    pub probe_retries: u32,

    /// Fixed interval between probes, in seconds
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,

    /// Grace period before force-killing the candidate process group
    #[serde(default = "default_terminate_grace_secs")]
    pub terminate_grace_secs: u64,

    /// How many declared assets to sample
    #[serde(default = "default_asset_sample_size")]
    pub asset_sample_size: usize,

    /// Retries per sampled asset probe
    #[serde(default = "default_asset_probe_retries")]
    pub asset_probe_retries: u32,
}

fn default_scratch_port_start() -> u16 {
    4100
}

fn default_scratch_port_end() -> u16 {
    4199
}

fn default_start_program() -> String {
    "npm".to_string()
}

fn default_start_args() -> Vec<String> {
    vec!["start".to_string()]
}

fn default_startup_pattern() -> String {
    "listening".to_string()
}

fn default_startup_timeout_secs() -> u64 {
    30
}

fn default_liveness_path() -> String {
    "/health".to_string()
}

fn default_probe_retries() -> u32 {
    10
}

fn default_probe_interval_secs() -> u64 {
    2
}

fn default_terminate_grace_secs() -> u64 {
    5
}

fn default_asset_sample_size() -> usize {
    5
}

fn default_asset_probe_retries() -> u32 {
    2
}

impl Default for HealthOptions {
    fn default() -> Self {
        Self {
            scratch_port_start: default_scratch_port_start(),
            scratch_port_end: default_scratch_port_end(),
            start_program: default_start_program(),
            start_args: default_start_args(),
            startup_pattern: default_startup_pattern(),
            startup_timeout_secs: default_startup_timeout_secs(),
            liveness_path: default_liveness_path(),
            probe_retries: default_probe_retries(),
            probe_interval_secs: default_probe_interval_secs(),
            terminate_grace_secs: default_terminate_grace_secs(),
            asset_sample_size: default_asset_sample_size(),
            asset_probe_retries: default_asset_probe_retries(),
        }
    }
}

impl HealthOptions {
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    pub fn terminate_grace(&self) -> Duration {
        Duration::from_secs(self.terminate_grace_secs)
    }
}

/// Gate running liveness checks against candidate and promoted releases.
pub struct HealthGate {
    client: Client,
    options: HealthOptions,
}

impl HealthGate {
    pub fn new(options: HealthOptions) -> Result<Self, OrchestratorError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self { client, options })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn options(&self) -> &HealthOptions {
        &self.options
    }

    /// Boot the staged release on a scratch port and verify liveness, then
    /// tear the whole process group down regardless of outcome.
    pub async fn isolated_check(&self, release_dir: &Path) -> Result<(), OrchestratorError> {
        let port = find_free_port(
            self.options.scratch_port_start,
            self.options.scratch_port_end,
        )
        .await?;
        info!("Isolated health check on scratch port {}", port);

        let mut server = CandidateServer::spawn(
            &self.options.start_program,
            &self.options.start_args,
            release_dir,
            port,
        )
        .await?;

        let result = match server
            .await_startup(&self.options.startup_pattern, self.options.startup_timeout())
            .await
        {
            Ok(()) => self.poll_liveness(port, HealthPhase::Isolated).await,
            Err(e) => Err(e),
        };

        server.terminate(self.options.terminate_grace()).await;
        result
    }

    /// Verify the promoted release on its production port.
    pub async fn production_check(&self, port: u16) -> Result<(), OrchestratorError> {
        info!("Production health check on port {}", port);
        self.poll_liveness(port, HealthPhase::Production).await
    }

    /// Poll the liveness endpoint with bounded retries and fixed backoff.
    async fn poll_liveness(&self, port: u16, phase: HealthPhase) -> Result<(), OrchestratorError> {
        let url = format!("http://127.0.0.1:{}{}", port, self.options.liveness_path);

        for attempt in 1..=self.options.probe_retries {
            match self.client.get(&url).send().await {
                Ok(response) if response.status().is_success() => {
                    info!("Liveness confirmed at {}", url);
                    return Ok(());
                }
                Ok(response) => {
                    debug!(
                        "Liveness probe {}/{} returned {}",
                        attempt,
                        self.options.probe_retries,
                        response.status()
                    );
                }
                Err(e) => {
                    debug!(
                        "Liveness probe {}/{} failed: {}",
                        attempt, self.options.probe_retries, e
                    );
                }
            }
            tokio::time::sleep(self.options.probe_interval()).await;
        }

        Err(OrchestratorError::health(
            phase,
            format!(
                "{} not live after {} probes",
                url, self.options.probe_retries
            ),
        ))
    }
}
