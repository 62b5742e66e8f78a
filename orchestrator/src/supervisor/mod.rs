//! Process supervisor integration
//!
//! The orchestrator never runs production services itself; it drives an
//! external pm2-compatible supervisor through its CLI. Three operations are
//! consumed: reload a known service, start one fresh from a process config,
//! and describe its status.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::OrchestratorError;

/// Supervisor options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorOptions {
    /// Supervisor binary
    #[serde(default = "default_program")]
    pub program: String,

    /// Process config file name, resolved under the live pointer
    #[serde(default = "default_process_config")]
    pub process_config: String,

    /// Status checks before giving up on "online"
    #[serde(default = "default_status_retries")]
    pub status_retries: u32,

    /// Fixed interval between status checks, in seconds
    #[serde(default = "default_status_interval_secs")]
    pub status_interval_secs: u64,
}

fn default_program() -> String {
    "pm2".to_string()
}

fn default_process_config() -> String {
    "ecosystem.config.js".to_string()
}

fn default_status_retries() -> u32 {
    5
}

fn default_status_interval_secs() -> u64 {
    2
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            program: default_program(),
            process_config: default_process_config(),
            status_retries: default_status_retries(),
            status_interval_secs: default_status_interval_secs(),
        }
    }
}

impl SupervisorOptions {
    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs)
    }
}

/// The external process supervisor, as consumed by the pipeline.
#[async_trait]
pub trait ProcessSupervisor: Send + Sync {
    /// Reload a known service in place. Fails if the service is unknown.
    async fn reload(&self, service: &str) -> Result<(), OrchestratorError>;

    /// Start a service fresh from a process config file.
    async fn start(&self, service: &str, config_path: &Path) -> Result<(), OrchestratorError>;

    /// Status text for the service; contains "online" when healthy.
    async fn describe(&self, service: &str) -> Result<String, OrchestratorError>;
}

/// Shell-out implementation driving the supervisor CLI.
pub struct ShellSupervisor {
    program: String,
}

impl ShellSupervisor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<std::process::Output, OrchestratorError> {
        Command::new(&self.program)
            .args(args)
            .output()
            .await
            .map_err(|e| {
                OrchestratorError::ServiceReloadFailed(format!(
                    "failed to run {}: {}",
                    self.program, e
                ))
            })
    }
}

#[async_trait]
impl ProcessSupervisor for ShellSupervisor {
    async fn reload(&self, service: &str) -> Result<(), OrchestratorError> {
        let output = self.run(&["reload", service]).await?;
        if !output.status.success() {
            return Err(OrchestratorError::ServiceReloadFailed(format!(
                "reload of {} failed: {}",
                service,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }

    async fn start(&self, service: &str, config_path: &Path) -> Result<(), OrchestratorError> {
        let config = config_path.to_string_lossy();
        let output = self
            .run(&["start", config.as_ref(), "--name", service])
            .await?;
        if !output.status.success() {
            return Err(OrchestratorError::ServiceReloadFailed(format!(
                "start of {} failed: {}",
                service,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }

    async fn describe(&self, service: &str) -> Result<String, OrchestratorError> {
        let output = self.run(&["describe", service]).await?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Reload the service if the supervisor already knows it, otherwise start it
/// fresh, then wait until it reports online.
pub async fn reload_or_start(
    supervisor: &dyn ProcessSupervisor,
    service: &str,
    config_path: &Path,
    options: &SupervisorOptions,
) -> Result<(), OrchestratorError> {
    match supervisor.reload(service).await {
        Ok(()) => info!("Reloaded service {}", service),
        Err(e) => {
            debug!("Reload of {} failed ({}), starting fresh", service, e);
            supervisor.start(service, config_path).await?;
            info!("Started service {}", service);
        }
    }

    for attempt in 1..=options.status_retries {
        let status = supervisor.describe(service).await.unwrap_or_default();
        if status.contains("online") {
            return Ok(());
        }
        debug!(
            "Service {} not online yet ({}/{})",
            service, attempt, options.status_retries
        );
        tokio::time::sleep(options.status_interval()).await;
    }

    Err(OrchestratorError::ServiceReloadFailed(format!(
        "service {} did not report online after {} checks",
        service, options.status_retries
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeSupervisor {
        known: bool,
        online_after: u32,
        describes: AtomicU32,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ProcessSupervisor for FakeSupervisor {
        async fn reload(&self, service: &str) -> Result<(), OrchestratorError> {
            self.calls.lock().unwrap().push(format!("reload {}", service));
            if self.known {
                Ok(())
            } else {
                Err(OrchestratorError::ServiceReloadFailed(
                    "unknown service".to_string(),
                ))
            }
        }

        async fn start(&self, service: &str, _config: &Path) -> Result<(), OrchestratorError> {
            self.calls.lock().unwrap().push(format!("start {}", service));
            Ok(())
        }

        async fn describe(&self, _service: &str) -> Result<String, OrchestratorError> {
            let n = self.describes.fetch_add(1, Ordering::SeqCst);
            if n >= self.online_after {
                Ok("status: online".to_string())
            } else {
                Ok("status: launching".to_string())
            }
        }
    }

    fn quick_options() -> SupervisorOptions {
        SupervisorOptions {
            status_retries: 3,
            status_interval_secs: 0,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_reload_known_service() {
        let supervisor = FakeSupervisor {
            known: true,
            ..Default::default()
        };
        reload_or_start(
            &supervisor,
            "server-prod",
            Path::new("ecosystem.config.js"),
            &quick_options(),
        )
        .await
        .unwrap();
        assert_eq!(supervisor.calls.lock().unwrap()[0], "reload server-prod");
    }

    #[tokio::test]
    async fn test_unknown_service_falls_back_to_start() {
        let supervisor = FakeSupervisor {
            known: false,
            ..Default::default()
        };
        reload_or_start(
            &supervisor,
            "client-main",
            Path::new("ecosystem.config.js"),
            &quick_options(),
        )
        .await
        .unwrap();
        let calls = supervisor.calls.lock().unwrap();
        assert_eq!(calls[0], "reload client-main");
        assert_eq!(calls[1], "start client-main");
    }

    #[tokio::test]
    async fn test_never_online_is_fatal() {
        let supervisor = FakeSupervisor {
            known: true,
            online_after: 100,
            ..Default::default()
        };
        let result = reload_or_start(
            &supervisor,
            "server-prod",
            Path::new("ecosystem.config.js"),
            &quick_options(),
        )
        .await;
        assert!(matches!(
            result,
            Err(OrchestratorError::ServiceReloadFailed(_))
        ));
    }
}
