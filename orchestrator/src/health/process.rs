//! Candidate server process management
//!
//! The isolated health check boots the staged release's server in its own
//! process group so teardown reaches every descendant the start command
//! fans out, not just the top process.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::errors::{HealthPhase, OrchestratorError};

/// A staged release's server process, spawned for the isolated check.
pub struct CandidateServer {
    child: Child,
}

impl CandidateServer {
    /// Spawn the start command in `release_dir` with the scratch port
    /// injected via `PORT`.
    pub async fn spawn(
        program: &str,
        args: &[String],
        release_dir: &Path,
        port: u16,
    ) -> Result<Self, OrchestratorError> {
        debug!(
            "Spawning candidate server: {} {:?} in {} on port {}",
            program,
            args,
            release_dir.display(),
            port
        );

        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(release_dir)
            .env("PORT", port.to_string())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn().map_err(|e| {
            OrchestratorError::health(
                HealthPhase::Isolated,
                format!("failed to spawn {}: {}", program, e),
            )
        })?;

        Ok(Self { child })
    }

    /// Wait for a stdout line containing `pattern`, bounded by `limit`.
    ///
    /// The server exiting before it reports startup is a failure in its own
    /// right, distinct from the timeout.
    pub async fn await_startup(
        &mut self,
        pattern: &str,
        limit: Duration,
    ) -> Result<(), OrchestratorError> {
        let stdout = self.child.stdout.take().ok_or_else(|| {
            OrchestratorError::health(HealthPhase::Isolated, "candidate server has no stdout")
        })?;
        let mut lines = BufReader::new(stdout).lines();

        let wait = async {
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        debug!("candidate: {}", line);
                        if line.contains(pattern) {
                            return Ok(());
                        }
                    }
                    Ok(None) => {
                        return Err(OrchestratorError::health(
                            HealthPhase::Isolated,
                            "server exited before reporting startup",
                        ));
                    }
                    Err(e) => {
                        return Err(OrchestratorError::health(
                            HealthPhase::Isolated,
                            format!("failed reading server output: {}", e),
                        ));
                    }
                }
            }
        };

        match timeout(limit, wait).await {
            Ok(result) => result,
            Err(_) => Err(OrchestratorError::health(
                HealthPhase::Isolated,
                format!(
                    "no startup line containing {:?} within {:?}",
                    pattern, limit
                ),
            )),
        }
    }

    /// Terminate the whole process group: SIGTERM, a bounded grace period,
    /// then SIGKILL.
    pub async fn terminate(mut self, grace: Duration) {
        #[cfg(unix)]
        {
            if let Some(pid) = self.child.id() {
                unsafe {
                    libc::killpg(pid as i32, libc::SIGTERM);
                }
                if timeout(grace, self.child.wait()).await.is_err() {
                    warn!("Candidate server ignored SIGTERM, force-killing process group");
                    unsafe {
                        libc::killpg(pid as i32, libc::SIGKILL);
                    }
                    let _ = self.child.wait().await;
                }
                return;
            }
        }

        // Already exited, or no process-group support on this platform.
        let _ = grace;
        let _ = self.child.kill().await;
    }
}
