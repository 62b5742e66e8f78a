//! Promotion engine
//!
//! Strictly ordered: validate, stage, install, gate, swap, supervise,
//! re-verify, record, retain. A failure before the pointer swap removes the
//! staged directory and leaves the previously live release untouched; a
//! failure after the swap leaves the new release live and undoable only by
//! an explicit rollback. The engine never re-attempts a release on its own.

use std::path::Path;

use chrono::Utc;
use tracing::{info, warn};

use crate::artifact::archive;
use crate::errors::OrchestratorError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::health::assets;
use crate::models::manifest::ArtifactManifest;
use crate::models::target::DeployTarget;
use crate::pipeline::state::PipelineState;
use crate::pipeline::{install, DeployOutcome, Pipeline};
use crate::release::ledger::{EntryStatus, Ledger, LedgerEntry};
use crate::release::paths::{short_commit, ReleasePaths};
use crate::release::retention;
use crate::supervisor;

impl Pipeline {
    /// Promote an artifact to live for its target.
    ///
    /// When `requested` is given it must match the artifact's manifest; the
    /// mismatch is rejected before any disk mutation.
    pub async fn promote(
        &self,
        artifact: &Path,
        requested: Option<DeployTarget>,
        dry_run: bool,
    ) -> Result<DeployOutcome, OrchestratorError> {
        info!("[{}] Reading artifact manifest", PipelineState::Validating);
        let manifest = archive::read_manifest(artifact).await?;
        let target = match requested {
            Some(requested) => {
                manifest.ensure_matches(&requested)?;
                requested
            }
            None => manifest.target(),
        };

        let paths = ReleasePaths::for_target(&self.options.base_dir, &target);
        let attempt = Utc::now().format("%Y%m%d%H%M%S").to_string();
        let release_dir = paths.release_dir(&manifest.commit, &attempt);
        let version = format!("{}-{}", short_commit(&manifest.commit), attempt);

        let outcome = DeployOutcome {
            version: version.clone(),
            commit: manifest.commit.clone(),
            release_path: release_dir.clone(),
        };

        if dry_run {
            info!(
                "Dry run: would stage {} at {} and promote it for {}",
                version,
                release_dir.display(),
                target
            );
            return Ok(outcome);
        }

        info!("Deploying version {} for {}", version, target);

        if let Err(e) = self.stage_and_gate(artifact, &target, &release_dir).await {
            warn!("Deployment failed before promotion, removing staged release");
            if let Err(cleanup) = Dir::new(&release_dir).delete().await {
                warn!(
                    "Failed to remove staged release {}: {}",
                    release_dir.display(),
                    cleanup
                );
            }
            return Err(e);
        }

        info!(
            "[{}] Repointing {} -> {}",
            PipelineState::Promoting,
            paths.current_pointer().path().display(),
            release_dir.display()
        );
        if let Err(e) = paths.current_pointer().atomic_set(&release_dir).await {
            // The swap never happened; the previous release is still live.
            let _ = Dir::new(&release_dir).delete().await;
            return Err(e);
        }

        // The new release is live from here on. The old one stays on disk
        // until retention, so any later failure is recoverable by rollback.
        self.finish_promotion(&manifest, &target, &paths, &release_dir, &version)
            .await?;

        Ok(outcome)
    }

    /// Staging through the isolated health check. Failures here must leave
    /// no trace beyond the staged directory the caller removes.
    async fn stage_and_gate(
        &self,
        artifact: &Path,
        target: &DeployTarget,
        release_dir: &Path,
    ) -> Result<(), OrchestratorError> {
        info!(
            "[{}] Staging release at {}",
            PipelineState::Staging,
            release_dir.display()
        );
        Dir::new(release_dir).create().await?;
        archive::unpack(artifact, release_dir).await?;
        self.inject_env_file(target, release_dir).await?;

        info!("[{}] Installing dependencies", PipelineState::DependencyInstall);
        install::install_dependencies(release_dir, &self.options.install).await?;

        info!(
            "[{}] Gating candidate release",
            PipelineState::IsolatedHealthCheck
        );
        self.gate.isolated_check(release_dir).await?;

        Ok(())
    }

    /// The promotion tail: supervise, re-verify, record, retain.
    pub(crate) async fn finish_promotion(
        &self,
        manifest: &ArtifactManifest,
        target: &DeployTarget,
        paths: &ReleasePaths,
        release_dir: &Path,
        version: &str,
    ) -> Result<(), OrchestratorError> {
        self.reload_and_verify(target, paths).await?;

        if manifest.has_cdn_assets() {
            info!("[{}] Sampling CDN assets", PipelineState::AssetHealthCheck);
            assets::sampled_asset_check(
                self.gate.client(),
                manifest,
                self.options.health.asset_sample_size,
                self.options.health.asset_probe_retries,
            )
            .await?;
        }

        info!("[{}] Recording version {}", PipelineState::LedgerRecord, version);
        let ledger = Ledger::new(paths.ledger_file());
        ledger
            .record(LedgerEntry {
                version: version.to_string(),
                commit: manifest.commit.clone(),
                timestamp: Utc::now().to_rfc3339(),
                release_path: release_dir.to_path_buf(),
                status: EntryStatus::Active,
            })
            .await?;

        info!("[{}] Pruning release history", PipelineState::Retention);
        retention::enforce(paths, &ledger, &self.options.retention).await;

        info!("[{}] Version {} is live", PipelineState::Done, version);
        Ok(())
    }

    /// ServiceReload and ProductionHealthCheck.
    pub(crate) async fn reload_and_verify(
        &self,
        target: &DeployTarget,
        paths: &ReleasePaths,
    ) -> Result<(), OrchestratorError> {
        let service = target.service_name();
        info!("[{}] Reloading service {}", PipelineState::ServiceReload, service);
        let config_path = paths
            .current_pointer()
            .path()
            .join(&self.options.supervisor.process_config);
        supervisor::reload_or_start(
            self.supervisor.as_ref(),
            &service,
            &config_path,
            &self.options.supervisor,
        )
        .await?;

        info!(
            "[{}] Verifying promoted release",
            PipelineState::ProductionHealthCheck
        );
        let port = self.options.ports.production_port(target);
        self.gate.production_check(port).await
    }

    /// Copy the target's env file into the staged release.
    async fn inject_env_file(
        &self,
        target: &DeployTarget,
        release_dir: &Path,
    ) -> Result<(), OrchestratorError> {
        let source = self.options.env_file(target);
        let file = File::new(&source);
        if !file.exists().await {
            return Err(OrchestratorError::MissingEnvironmentFile(
                source.display().to_string(),
            ));
        }
        file.copy_to(&release_dir.join(".env")).await
    }
}
