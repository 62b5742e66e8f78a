//! Promotion engine integration tests
//!
//! These cover the failure half of the pipeline: everything up to the
//! isolated health check must leave the previously live state untouched and
//! no staged directory behind.

use std::path::{Path, PathBuf};
use std::process::Command;

use windlass::errors::OrchestratorError;
use windlass::models::target::{DeployTarget, Environment, Package};
use windlass::options::OrchestratorOptions;
use windlass::pipeline::Pipeline;
use windlass::release::paths::ReleasePaths;

const COMMIT: &str = "0123456789abcdef0123456789abcdef01234567";

/// Build a deployable artifact tarball with a manifest at its root.
fn build_artifact(dir: &Path, environment: &str, package: &str) -> PathBuf {
    let payload = dir.join("payload");
    std::fs::create_dir_all(&payload).unwrap();

    let manifest = serde_json::json!({
        "environment": environment,
        "package": package,
        "commit": COMMIT,
        "timestamp": "2025-06-01T12:00:00Z",
    });
    std::fs::write(
        payload.join("manifest.json"),
        serde_json::to_string_pretty(&manifest).unwrap(),
    )
    .unwrap();
    std::fs::write(payload.join("server.js"), "// build output\n").unwrap();

    let artifact = dir.join("artifact.tar.gz");
    let status = Command::new("tar")
        .arg("-czf")
        .arg(&artifact)
        .arg("-C")
        .arg(&payload)
        .args(["manifest.json", "server.js"])
        .status()
        .unwrap();
    assert!(status.success());
    artifact
}

fn options_in(dir: &Path) -> OrchestratorOptions {
    OrchestratorOptions {
        base_dir: dir.join("deploys"),
        env_dir: dir.join("env"),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_manifest_mismatch_fails_before_any_disk_mutation() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = build_artifact(dir.path(), "main", "server");
    let options = options_in(dir.path());
    let base_dir = options.base_dir.clone();

    let pipeline = Pipeline::new(options).unwrap();
    let requested = DeployTarget::new(Environment::Prod, Package::Server);
    let result = pipeline.promote(&artifact, Some(requested), false).await;

    assert!(matches!(
        result,
        Err(OrchestratorError::ManifestMismatch(_))
    ));
    assert!(!base_dir.exists());
}

#[tokio::test]
async fn test_missing_env_file_cleans_up_staged_release() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = build_artifact(dir.path(), "main", "server");
    let options = options_in(dir.path());
    std::fs::create_dir_all(&options.env_dir).unwrap();

    let target = DeployTarget::new(Environment::Main, Package::Server);
    let paths = ReleasePaths::for_target(&options.base_dir, &target);

    let pipeline = Pipeline::new(options).unwrap();
    let result = pipeline.promote(&artifact, Some(target), false).await;
    assert!(matches!(
        result,
        Err(OrchestratorError::MissingEnvironmentFile(_))
    ));

    // the staged directory was removed, and neither the pointer nor the
    // ledger ever came into existence
    let releases_root = paths.releases_root();
    if releases_root.path().exists() {
        let commit_dirs: Vec<_> = std::fs::read_dir(releases_root.path())
            .unwrap()
            .flat_map(|c| std::fs::read_dir(c.unwrap().path()).unwrap())
            .collect();
        assert!(commit_dirs.is_empty());
    }
    assert!(!paths.current_pointer().exists().await);
    assert!(!paths.ledger_file().exists().await);
}

#[tokio::test]
async fn test_dry_run_touches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = build_artifact(dir.path(), "staging", "client");
    let options = options_in(dir.path());
    let base_dir = options.base_dir.clone();

    let pipeline = Pipeline::new(options).unwrap();
    let outcome = pipeline.promote(&artifact, None, true).await.unwrap();

    assert!(outcome.version.starts_with("0123456-"));
    assert_eq!(outcome.commit, COMMIT);
    assert!(!base_dir.exists());
}

#[tokio::test]
async fn test_target_resolves_from_manifest_when_unspecified() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = build_artifact(dir.path(), "prod", "client");
    let options = options_in(dir.path());

    let pipeline = Pipeline::new(options).unwrap();
    let outcome = pipeline.promote(&artifact, None, true).await.unwrap();

    assert!(outcome
        .release_path
        .starts_with(dir.path().join("deploys").join("prod").join("client")));
}
