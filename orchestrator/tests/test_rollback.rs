//! Rollback engine integration tests

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

use windlass::errors::OrchestratorError;
use windlass::models::target::{DeployTarget, Environment, Package};
use windlass::options::OrchestratorOptions;
use windlass::pipeline::Pipeline;
use windlass::release::ledger::{EntryStatus, Ledger, LedgerEntry};
use windlass::release::paths::{short_commit, ReleasePaths};
use windlass::supervisor::ProcessSupervisor;

struct AlwaysOnlineSupervisor;

#[async_trait]
impl ProcessSupervisor for AlwaysOnlineSupervisor {
    async fn reload(&self, _service: &str) -> Result<(), OrchestratorError> {
        Ok(())
    }

    async fn start(&self, _service: &str, _config: &Path) -> Result<(), OrchestratorError> {
        Ok(())
    }

    async fn describe(&self, _service: &str) -> Result<String, OrchestratorError> {
        Ok("status: online".to_string())
    }
}

fn target() -> DeployTarget {
    DeployTarget::new(Environment::Main, Package::Server)
}

fn options_in(dir: &Path) -> OrchestratorOptions {
    OrchestratorOptions {
        base_dir: dir.join("deploys"),
        env_dir: dir.join("env"),
        ..Default::default()
    }
}

/// Stage a release directory with its env file and record it in the ledger.
async fn deploy_fixture(
    paths: &ReleasePaths,
    ledger: &Ledger,
    commit: &str,
    attempt: &str,
) -> std::path::PathBuf {
    let release = paths.release_dir(commit, attempt);
    tokio::fs::create_dir_all(&release).await.unwrap();
    tokio::fs::write(release.join(".env"), "PORT=3000\n")
        .await
        .unwrap();
    ledger
        .record(LedgerEntry {
            version: format!("{}-{}", short_commit(commit), attempt),
            commit: commit.to_string(),
            timestamp: "2025-06-01T12:00:00Z".to_string(),
            release_path: release.clone(),
            status: EntryStatus::Active,
        })
        .await
        .unwrap();
    release
}

/// Minimal HTTP responder answering every request with 200.
async fn serve_liveness(listener: TcpListener) {
    loop {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        tokio::spawn(async move {
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                .await;
        });
    }
}

#[tokio::test]
async fn test_rollback_with_no_history_fails() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(options_in(dir.path())).unwrap();

    let result = pipeline.rollback(target(), None, None).await;
    assert!(matches!(
        result,
        Err(OrchestratorError::NoRollbackTarget(_))
    ));
}

#[tokio::test]
async fn test_pruned_release_is_a_stale_target() {
    let dir = tempfile::tempdir().unwrap();
    let options = options_in(dir.path());
    let paths = ReleasePaths::for_target(&options.base_dir, &target());
    let ledger = Ledger::new(paths.ledger_file());

    // old release recorded, then pruned from disk
    let old = deploy_fixture(&paths, &ledger, "aaa1111ffff", "20250601000000").await;
    let live = deploy_fixture(&paths, &ledger, "bbb2222ffff", "20250602000000").await;
    paths.current_pointer().atomic_set(&live).await.unwrap();
    tokio::fs::remove_dir_all(&old).await.unwrap();

    let ledger_before = tokio::fs::read(paths.ledger_file().path()).await.unwrap();

    let pipeline = Pipeline::new(options).unwrap();
    let result = pipeline.rollback(target(), None, None).await;
    assert!(matches!(
        result,
        Err(OrchestratorError::StaleRollbackTarget(_))
    ));

    // neither the pointer nor the ledger was mutated
    assert_eq!(paths.current_pointer().read().await.unwrap(), live);
    let ledger_after = tokio::fs::read(paths.ledger_file().path()).await.unwrap();
    assert_eq!(ledger_before, ledger_after);
}

#[tokio::test]
async fn test_rollback_repoints_and_records() {
    let dir = tempfile::tempdir().unwrap();
    let mut options = options_in(dir.path());

    // production port answered by a local liveness responder
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    options.ports.server_base_port = listener.local_addr().unwrap().port();
    options.health.probe_retries = 3;
    options.health.probe_interval_secs = 0;
    tokio::spawn(serve_liveness(listener));

    let paths = ReleasePaths::for_target(&options.base_dir, &target());
    let ledger = Ledger::new(paths.ledger_file());
    let old = deploy_fixture(&paths, &ledger, "aaa1111ffff", "20250601000000").await;
    let live = deploy_fixture(&paths, &ledger, "bbb2222ffff", "20250602000000").await;
    paths.current_pointer().atomic_set(&live).await.unwrap();

    let pipeline =
        Pipeline::with_supervisor(options, Arc::new(AlwaysOnlineSupervisor)).unwrap();
    let outcome = pipeline.rollback(target(), None, None).await.unwrap();

    assert_eq!(outcome.commit, "aaa1111ffff");
    assert_eq!(outcome.release_path, old);
    assert_eq!(paths.current_pointer().read().await.unwrap(), old);

    // a fresh active entry was appended for the rolled-back release
    let history = ledger.history().await;
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].status, EntryStatus::Active);
    assert_eq!(history[0].commit, "aaa1111ffff");
    assert_eq!(history[0].release_path, old);
    assert_eq!(history[1].status, EntryStatus::Inactive);
    assert_eq!(history[2].status, EntryStatus::Inactive);
}

#[tokio::test]
async fn test_rollback_to_unknown_commit_fails() {
    let dir = tempfile::tempdir().unwrap();
    let options = options_in(dir.path());
    let paths = ReleasePaths::for_target(&options.base_dir, &target());
    let ledger = Ledger::new(paths.ledger_file());
    deploy_fixture(&paths, &ledger, "aaa1111ffff", "20250601000000").await;

    let pipeline = Pipeline::new(options).unwrap();
    let result = pipeline.rollback(target(), Some("fff9999"), None).await;
    assert!(matches!(result, Err(OrchestratorError::CommitNotFound(_))));
}
