//! Retention manager integration tests

use std::path::{Path, PathBuf};

use windlass::filesys::file::File;
use windlass::models::target::{DeployTarget, Environment, Package};
use windlass::release::ledger::{EntryStatus, Ledger, LedgerEntry};
use windlass::release::paths::{short_commit, ReleasePaths};
use windlass::release::retention::{self, RetentionOptions};

fn target() -> DeployTarget {
    DeployTarget::new(Environment::Main, Package::Server)
}

async fn stage_release(paths: &ReleasePaths, commit: &str, attempt: &str) -> PathBuf {
    let dir = paths.release_dir(commit, attempt);
    tokio::fs::create_dir_all(&dir).await.unwrap();
    dir
}

async fn record(ledger: &Ledger, commit: &str, release_path: &Path) {
    let attempt = release_path.file_name().unwrap().to_str().unwrap();
    ledger
        .record(LedgerEntry {
            version: format!("{}-{}", short_commit(commit), attempt),
            commit: commit.to_string(),
            timestamp: "2025-06-01T12:00:00Z".to_string(),
            release_path: release_path.to_path_buf(),
            status: EntryStatus::Active,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_keep_one_commit_prunes_older_commits() {
    let base = tempfile::tempdir().unwrap();
    let paths = ReleasePaths::for_target(base.path(), &target());
    let ledger = Ledger::new(paths.ledger_file());

    for commit in ["aaa1111ffff", "bbb2222ffff", "ccc3333ffff"] {
        let release = stage_release(&paths, commit, "20250601000000").await;
        record(&ledger, commit, &release).await;
    }

    let options = RetentionOptions {
        keep_commits: 1,
        keep_attempts: 1,
    };
    retention::enforce(&paths, &ledger, &options).await;

    let mut remaining: Vec<String> = std::fs::read_dir(paths.releases_root().path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    remaining.sort();
    assert_eq!(remaining, vec!["ccc3333".to_string()]);

    // ledger history itself is never rewritten by retention
    assert_eq!(ledger.history().await.len(), 3);
}

#[tokio::test]
async fn test_keep_one_attempt_within_commit() {
    let base = tempfile::tempdir().unwrap();
    let paths = ReleasePaths::for_target(base.path(), &target());
    let ledger = Ledger::new(paths.ledger_file());

    let commit = "aaa1111ffff";
    for attempt in ["20250601000000", "20250601000001", "20250601000002"] {
        let release = stage_release(&paths, commit, attempt).await;
        record(&ledger, commit, &release).await;
    }

    let options = RetentionOptions {
        keep_commits: 5,
        keep_attempts: 1,
    };
    retention::enforce(&paths, &ledger, &options).await;

    let mut remaining: Vec<String> = std::fs::read_dir(paths.commit_dir(commit).path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    remaining.sort();
    assert_eq!(remaining, vec!["20250601000002".to_string()]);
}

#[tokio::test]
async fn test_active_release_survives_outside_keep_window() {
    let base = tempfile::tempdir().unwrap();
    let paths = ReleasePaths::for_target(base.path(), &target());

    // Three commits on disk; the ledger says the OLDEST is active, as after
    // a rollback far down the history.
    let mut deployments = Vec::new();
    for (n, commit) in ["aaa1111ffff", "bbb2222ffff", "ccc3333ffff"]
        .iter()
        .enumerate()
    {
        let attempt = format!("2025060100000{}", n);
        let release = stage_release(&paths, commit, &attempt).await;
        deployments.push(serde_json::json!({
            "version": format!("{}-{}", short_commit(commit), attempt),
            "commit": commit,
            "timestamp": "2025-06-01T12:00:00Z",
            "releasePath": release,
            "status": if *commit == "aaa1111ffff" { "active" } else { "inactive" },
        }));
    }
    deployments.reverse(); // newest first
    File::new(paths.ledger_file().path())
        .write_json_atomic(&serde_json::json!({
            "current": "aaa1111-20250601000000",
            "deployments": deployments,
        }))
        .await
        .unwrap();

    let ledger = Ledger::new(paths.ledger_file());
    let options = RetentionOptions {
        keep_commits: 1,
        keep_attempts: 1,
    };
    retention::enforce(&paths, &ledger, &options).await;

    let mut remaining: Vec<String> = std::fs::read_dir(paths.releases_root().path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    remaining.sort();
    // newest commit is kept by the window, the active one by exemption
    assert_eq!(
        remaining,
        vec!["aaa1111".to_string(), "ccc3333".to_string()]
    );
}

#[tokio::test]
async fn test_active_attempt_survives_attempt_pruning() {
    let base = tempfile::tempdir().unwrap();
    let paths = ReleasePaths::for_target(base.path(), &target());

    let commit = "aaa1111ffff";
    let mut releases = Vec::new();
    for attempt in ["20250601000000", "20250601000001", "20250601000002"] {
        releases.push(stage_release(&paths, commit, attempt).await);
    }

    // oldest attempt is the active one
    let deployments: Vec<_> = releases
        .iter()
        .rev()
        .map(|release| {
            let attempt = release.file_name().unwrap().to_string_lossy().to_string();
            serde_json::json!({
                "version": format!("{}-{}", short_commit(commit), attempt),
                "commit": commit,
                "timestamp": "2025-06-01T12:00:00Z",
                "releasePath": release,
                "status": if attempt == "20250601000000" { "active" } else { "inactive" },
            })
        })
        .collect();
    File::new(paths.ledger_file().path())
        .write_json_atomic(&serde_json::json!({
            "current": "aaa1111-20250601000000",
            "deployments": deployments,
        }))
        .await
        .unwrap();

    let ledger = Ledger::new(paths.ledger_file());
    let options = RetentionOptions {
        keep_commits: 5,
        keep_attempts: 1,
    };
    retention::enforce(&paths, &ledger, &options).await;

    let mut remaining: Vec<String> = std::fs::read_dir(paths.commit_dir(commit).path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    remaining.sort();
    assert_eq!(
        remaining,
        vec!["20250601000000".to_string(), "20250601000002".to_string()]
    );
}
