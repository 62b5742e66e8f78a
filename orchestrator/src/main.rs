//! windlass - Entry point
//!
//! CLI surface over the release orchestrator: deploy, rollback, status, and
//! list, each scoped to one (environment, package) target.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;

use windlass::artifact::fetch;
use windlass::errors::OrchestratorError;
use windlass::filesys::dir::Dir;
use windlass::logs::{init_logging, LogLevel, LogOptions};
use windlass::models::target::{DeployTarget, Environment, Package};
use windlass::options::OrchestratorOptions;
use windlass::pipeline::Pipeline;
use windlass::release::ledger::EntryStatus;
use windlass::release::paths::short_commit;

#[derive(Parser)]
#[command(name = "windlass", version, about = "Atomic release orchestrator")]
struct Cli {
    /// Path to a settings file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Promote an artifact to live
    Deploy {
        /// Artifact tarball to deploy
        #[arg(long, conflicts_with = "run_id")]
        artifact: Option<PathBuf>,

        /// CI run to download the artifact from
        #[arg(long, requires = "package")]
        run_id: Option<String>,

        /// Package the deployment is for; must match the manifest
        #[arg(long)]
        package: Option<Package>,

        /// Environment the deployment is for; must match the manifest
        #[arg(long)]
        env: Option<Environment>,

        /// Validate and print the plan without touching disk
        #[arg(long)]
        dry_run: bool,
    },

    /// Repoint live to a previously deployed release
    Rollback {
        #[arg(long)]
        package: Package,

        #[arg(long)]
        env: Environment,

        /// Roll back to the most recent deployment of this commit
        #[arg(long)]
        commit: Option<String>,

        /// Roll back to the exact attempt with this timestamp
        #[arg(long)]
        attempt: Option<String>,
    },

    /// Show what is currently live for a target
    Status {
        #[arg(long)]
        package: Package,

        #[arg(long)]
        env: Environment,
    },

    /// List deployment history for a target
    List {
        #[arg(long)]
        package: Package,

        #[arg(long)]
        env: Environment,

        /// Entries to show
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_options = LogOptions {
        log_level: if cli.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Info
        },
        ..Default::default()
    };
    if let Err(e) = init_logging(log_options) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), OrchestratorError> {
    let options = OrchestratorOptions::load(cli.config.as_deref()).await?;

    match cli.command {
        Command::Deploy {
            artifact,
            run_id,
            package,
            env,
            dry_run,
        } => {
            let artifact = match (artifact, run_id, package) {
                (Some(artifact), None, _) => artifact,
                (None, Some(run_id), Some(package)) => {
                    let dest = Dir::create_temp_dir("windlass-artifact").await?;
                    fetch::download_run_artifact(&run_id, package.as_str(), dest.path()).await?
                }
                (None, Some(_), None) => {
                    return Err(OrchestratorError::ConfigError(
                        "--run-id requires --package".to_string(),
                    ));
                }
                _ => {
                    return Err(OrchestratorError::ConfigError(
                        "deploy needs either --artifact or --run-id".to_string(),
                    ));
                }
            };

            // The manifest is authoritative; a fully named target is checked
            // against it before any disk mutation.
            let requested = match (env, package) {
                (Some(env), Some(package)) => Some(DeployTarget::new(env, package)),
                _ => None,
            };

            let pipeline = Pipeline::new(options)?;
            let outcome = pipeline.promote(&artifact, requested, dry_run).await?;
            if dry_run {
                println!(
                    "Dry run: version {} would be staged at {}",
                    outcome.version,
                    outcome.release_path.display()
                );
            } else {
                println!(
                    "{} version {} is live",
                    "Deployed:".green().bold(),
                    outcome.version
                );
            }
        }

        Command::Rollback {
            package,
            env,
            commit,
            attempt,
        } => {
            let target = DeployTarget::new(env, package);
            let pipeline = Pipeline::new(options)?;
            let outcome = pipeline
                .rollback(target, commit.as_deref(), attempt.as_deref())
                .await?;
            println!(
                "{} {} rolled back to {} ({})",
                "Rolled back:".green().bold(),
                target,
                outcome.version,
                outcome.release_path.display()
            );
        }

        Command::Status { package, env } => {
            let target = DeployTarget::new(env, package);
            let pipeline = Pipeline::new(options)?;
            let status = pipeline.status(&target).await;

            if status.active.is_none() && status.pointer_target.is_none() {
                println!("No deployment found for {}", target);
                return Ok(());
            }

            match &status.active {
                Some(active) => {
                    println!("Target:         {}", target);
                    println!("Active version: {}", active.version);
                    println!("Commit:         {}", active.commit);
                    println!("Recorded at:    {}", active.timestamp);
                    println!("Release path:   {}", active.release_path.display());
                }
                None => println!("No active ledger entry for {}", target),
            }
            match &status.pointer_target {
                Some(pointer) => println!("Live pointer:   {}", pointer.display()),
                None => println!("Live pointer:   (none)"),
            }

            if !status.is_consistent() {
                println!(
                    "{} live pointer and ledger disagree; a deployment may have been interrupted before its ledger record",
                    "warning:".yellow().bold()
                );
            }
        }

        Command::List {
            package,
            env,
            limit,
        } => {
            let target = DeployTarget::new(env, package);
            let pipeline = Pipeline::new(options)?;
            let history = pipeline.history(&target).await;

            if history.is_empty() {
                println!("No deployment found for {}", target);
                return Ok(());
            }

            for entry in history.iter().take(limit) {
                let tag = match entry.status {
                    EntryStatus::Active => "[ACTIVE]".green().bold(),
                    EntryStatus::Inactive => "[INACTIVE]".dimmed(),
                };
                println!(
                    "{} {}  commit {}  recorded {}",
                    tag,
                    entry.version,
                    short_commit(&entry.commit),
                    entry.timestamp
                );
            }
        }
    }

    Ok(())
}
