//! # docwatch CLI
//!
//! ## Usage
//!
//! ```bash
//! docwatch --config ./config/docwatch.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docwatch init` | Create the SQLite index and its schema |
//! | `docwatch sync [--reset]` | Run one reconciliation pass |
//! | `docwatch watch [--reset]` | Sync, then follow filesystem changes until Ctrl-C |
//! | `docwatch status [--json]` | List indexed documents with chunk counts |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use docwatch::{config, ingest, logging, migrate, status};

/// docwatch keeps a document index in sync with a directory tree.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file.
#[derive(Parser)]
#[command(
    name = "docwatch",
    about = "Keep a persisted document index in sync with a directory tree",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docwatch.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the index database and schema. Safe to run repeatedly.
    Init,

    /// Reconcile the index with the directory tree once.
    ///
    /// New and changed files are ingested; removed files and stale
    /// versions are forgotten. Unchanged files are left alone.
    Sync {
        /// Drop the whole index first and re-ingest everything.
        #[arg(long)]
        reset: bool,
    },

    /// Sync, then keep the index current as files change.
    Watch {
        /// Drop the whole index first and re-ingest everything.
        #[arg(long)]
        reset: bool,
    },

    /// Show what the index holds.
    Status {
        /// Print the document list as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    logging::init(&cfg.log)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Index initialized at {}.", cfg.store.path.display());
        }
        Commands::Sync { reset } => {
            let report = ingest::run_sync(&cfg, reset).await?;
            println!(
                "Sync complete: {} ingested, {} forgotten, {} unchanged, {} skipped",
                report.ingested, report.forgotten, report.unchanged, report.skipped
            );
        }
        Commands::Watch { reset } => {
            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        info!("interrupt received, shutting down");
                        on_signal.cancel();
                    }
                    Err(e) => warn!(error = %e, "failed to listen for Ctrl-C"),
                }
            });
            ingest::run_watch(&cfg, reset, cancel).await?;
        }
        Commands::Status { json } => {
            status::run_status(&cfg, json).await?;
        }
    }

    Ok(())
}
