//! CLI for the DDM download manager.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ddm_core::config;
use ddm_core::resume_db::ResumeDb;
use std::path::Path;

use commands::{
    run_add, run_bench, run_cancel, run_checksum, run_pause, run_remove, run_resume,
    run_scheduler, run_status,
};

/// Top-level CLI for the DDM download manager.
#[derive(Debug, Parser)]
#[command(name = "ddm")]
#[command(about = "DDM: high-throughput segmented download manager", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Add a new download job.
    Add {
        /// Direct HTTP/HTTPS URL to download.
        url: String,
        /// Directory where the file will be saved (default: current directory). Stored with the job so resume works from any working directory.
        #[arg(long, value_name = "DIR")]
        download_dir: Option<std::path::PathBuf>,
        /// Expected SHA-256 hex digest of the finished file; verified after
        /// completion and recorded in the job (best-effort, never fails the
        /// download).
        #[arg(long, value_name = "SHA256")]
        checksum: Option<String>,
    },

    /// Run the scheduler/worker loop to process queued jobs.
    Run {
        /// If the remote file changed (ETag/Last-Modified/size), discard progress and re-download.
        #[arg(long)]
        force_restart: bool,
        /// Run up to N jobs concurrently (default 1). Use >1 for parallel downloads sharing the global connection budget.
        #[arg(long, default_value = "1", value_name = "N")]
        jobs: usize,
        /// Overwrite existing final file if it already exists on disk. Without this, run fails when the target file is present.
        #[arg(long)]
        overwrite: bool,
        /// Run forever as a queue scheduler, re-checking the configured time-window/weekday
        /// admission schedule every few seconds instead of exiting once the queue drains.
        #[arg(long)]
        daemon: bool,
    },

    /// Show status of all jobs.
    Status {
        /// Show the download log history for one job instead of the job table.
        #[arg(long, value_name = "ID")]
        logs: Option<i64>,
    },

    /// Pause a job by ID. Signals a running `ddm run` process over the control
    /// socket (if any) to stop mid-flight, then marks the job so it won't be
    /// picked on the next run. Progress is kept; `resume` picks up where it left off.
    Pause {
        /// Job identifier.
        id: i64,
    },

    /// Resume a paused job by its ID.
    Resume {
        /// Job identifier.
        id: i64,
    },

    /// Cancel a job by ID: like pause, but also discards its `.part` file.
    /// The job row survives (state `Cancelled`) until `remove`.
    Cancel {
        /// Job identifier.
        id: i64,
        /// Directory where the job's `.part` file lives (default: current directory).
        #[arg(long, value_name = "DIR")]
        download_dir: Option<std::path::PathBuf>,
    },

    /// Remove a job by ID. With --delete-files, also deletes the job's .part and final file(s) from the current directory or --download-dir.
    Remove {
        /// Job identifier.
        id: i64,
        /// Also delete the job's downloaded .part and final file(s) from the given directory.
        #[arg(long)]
        delete_files: bool,
        /// Directory where the job's files live (used only with --delete-files; default: current directory).
        #[arg(long, value_name = "DIR")]
        download_dir: Option<std::path::PathBuf>,
    },

    /// Benchmark different segment counts for a given URL.
    Bench {
        /// Direct HTTP/HTTPS URL to benchmark.
        url: String,
    },

    /// Compute SHA-256 of a file (e.g. after download).
    Checksum {
        /// Path to the file.
        path: String,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let mut cfg = config::load_or_init()?;
        let db = ResumeDb::open_default().await?;
        if let Err(e) = config::apply_settings_overrides(&mut cfg, &db).await {
            tracing::warn!("failed to apply Settings table overrides: {e}");
        }
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Add { url, download_dir, checksum } => {
                let dir = download_dir.or_else(|| std::env::current_dir().ok());
                run_add(&db, &url, dir.as_deref(), checksum.as_deref()).await?
            }
            CliCommand::Run { force_restart, jobs, overwrite, daemon } => {
                let download_dir = std::env::current_dir()?;
                run_scheduler(&db, &cfg, &download_dir, force_restart, jobs, overwrite, daemon)
                    .await?;
            }
            CliCommand::Status { logs } => run_status(&db, logs).await?,
            CliCommand::Pause { id } => run_pause(&db, id).await?,
            CliCommand::Resume { id } => run_resume(&db, id).await?,
            CliCommand::Cancel { id, download_dir } => {
                let dir = download_dir.or_else(|| std::env::current_dir().ok());
                run_cancel(&db, id, dir.as_deref()).await?
            }
            CliCommand::Remove { id, delete_files, download_dir } => {
                let dir = if delete_files {
                    download_dir.or_else(|| std::env::current_dir().ok())
                } else {
                    None
                };
                run_remove(&db, id, delete_files, dir.as_deref()).await?
            }
            CliCommand::Bench { url } => run_bench(&url).await?,
            CliCommand::Checksum { path } => run_checksum(Path::new(&path)).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
