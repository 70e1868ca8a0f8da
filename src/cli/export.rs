//! Export command implementation

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::ExporterConfig;
use crate::downloader::config::{DEFAULT_CONCURRENCY, MAX_CONCURRENCY};
use crate::downloader::{ExportExecutor, ExportJob, JobStatus, StatePaths};
use crate::fetcher::SlackHttpClient;
use crate::output::{CsvRepliesWriter, CsvThreadsWriter};
use crate::resume::SnapshotStore;

use super::CliError;

/// Parse and validate a concurrency value
fn parse_concurrency(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if value == 0 {
        return Err("concurrency must be at least 1".to_string());
    }
    if value > MAX_CONCURRENCY {
        return Err(format!(
            "concurrency {value} exceeds maximum of {MAX_CONCURRENCY}"
        ));
    }
    Ok(value)
}

/// Slack Thread Downloader CLI
#[derive(Parser, Debug)]
#[command(name = "slack-thread-downloader")]
#[command(about = "Export channel threads and replies from Slack", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the config.json document with token, cookie, and channel
    #[arg(long, global = true, default_value = "config.json")]
    pub config: PathBuf,

    /// Directory for snapshots and resume state
    #[arg(long, global = true, default_value = ".")]
    pub state_dir: PathBuf,

    /// Number of concurrent work units (reply fetches / permalink lookups)
    #[arg(long, global = true, default_value_t = DEFAULT_CONCURRENCY, value_parser = parse_concurrency)]
    pub concurrency: usize,
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export thread roots from the channel history
    Threads(ThreadsArgs),

    /// Export replies for every thread found by a prior threads export
    Replies(RepliesArgs),
}

/// Arguments for the threads export
#[derive(Parser, Debug)]
pub struct ThreadsArgs {
    /// Also render the thread snapshot to this CSV file
    #[arg(long)]
    pub csv: Option<PathBuf>,
}

/// Arguments for the replies export
#[derive(Parser, Debug)]
pub struct RepliesArgs {
    /// Also render the reply snapshot to this CSV file
    #[arg(long)]
    pub csv: Option<PathBuf>,
}

fn build_executor(cli: &Cli, config: &ExporterConfig) -> ExportExecutor {
    let client = SlackHttpClient::from_config(config);
    ExportExecutor::new(client, StatePaths::new(&cli.state_dir)).with_concurrency(cli.concurrency)
}

impl ThreadsArgs {
    /// Execute the threads export
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let config = ExporterConfig::load(&cli.config)?;
        let executor = build_executor(cli, &config);

        info!(channel = %config.channel, "Starting thread export");
        let mut job = ExportJob::threads(config.channel.clone());
        let progress = executor.export_threads(&mut job).await?;

        if job.status == JobStatus::Failed {
            warn!(
                error = progress.error.as_deref().unwrap_or("unknown"),
                "Listing did not complete; partial result was saved"
            );
        }

        let snapshot = SnapshotStore::new().load_threads(&executor.paths().threads_snapshot());
        info!(
            new_threads = progress.records_collected,
            total_threads = snapshot.len(),
            pages = progress.pages_fetched,
            "Thread export done"
        );

        if let Some(csv_path) = &self.csv {
            let mut writer = CsvThreadsWriter::new(csv_path)?;
            for record in &snapshot {
                writer.write_record(record)?;
            }
            let rows = writer.rows_written();
            writer.close()?;
            info!(path = %csv_path.display(), rows, "Thread CSV written");
        }

        Ok(())
    }
}

impl RepliesArgs {
    /// Execute the replies export
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let config = ExporterConfig::load(&cli.config)?;

        let bar = ProgressBar::hidden();
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} threads {msg}")
                .expect("hardcoded template is valid")
                .progress_chars("#>-"),
        );
        let bar_handle = bar.clone();

        let executor = build_executor(cli, &config).with_unit_progress(Arc::new(
            move |completed, total| {
                if bar_handle.is_hidden() && total > 0 {
                    bar_handle.set_draw_target(indicatif::ProgressDrawTarget::stderr());
                }
                bar_handle.set_length(total);
                bar_handle.set_position(completed);
            },
        ));

        info!(channel = %config.channel, "Starting reply export");
        let mut job = ExportJob::replies(config.channel.clone());
        let progress = executor.export_replies(&mut job).await?;
        bar.finish_and_clear();

        let snapshot = SnapshotStore::new().load_replies(&executor.paths().replies_snapshot());
        info!(
            units = progress.units_completed,
            new_replies = progress.records_collected,
            total_replies = snapshot.len(),
            "Reply export done"
        );

        if let Some(csv_path) = &self.csv {
            let mut writer = CsvRepliesWriter::new(csv_path)?;
            for record in &snapshot {
                writer.write_record(record)?;
            }
            let rows = writer.rows_written();
            writer.close()?;
            info!(path = %csv_path.display(), rows, "Reply CSV written");
        }

        Ok(())
    }
}
