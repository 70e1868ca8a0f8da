//! CLI error type

use crate::config::ConfigError;
use crate::downloader::ExportError;
use crate::output::OutputError;

/// Errors surfaced by CLI commands
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Export job failed
    #[error("export error: {0}")]
    Export(#[from] ExportError),

    /// CSV rendering failed
    #[error("output error: {0}")]
    Output(#[from] OutputError),

    /// Invalid command-line argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
