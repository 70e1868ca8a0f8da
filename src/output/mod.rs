//! Snapshot output writers

pub mod csv;

pub use csv::{CsvRepliesWriter, CsvThreadsWriter};

/// Output errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV serialization error
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Flush error
    #[error("flush error: {0}")]
    FlushError(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
