//! Export orchestration
//!
//! This module provides the resumable export engine:
//!
//! 1. **Job Creation**: Define what to export using [`job::ExportJob`]
//! 2. **Execution**: Process the job using [`executor::ExportExecutor`]
//! 3. **Enrichment**: Bounded-parallelism permalink resolution via
//!    [`enrich::Enricher`]
//! 4. **Resume Support**: A durable marker is advanced after every persisted
//!    unit of work, so an interrupted job restarts exactly where it stopped
//!
//! # Error Handling
//!
//! Remote soft errors and transport failures abandon the current unit while
//! preserving everything collected before the failure; the job carries on
//! with the remaining units. Only configuration and persistence-write
//! failures abort a job. Unreadable resume or snapshot state is treated as
//! absent, never fatal.

pub mod config;
pub mod enrich;
pub mod executor;
pub mod job;

pub use enrich::Enricher;
pub use executor::{ExportExecutor, StatePaths};
pub use job::{ExportJob, JobProgress, JobStatus, JobType};

use crate::resume::store::StoreError;

/// Export errors
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Durable state could not be written
    #[error("state error: {0}")]
    State(#[from] StoreError),

    /// The reply export needs a thread work list from a prior run
    #[error("work list missing: {0}")]
    WorkListMissing(String),

    /// Invalid job parameters
    #[error("validation error: {0}")]
    Validation(String),
}
