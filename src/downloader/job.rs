//! Export job structures and status tracking

use serde::{Deserialize, Serialize};

/// Job type specifies what kind of export to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobType {
    /// List thread roots from the channel history and resolve permalinks
    Threads,
    /// Fetch replies for every thread in the work list
    Replies,
}

/// Export job specification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportJob {
    /// Target channel identifier
    pub channel: String,
    /// Job type (threads or replies)
    pub job_type: JobType,
    /// Current job status
    #[serde(default)]
    pub status: JobStatus,
    /// Job progress tracking
    #[serde(default)]
    pub progress: JobProgress,
}

impl ExportJob {
    /// Create a new thread-listing export job
    pub fn threads(channel: String) -> Self {
        Self {
            channel,
            job_type: JobType::Threads,
            status: JobStatus::Pending,
            progress: JobProgress::default(),
        }
    }

    /// Create a new reply export job
    pub fn replies(channel: String) -> Self {
        Self {
            channel,
            job_type: JobType::Replies,
            status: JobStatus::Pending,
            progress: JobProgress::default(),
        }
    }

    /// Validate job parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.channel.is_empty() {
            return Err("Channel cannot be empty".to_string());
        }

        Ok(())
    }
}

/// Job execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum JobStatus {
    /// Job has not started yet
    #[default]
    Pending,
    /// Job is currently running
    InProgress,
    /// Job completed successfully
    Completed,
    /// Job failed with error
    Failed,
}

/// Job progress tracking
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct JobProgress {
    /// Total number of work units, once known
    pub units_total: Option<u64>,
    /// Number of work units completed and persisted
    pub units_completed: u64,
    /// Number of records collected from the API
    pub records_collected: u64,
    /// Number of pages fetched across all listings
    pub pages_fetched: u64,
    /// Error message if a unit or the job was abandoned
    pub error: Option<String>,
}

impl JobProgress {
    /// Calculate completion percentage (0.0 to 100.0)
    pub fn percentage(&self) -> Option<f64> {
        self.units_total.map(|total| {
            if total == 0 {
                100.0
            } else {
                (self.units_completed as f64 / total as f64) * 100.0
            }
        })
    }

    /// Check if all known units are complete
    pub fn is_complete(&self) -> bool {
        if let Some(total) = self.units_total {
            self.units_completed >= total
        } else {
            false
        }
    }
}
