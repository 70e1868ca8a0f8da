//! Durable resume markers.
//!
//! Exactly one marker is live per job type: the thread listing keeps a
//! boundary id (the newest message seen in a completed run), and the reply
//! export keeps an index into its ordered work list. A marker is only
//! advanced over work that has already been persisted to the result
//! snapshot.

use serde::{Deserialize, Serialize};

/// Current marker schema version
const SCHEMA_VERSION: &str = "1.0.0";

/// A durable pointer to the next unit of work
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResumeMarker {
    schema_version: String,
    marker: MarkerKind,
    updated_at: i64,
}

/// What kind of position the marker records
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "marker_type", rename_all = "snake_case")]
pub enum MarkerKind {
    /// Newest message id seen by a completed channel listing; the next run
    /// only requests items newer than this
    Boundary {
        /// Newest message id persisted so far
        latest_ts: String,
    },
    /// Next unprocessed position in an ordered work list
    WorkIndex {
        /// Zero-based index of the first unit still to process
        next_index: usize,
    },
}

impl ResumeMarker {
    /// Create a boundary-id marker for the channel listing
    pub fn boundary(latest_ts: impl Into<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            marker: MarkerKind::Boundary {
                latest_ts: latest_ts.into(),
            },
            updated_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Create a work-list index marker for the reply export
    pub fn work_index(next_index: usize) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            marker: MarkerKind::WorkIndex { next_index },
            updated_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Get the marker kind
    pub fn kind(&self) -> &MarkerKind {
        &self.marker
    }

    /// Boundary id, when this is a boundary marker
    pub fn as_boundary(&self) -> Option<&str> {
        match &self.marker {
            MarkerKind::Boundary { latest_ts } => Some(latest_ts),
            MarkerKind::WorkIndex { .. } => None,
        }
    }

    /// Work-list index, when this is an index marker
    pub fn as_work_index(&self) -> Option<usize> {
        match &self.marker {
            MarkerKind::WorkIndex { next_index } => Some(*next_index),
            MarkerKind::Boundary { .. } => None,
        }
    }

    /// Last-updated timestamp in Unix milliseconds
    pub fn updated_at(&self) -> i64 {
        self.updated_at
    }

    /// Whether the stored schema version is one this build understands
    pub fn schema_supported(&self) -> bool {
        self.schema_version == SCHEMA_VERSION
    }
}
