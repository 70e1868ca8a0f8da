//! # Slack Thread Downloader Library
//!
//! A library for bulk-exporting thread conversations from a Slack channel.
//! Designed for long-running archival extractions that must survive crashes,
//! network failures, and server-imposed rate limiting without losing progress
//! or duplicating work.
//!
//! ## Features
//!
//! - **Cursor Pagination**: Walks unbounded channel histories and thread
//!   reply listings page by page
//! - **Resume Capability**: Durable markers let an interrupted export restart
//!   exactly where it left off
//! - **Rate Limiting**: Honors server-directed `Retry-After` waits without
//!   corrupting in-flight pagination state
//! - **Concurrent Enrichment**: Bounded-parallelism permalink resolution for
//!   discovered threads
//! - **Incremental Persistence**: Snapshots are atomically rewritten after
//!   every unit of progress
//!
//! ## Quick Start
//!
//! ```no_run
//! use slack_thread_downloader::config::ExporterConfig;
//! use slack_thread_downloader::downloader::{ExportExecutor, ExportJob, StatePaths};
//! use slack_thread_downloader::fetcher::slack_http::SlackHttpClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ExporterConfig::load("config.json".as_ref())?;
//! let client = SlackHttpClient::from_config(&config);
//! let paths = StatePaths::new("./state");
//!
//! let executor = ExportExecutor::new(client, paths);
//! let mut job = ExportJob::threads(config.channel.clone());
//! executor.export_threads(&mut job).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several core modules:
//!
//! - [`config`] - Credential/channel configuration loading
//! - [`fetcher`] - Rate-limit-aware HTTP calls and cursor pagination
//! - [`downloader`] - Export orchestration with resumable job execution
//! - [`resume`] - Durable resume markers and snapshot persistence
//! - [`output`] - CSV rendering of exported snapshots
//!
//! ## Data Types
//!
//! The library defines strongly-typed records for all exported data:
//!
//! - [`Message`] - A channel message as returned by the listing API
//! - [`ThreadRecord`] - A thread root with its resolved permalink
//! - [`ReplyRecord`] - A reply belonging to a thread

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};

/// CLI command implementations
pub mod cli;

/// Exporter configuration loading
pub mod config;

/// Export orchestration
pub mod downloader;

/// Rate-limited fetching and pagination
pub mod fetcher;

/// Snapshot output writers
pub mod output;

/// Resume capability for export jobs
pub mod resume;

// Re-export commonly used types
pub use config::ExporterConfig;

/// Numeric sort key for a message timestamp id.
///
/// Message ids are strings of the form `"1712345678.000100"` (epoch seconds
/// plus a uniqueness suffix). Comparing them as numbers keeps ordering
/// correct regardless of how many integer digits the epoch part carries.
pub fn ts_sort_key(ts: &str) -> (u64, u64) {
    let mut parts = ts.splitn(2, '.');
    let secs = parts
        .next()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);
    let seq = parts
        .next()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);
    (secs, seq)
}

/// A channel message as consumed from the listing API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Message id: timestamp-as-string, unique within a channel
    pub ts: String,
    /// Author user id
    pub user: String,
    /// Message text
    pub text: String,
    /// Id of the thread this message belongs to, if any
    pub thread_ts: Option<String>,
    /// Number of replies (non-zero marks a thread root)
    pub reply_count: u64,
    /// Message subtype, absent for plain messages
    pub subtype: Option<String>,
}

impl Message {
    /// Validate message integrity at the API-response boundary
    pub fn validate(&self) -> Result<(), String> {
        if self.ts.is_empty() {
            return Err("Message ts cannot be empty".to_string());
        }

        let secs = self.ts.split('.').next().unwrap_or("");
        if secs.parse::<u64>().is_err() {
            return Err(format!("Message ts is not a timestamp: {}", self.ts));
        }

        Ok(())
    }

    /// Whether this message starts a thread (has at least one reply)
    pub fn is_thread_root(&self) -> bool {
        self.reply_count > 0
    }

    /// Whether this message is a reply inside a thread (belongs to a thread
    /// whose root id differs from its own id)
    pub fn is_reply(&self) -> bool {
        matches!(&self.thread_ts, Some(root) if *root != self.ts)
    }
}

/// A thread root augmented with its resolved permalink
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThreadRecord {
    /// Message id of the thread root
    pub ts: String,
    /// Author user id
    pub user: String,
    /// Message text
    pub text: String,
    /// Thread id; for a root this equals `ts`
    pub thread_ts: String,
    /// Number of replies in the thread
    pub reply_count: u64,
    /// Message subtype, absent for plain messages
    pub subtype: Option<String>,
    /// Resolved permalink URL, absent until enrichment succeeds
    pub permalink: Option<String>,
}

impl ThreadRecord {
    /// Build a record from a thread-root message. The permalink starts
    /// absent and is filled in by enrichment.
    pub fn from_root(message: Message) -> Self {
        let thread_ts = message.ts.clone();
        Self {
            ts: message.ts,
            user: message.user,
            text: message.text,
            thread_ts,
            reply_count: message.reply_count,
            subtype: message.subtype,
            permalink: None,
        }
    }

    /// Validate record integrity
    pub fn validate(&self) -> Result<(), String> {
        if self.ts.is_empty() {
            return Err("Thread ts cannot be empty".to_string());
        }

        if self.ts != self.thread_ts {
            return Err(format!(
                "Thread root id ({}) must equal its thread id ({})",
                self.ts, self.thread_ts
            ));
        }

        if self.reply_count == 0 {
            return Err("Thread root must have at least one reply".to_string());
        }

        Ok(())
    }
}

/// A reply belonging to a thread
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplyRecord {
    /// Message id of the reply
    pub ts: String,
    /// Author user id
    pub user: String,
    /// Message text
    pub text: String,
    /// Id of the thread root this reply belongs to
    pub thread_ts: String,
    /// Message subtype, absent for plain messages
    pub subtype: Option<String>,
}

impl ReplyRecord {
    /// Build a record from a reply message. Returns `None` when the message
    /// is not a reply (no thread id, or it is the thread root itself).
    pub fn from_reply(message: Message) -> Option<Self> {
        if !message.is_reply() {
            return None;
        }
        let thread_ts = message.thread_ts.clone()?;
        Some(Self {
            ts: message.ts,
            user: message.user,
            text: message.text,
            thread_ts,
            subtype: message.subtype,
        })
    }

    /// Validate record integrity
    pub fn validate(&self) -> Result<(), String> {
        if self.ts.is_empty() {
            return Err("Reply ts cannot be empty".to_string());
        }

        if self.ts == self.thread_ts {
            return Err(format!(
                "Reply id ({}) must differ from its thread id",
                self.ts
            ));
        }

        Ok(())
    }
}
