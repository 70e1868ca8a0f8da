//! CSV output writer implementation.
//!
//! Renders the JSON snapshots into human-facing CSV. Newlines inside
//! message text are flattened to spaces, an absent subtype is rendered as
//! `normal_message`, and an unresolved permalink as an empty cell.

use csv::Writer;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, info};

use super::{OutputError, OutputResult};
use crate::{ReplyRecord, ThreadRecord};

const DEFAULT_BUFFER_SIZE: usize = 8192; // 8KB buffer

fn flatten(text: &str) -> String {
    text.replace(['\n', '\r'], " ")
}

/// CSV row for a thread record
#[derive(Debug, Serialize)]
struct ThreadRow {
    ts: String,
    user: String,
    text: String,
    thread_ts: String,
    reply_count: u64,
    subtype: String,
    thread_url: String,
}

impl From<&ThreadRecord> for ThreadRow {
    fn from(record: &ThreadRecord) -> Self {
        Self {
            ts: record.ts.clone(),
            user: record.user.clone(),
            text: flatten(&record.text),
            thread_ts: record.thread_ts.clone(),
            reply_count: record.reply_count,
            subtype: record
                .subtype
                .clone()
                .unwrap_or_else(|| "normal_message".to_string()),
            thread_url: record.permalink.clone().unwrap_or_default(),
        }
    }
}

/// CSV row for a reply record
#[derive(Debug, Serialize)]
struct ReplyRow {
    ts: String,
    user: String,
    text: String,
    thread_ts: String,
    subtype: String,
}

impl From<&ReplyRecord> for ReplyRow {
    fn from(record: &ReplyRecord) -> Self {
        Self {
            ts: record.ts.clone(),
            user: record.user.clone(),
            text: flatten(&record.text),
            thread_ts: record.thread_ts.clone(),
            subtype: record
                .subtype
                .clone()
                .unwrap_or_else(|| "normal_message".to_string()),
        }
    }
}

fn create_writer(path: &Path) -> OutputResult<Writer<BufWriter<File>>> {
    info!("Creating CSV writer: path={}", path.display());

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| OutputError::IoError(format!("Failed to create directory: {e}")))?;
    }

    let file = File::create(path)
        .map_err(|e| OutputError::IoError(format!("Failed to create file: {e}")))?;
    let buf_writer = BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file);

    // Headers are written automatically by csv::Writer on first serialize()
    Ok(Writer::from_writer(buf_writer))
}

fn close_writer(mut writer: Writer<BufWriter<File>>) -> OutputResult<()> {
    writer
        .flush()
        .map_err(|e| OutputError::FlushError(format!("Failed to flush: {e}")))?;

    let buf_writer = writer
        .into_inner()
        .map_err(|e| OutputError::IoError(format!("Failed to get inner writer: {e}")))?;
    let file = buf_writer
        .into_inner()
        .map_err(|e| OutputError::IoError(format!("Failed to get file handle: {e}")))?;
    file.sync_all()
        .map_err(|e| OutputError::IoError(format!("Failed to sync file: {e}")))?;

    Ok(())
}

/// CSV writer for thread records
pub struct CsvThreadsWriter {
    writer: Writer<BufWriter<File>>,
    rows_written: u64,
}

impl CsvThreadsWriter {
    /// Create a new writer at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> OutputResult<Self> {
        Ok(Self {
            writer: create_writer(path.as_ref())?,
            rows_written: 0,
        })
    }

    /// Write a single thread record
    pub fn write_record(&mut self, record: &ThreadRecord) -> OutputResult<()> {
        let row = ThreadRow::from(record);
        self.writer
            .serialize(&row)
            .map_err(|e| OutputError::CsvError(format!("Failed to write thread: {e}")))?;
        self.rows_written += 1;
        Ok(())
    }

    /// Number of rows written so far
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Close the writer and sync the file to disk
    pub fn close(self) -> OutputResult<()> {
        debug!("Closing CSV writer: {} threads written", self.rows_written);
        close_writer(self.writer)
    }
}

/// CSV writer for reply records
pub struct CsvRepliesWriter {
    writer: Writer<BufWriter<File>>,
    rows_written: u64,
}

impl CsvRepliesWriter {
    /// Create a new writer at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> OutputResult<Self> {
        Ok(Self {
            writer: create_writer(path.as_ref())?,
            rows_written: 0,
        })
    }

    /// Write a single reply record
    pub fn write_record(&mut self, record: &ReplyRecord) -> OutputResult<()> {
        let row = ReplyRow::from(record);
        self.writer
            .serialize(&row)
            .map_err(|e| OutputError::CsvError(format!("Failed to write reply: {e}")))?;
        self.rows_written += 1;
        Ok(())
    }

    /// Number of rows written so far
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Close the writer and sync the file to disk
    pub fn close(self) -> OutputResult<()> {
        debug!("Closing CSV writer: {} replies written", self.rows_written);
        close_writer(self.writer)
    }
}
