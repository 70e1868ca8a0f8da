//! Snapshot and marker persistence.
//!
//! Every write replaces the whole target file through a temp-file rename, so
//! a crash mid-write can never leave a partially written snapshot behind.
//! Reads treat missing, unreadable, or corrupt state as absent: an export
//! that lost its durable state starts fresh instead of failing.

use fd_lock::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::resume::marker::ResumeMarker;
use crate::{ReplyRecord, ThreadRecord};

/// Atomic reader/writer for result snapshots and resume markers
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotStore;

impl SnapshotStore {
    /// Create a store
    pub fn new() -> Self {
        Self
    }

    /// Load the thread snapshot; absent or corrupt state yields an empty list
    pub fn load_threads(&self, path: &Path) -> Vec<ThreadRecord> {
        self.load_json(path).unwrap_or_default()
    }

    /// Persist the thread snapshot, replacing the whole file
    pub fn save_threads(&self, path: &Path, records: &[ThreadRecord]) -> Result<(), StoreError> {
        self.save_json(path, &records)?;
        info!(
            path = %path.display(),
            records = records.len(),
            "Thread snapshot saved"
        );
        Ok(())
    }

    /// Load the reply snapshot; absent or corrupt state yields an empty list
    pub fn load_replies(&self, path: &Path) -> Vec<ReplyRecord> {
        self.load_json(path).unwrap_or_default()
    }

    /// Persist the reply snapshot, replacing the whole file
    pub fn save_replies(&self, path: &Path, records: &[ReplyRecord]) -> Result<(), StoreError> {
        self.save_json(path, &records)?;
        info!(
            path = %path.display(),
            records = records.len(),
            "Reply snapshot saved"
        );
        Ok(())
    }

    /// Load a resume marker.
    ///
    /// Returns `None` when the file is missing, unreadable, corrupt, or
    /// carries an unknown schema version — the caller starts from zero.
    pub fn load_marker(&self, path: &Path) -> Option<ResumeMarker> {
        let marker: ResumeMarker = self.load_json(path)?;
        if !marker.schema_supported() {
            warn!(
                path = %path.display(),
                "Resume marker schema not supported, starting fresh"
            );
            return None;
        }
        Some(marker)
    }

    /// Persist a resume marker, replacing the whole file
    pub fn save_marker(&self, path: &Path, marker: &ResumeMarker) -> Result<(), StoreError> {
        self.save_json(path, marker)?;
        debug!(path = %path.display(), marker = ?marker.kind(), "Resume marker saved");
        Ok(())
    }

    /// Read and deserialize a state file while holding a shared lock.
    /// Any failure is reported as absence.
    fn load_json<T: DeserializeOwned>(&self, path: &Path) -> Option<T> {
        if !path.exists() {
            debug!(path = %path.display(), "No durable state found");
            return None;
        }

        let lock = match self.open_lock(path) {
            Ok(lock) => lock,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not lock state file, treating as absent");
                return None;
            }
        };
        let _guard = match lock.read() {
            Ok(guard) => guard,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not acquire read lock, treating as absent");
                return None;
            }
        };

        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read state, starting fresh");
                return None;
            }
        };

        match serde_json::from_str(&contents) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupt state, starting fresh");
                None
            }
        }
    }

    /// Serialize and atomically replace a state file under an exclusive lock
    fn save_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::IoError(e.to_string()))?;
        }

        let json = serde_json::to_string_pretty(value)
            .map_err(|e| StoreError::SerializationError(e.to_string()))?;

        let mut lock = self.open_lock(path)?;
        let _guard = lock
            .write()
            .map_err(|e| StoreError::LockError(format!("failed to acquire write lock: {e}")))?;

        let parent_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp_file = tempfile::NamedTempFile::new_in(parent_dir)
            .map_err(|e| StoreError::IoError(format!("failed to create temp file: {e}")))?;

        temp_file
            .write_all(json.as_bytes())
            .map_err(|e| StoreError::IoError(format!("failed to write temp file: {e}")))?;

        // Sync before the rename so the replacement is durable, then fsync
        // the directory so the rename itself is.
        temp_file
            .flush()
            .map_err(|e| StoreError::IoError(format!("failed to flush temp file: {e}")))?;
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| StoreError::IoError(format!("failed to sync temp file: {e}")))?;

        temp_file
            .persist(path)
            .map_err(|e| StoreError::IoError(format!("failed to persist temp file: {e}")))?;

        if let Some(parent) = path.parent() {
            if let Ok(dir) = std::fs::File::open(parent) {
                let _ = dir.sync_all();
            }
        }

        Ok(())
    }

    fn open_lock(&self, path: &Path) -> Result<RwLock<std::fs::File>, StoreError> {
        let lock_path = path.with_extension("lock");
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| StoreError::LockError(format!("failed to create lock file: {e}")))?;
        Ok(RwLock::new(lock_file))
    }
}

/// Errors related to durable state
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Lock error
    #[error("lock error: {0}")]
    LockError(String),
}
