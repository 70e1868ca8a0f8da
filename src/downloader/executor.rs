//! Export executor with resume capability.
//!
//! Turns a list of independent work units into a crash-resumable job. The
//! durable marker and the snapshot files are mutated only here, after a unit
//! completes; collectors and the enricher return their results and never
//! touch shared state. Persistence order per unit is snapshot first, marker
//! second, so the marker never points past work that is not yet durable.

use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::downloader::config::PAGE_LIMIT;
use crate::downloader::enrich::{resolve_permalink, Enricher};
use crate::downloader::{ExportError, ExportJob, JobProgress, JobStatus};
use crate::fetcher::pager::Termination;
use crate::fetcher::{ApiCall, PageCollector, SlackHttpClient};
use crate::resume::{ResumeMarker, SnapshotStore};
use crate::{ts_sort_key, Message, ReplyRecord, ThreadRecord};

/// Locations of all durable state for one export.
///
/// Passed to the executor at construction; nothing in the library addresses
/// files through process-wide constants.
#[derive(Debug, Clone)]
pub struct StatePaths {
    state_dir: PathBuf,
}

impl StatePaths {
    /// Root all state files under the given directory
    pub fn new<P: Into<PathBuf>>(state_dir: P) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    /// Directory holding all durable state
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Thread snapshot: the reply export's work list
    pub fn threads_snapshot(&self) -> PathBuf {
        self.state_dir.join("threads.json")
    }

    /// Reply snapshot
    pub fn replies_snapshot(&self) -> PathBuf {
        self.state_dir.join("replies.json")
    }

    /// Boundary marker for the channel thread listing
    pub fn threads_marker(&self) -> PathBuf {
        self.state_dir.join("threads_marker.json")
    }

    /// Work-list index marker for the reply export
    pub fn replies_marker(&self) -> PathBuf {
        self.state_dir.join("progress.json")
    }
}

/// Callback invoked after each persisted unit with (completed, total)
pub type UnitProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Export executor orchestrates resumable export jobs
pub struct ExportExecutor {
    client: SlackHttpClient,
    store: SnapshotStore,
    paths: StatePaths,
    collector: PageCollector,
    concurrency: usize,
    unit_progress: Option<UnitProgressFn>,
}

impl ExportExecutor {
    /// Create an executor persisting state under `paths`
    pub fn new(client: SlackHttpClient, paths: StatePaths) -> Self {
        Self {
            client,
            store: SnapshotStore::new(),
            paths,
            collector: PageCollector::new(),
            concurrency: crate::downloader::config::DEFAULT_CONCURRENCY,
            unit_progress: None,
        }
    }

    /// Set the number of concurrent work units in flight
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Override the page collector (tests shorten its delays)
    pub fn with_collector(mut self, collector: PageCollector) -> Self {
        self.collector = collector;
        self
    }

    /// Attach a per-unit progress callback
    pub fn with_unit_progress(mut self, callback: UnitProgressFn) -> Self {
        self.unit_progress = Some(callback);
        self
    }

    /// State paths this executor persists to
    pub fn paths(&self) -> &StatePaths {
        &self.paths
    }

    /// Export thread roots from the channel history.
    ///
    /// Resume strategy: boundary id. A completed run records the newest
    /// message id seen; the next run passes it as the listing lower bound
    /// and drops anything at or before it, so re-runs only append newer
    /// threads. The boundary only advances when the listing ran to
    /// completion — after an abandoned listing the partial result is still
    /// persisted, but the old boundary is kept so nothing is skipped on the
    /// next attempt.
    pub async fn export_threads(&self, job: &mut ExportJob) -> Result<JobProgress, ExportError> {
        let span = tracing::info_span!("export_threads", channel = %job.channel);
        let _enter = span.enter();

        job.validate().map_err(ExportError::Validation)?;
        job.status = JobStatus::InProgress;
        job.progress.units_total = Some(1);

        let boundary = self
            .store
            .load_marker(&self.paths.threads_marker())
            .and_then(|marker| marker.as_boundary().map(str::to_string));
        if let Some(boundary) = &boundary {
            info!(boundary = %boundary, "Resuming listing from boundary id");
        }

        let mut base = ApiCall::new("conversations.history")
            .param("channel", job.channel.clone())
            .param("limit", PAGE_LIMIT.to_string());
        if let Some(boundary) = &boundary {
            base = base.param("oldest", boundary.clone());
        }

        let client = &self.client;
        let collected = self
            .collector
            .collect(
                base,
                |call| async move { client.execute(&call).await },
                Message::is_thread_root,
            )
            .await;
        job.progress.pages_fetched += collected.pages;

        // The listing param is a lower bound already; this filter guarantees
        // exclusion even when the server treats the bound inclusively.
        let boundary_key = boundary.as_deref().map(ts_sort_key);
        let mut roots: Vec<Message> = collected
            .items
            .into_iter()
            .filter(|message| boundary_key.is_none_or(|key| ts_sort_key(&message.ts) > key))
            .collect();

        // Channel listings arrive newest first; results are kept ascending
        roots.sort_by_key(|message| ts_sort_key(&message.ts));

        let mut existing = self.store.load_threads(&self.paths.threads_snapshot());
        let known: HashSet<String> = existing.iter().map(|record| record.ts.clone()).collect();

        let fresh: Vec<ThreadRecord> = roots
            .into_iter()
            .filter(|message| !known.contains(&message.ts))
            .map(ThreadRecord::from_root)
            .collect();

        for record in &fresh {
            let preview: String = record.text.chars().take(50).collect();
            info!(
                ts = %record.ts,
                reply_count = record.reply_count,
                preview = %preview,
                "Found a thread"
            );
        }

        let channel = job.channel.clone();
        let enriched = Enricher::new(self.concurrency)
            .enrich(fresh, |ts| {
                let channel = channel.clone();
                async move { resolve_permalink(client, &channel, &ts).await }
            })
            .await;

        job.progress.records_collected += enriched.len() as u64;
        existing.extend(enriched);

        self.store
            .save_threads(&self.paths.threads_snapshot(), &existing)?;

        match &collected.termination {
            Termination::Exhausted => {
                if let Some(newest) = existing
                    .iter()
                    .map(|record| record.ts.as_str())
                    .max_by_key(|ts| ts_sort_key(ts))
                {
                    self.store
                        .save_marker(&self.paths.threads_marker(), &ResumeMarker::boundary(newest))?;
                }
                job.progress.units_completed = 1;
                job.status = JobStatus::Completed;
            }
            Termination::Abandoned(reason) => {
                warn!(
                    error = %reason,
                    persisted = existing.len(),
                    "Listing abandoned; partial result persisted, boundary unchanged"
                );
                job.progress.error = Some(reason.clone());
                job.status = JobStatus::Failed;
            }
        }

        info!(
            status = ?job.status,
            threads = existing.len(),
            "Thread export finished"
        );

        Ok(job.progress.clone())
    }

    /// Export replies for every thread in the work list.
    ///
    /// Resume strategy: work-list index. Units run through a bounded worker
    /// pool but complete in work-list order; after each unit the snapshot is
    /// persisted and the marker advanced, so an interrupted run resumes at
    /// the first unprocessed thread. Completion resets the marker to zero.
    pub async fn export_replies(&self, job: &mut ExportJob) -> Result<JobProgress, ExportError> {
        let span = tracing::info_span!("export_replies", channel = %job.channel);
        let _enter = span.enter();

        job.validate().map_err(ExportError::Validation)?;
        job.status = JobStatus::InProgress;

        let threads_path = self.paths.threads_snapshot();
        if !threads_path.exists() {
            return Err(ExportError::WorkListMissing(format!(
                "{} not found. Run the threads export first.",
                threads_path.display()
            )));
        }

        let work: Vec<String> = self
            .store
            .load_threads(&threads_path)
            .into_iter()
            .map(|record| record.thread_ts)
            .collect();
        let total = work.len();
        job.progress.units_total = Some(total as u64);

        let start = self
            .store
            .load_marker(&self.paths.replies_marker())
            .and_then(|marker| marker.as_work_index())
            .unwrap_or(0)
            .min(total);
        if start > 0 {
            info!(start, total, "Resuming reply export from work-list index");
        }
        job.progress.units_completed = start as u64;

        let mut replies = self.store.load_replies(&self.paths.replies_snapshot());
        let mut seen: HashSet<String> = replies.iter().map(|record| record.ts.clone()).collect();

        if start >= total {
            self.store
                .save_replies(&self.paths.replies_snapshot(), &replies)?;
            self.store
                .save_marker(&self.paths.replies_marker(), &ResumeMarker::work_index(0))?;
            job.status = JobStatus::Completed;
            info!(total, "No remaining work units; reply export complete");
            return Ok(job.progress.clone());
        }

        let client = &self.client;
        let collector = &self.collector;
        let channel = job.channel.clone();

        // Ordered buffered pool: up to `concurrency` thread fetches in
        // flight, yielded back in work-list order so persistence below never
        // runs ahead of the marker.
        let mut units = stream::iter(work[start..].iter().enumerate())
            .map(|(offset, thread_ts)| {
                let channel = channel.clone();
                let thread_ts = thread_ts.clone();
                async move {
                    let base = ApiCall::new("conversations.replies")
                        .param("channel", channel)
                        .param("ts", thread_ts.clone())
                        .param("limit", PAGE_LIMIT.to_string());
                    let collected = collector
                        .collect(
                            base,
                            |call| async move { client.execute(&call).await },
                            Message::is_reply,
                        )
                        .await;
                    (offset, thread_ts, collected)
                }
            })
            .buffered(self.concurrency);

        while let Some((offset, thread_ts, collected)) = units.next().await {
            let index = start + offset;
            job.progress.pages_fetched += collected.pages;

            if let Termination::Abandoned(reason) = &collected.termination {
                warn!(
                    ts = %thread_ts,
                    error = %reason,
                    "Unit abandoned; keeping partial result and continuing"
                );
                job.progress.error = Some(reason.clone());
            }

            let mut appended = 0u64;
            for message in collected.items {
                if let Some(reply) = ReplyRecord::from_reply(message) {
                    if seen.insert(reply.ts.clone()) {
                        replies.push(reply);
                        appended += 1;
                    }
                }
            }

            // One logical persistence step: snapshot, then marker
            self.store
                .save_replies(&self.paths.replies_snapshot(), &replies)?;
            self.store.save_marker(
                &self.paths.replies_marker(),
                &ResumeMarker::work_index(index + 1),
            )?;

            job.progress.units_completed += 1;
            job.progress.records_collected += appended;
            info!(
                unit = index + 1,
                total,
                ts = %thread_ts,
                replies = appended,
                "Unit persisted"
            );

            if let Some(callback) = &self.unit_progress {
                callback(job.progress.units_completed, total as u64);
            }
        }

        drop(units);

        self.store
            .save_replies(&self.paths.replies_snapshot(), &replies)?;
        self.store
            .save_marker(&self.paths.replies_marker(), &ResumeMarker::work_index(0))?;
        job.status = JobStatus::Completed;

        info!(
            total,
            replies = replies.len(),
            "Reply export complete; marker reset"
        );

        Ok(job.progress.clone())
    }
}
