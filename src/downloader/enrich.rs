//! Concurrent permalink enrichment.
//!
//! Given a batch of thread records, resolves each record's permalink with a
//! bounded number of resolver calls in flight. Completion order is
//! unconstrained, but the returned batch preserves the original sequence
//! position of every item. A single failed resolution leaves that record's
//! permalink absent instead of failing the batch.

use futures::stream::{self, StreamExt};
use std::future::Future;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::fetcher::{ApiCall, FetchOutcome, SlackHttpClient};
use crate::ThreadRecord;

/// Bounded-parallelism permalink enrichment
pub struct Enricher {
    concurrency: usize,
}

impl Enricher {
    /// Create an enricher with at most `concurrency` resolver calls in flight
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    /// Resolve permalinks for a batch of records.
    ///
    /// The resolver receives a thread id and yields the permalink, or `None`
    /// on failure. Progress is logged as completed/total after each
    /// completion without blocking in-flight work.
    pub async fn enrich<F, Fut>(&self, records: Vec<ThreadRecord>, resolve: F) -> Vec<ThreadRecord>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Option<String>>,
    {
        let total = records.len();
        if total == 0 {
            return records;
        }

        let resolve = &resolve;
        let mut slots: Vec<Option<ThreadRecord>> = (0..total).map(|_| None).collect();

        // buffer_unordered keeps at most `concurrency` resolutions in flight
        // and yields them as they finish; the index carried through each
        // future puts results back into submission order.
        let mut completions = stream::iter(records.into_iter().enumerate())
            .map(|(index, mut record)| async move {
                record.permalink = resolve(record.ts.clone()).await;
                (index, record)
            })
            .buffer_unordered(self.concurrency);

        let mut completed = 0usize;
        while let Some((index, record)) = completions.next().await {
            completed += 1;
            info!(
                completed,
                total,
                ts = %record.ts,
                resolved = record.permalink.is_some(),
                "Permalink resolution progress"
            );
            slots[index] = Some(record);
        }

        slots.into_iter().flatten().collect()
    }
}

impl Default for Enricher {
    fn default() -> Self {
        Self::new(crate::downloader::config::DEFAULT_CONCURRENCY)
    }
}

/// Resolve the permalink for one message.
///
/// Follows the throttle discipline: a throttled call sleeps the
/// server-directed wait and re-issues the identical request, for as long as
/// the server keeps signaling. Soft and hard errors abandon this single
/// resolution with an absent permalink.
pub async fn resolve_permalink(
    client: &SlackHttpClient,
    channel: &str,
    message_ts: &str,
) -> Option<String> {
    let call = ApiCall::new("chat.getPermalink")
        .param("channel", channel)
        .param("message_ts", message_ts);

    loop {
        match client.execute(&call).await {
            FetchOutcome::Throttled { wait } => {
                warn!(
                    ts = message_ts,
                    wait_secs = wait.as_secs(),
                    "Throttled while resolving permalink"
                );
                sleep(wait).await;
            }
            FetchOutcome::Data(envelope) => {
                return envelope.permalink.filter(|p| !p.is_empty());
            }
            FetchOutcome::SoftError(error) => {
                warn!(ts = message_ts, error = %error, "Could not resolve permalink");
                return None;
            }
            FetchOutcome::HardError(error) => {
                warn!(ts = message_ts, error = %error, "Permalink request failed");
                return None;
            }
        }
    }
}
