//! Cursor pagination over a single logical listing.
//!
//! Drives one listing (channel history or thread replies) to completion by
//! repeatedly fetching with an evolving cursor. Throttling re-enters the
//! same cursor state after the server-directed wait; soft and hard errors
//! abandon the listing early but return everything accumulated so far.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::downloader::config::{INTER_PAGE_DELAY, MAX_PAGES};
use crate::fetcher::{ApiCall, FetchOutcome};
use crate::Message;

/// Why a collection loop stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// A response omitted the next-page cursor: the listing is complete
    Exhausted,
    /// The listing was abandoned early; accumulated items are still returned
    Abandoned(String),
}

impl Termination {
    /// Whether the listing ran to completion
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Termination::Exhausted)
    }
}

/// Accumulated result of one listing
#[derive(Debug)]
pub struct Collected {
    /// Filtered items in page order
    pub items: Vec<Message>,
    /// How the loop terminated
    pub termination: Termination,
    /// Number of successful pages consumed
    pub pages: u64,
}

/// Transition chosen after classifying one fetch outcome
enum Step {
    /// Sleep, then re-issue the identical request (cursor unchanged)
    Retry(Duration),
    /// Page consumed; advance to this cursor, or finish when absent
    Advance(Option<String>),
    /// Stop early, keeping accumulated items
    Stop(String),
}

/// Drives a single listing to completion page by page
pub struct PageCollector {
    page_delay: Duration,
    max_pages: u64,
}

impl PageCollector {
    /// Create a collector with the default inter-page delay and page cap
    pub fn new() -> Self {
        Self {
            page_delay: INTER_PAGE_DELAY,
            max_pages: MAX_PAGES,
        }
    }

    /// Override the delay applied between successful pages
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    /// Override the runaway-cursor page cap
    pub fn with_max_pages(mut self, max_pages: u64) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Collect every item matching `filter` across all pages of a listing.
    ///
    /// # Arguments
    /// * `base` - Request without a cursor; the evolving cursor is merged in
    ///   per page
    /// * `fetch_fn` - Issues one classified fetch for a call
    /// * `filter` - Predicate selecting which page items to keep
    ///
    /// Items failing boundary validation are skipped with a debug log; they
    /// never abort the page.
    pub async fn collect<F, Fut, P>(&self, base: ApiCall, fetch_fn: F, filter: P) -> Collected
    where
        F: Fn(ApiCall) -> Fut,
        Fut: Future<Output = FetchOutcome>,
        P: Fn(&Message) -> bool,
    {
        let mut items: Vec<Message> = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages: u64 = 0;

        let termination = loop {
            if pages >= self.max_pages {
                warn!(
                    method = base.method,
                    pages, "Page cap reached, abandoning listing"
                );
                break Termination::Abandoned(format!(
                    "page cap ({}) exceeded, possible cursor loop",
                    self.max_pages
                ));
            }

            let call = base.with_cursor(cursor.as_deref());
            let step = match fetch_fn(call).await {
                FetchOutcome::Throttled { wait } => {
                    warn!(
                        method = base.method,
                        wait_secs = wait.as_secs(),
                        "Throttled, retrying same page after wait"
                    );
                    Step::Retry(wait)
                }
                FetchOutcome::SoftError(error) => Step::Stop(error),
                FetchOutcome::HardError(error) => Step::Stop(error),
                FetchOutcome::Data(envelope) => {
                    pages += 1;
                    let next_cursor = envelope.next_cursor();
                    let page_total = envelope.messages.len();
                    let mut kept = 0usize;
                    for raw in envelope.messages {
                        match raw.into_message() {
                            Ok(message) => {
                                if filter(&message) {
                                    items.push(message);
                                    kept += 1;
                                }
                            }
                            Err(e) => debug!("Skipping unparsable message: {e}"),
                        }
                    }
                    debug!(
                        method = base.method,
                        page = pages,
                        received = page_total,
                        kept,
                        total = items.len(),
                        "Page consumed"
                    );
                    Step::Advance(next_cursor)
                }
            };

            match step {
                Step::Retry(wait) => sleep(wait).await,
                Step::Advance(Some(next)) => {
                    cursor = Some(next);
                    sleep(self.page_delay).await;
                }
                Step::Advance(None) => break Termination::Exhausted,
                Step::Stop(reason) => {
                    warn!(
                        method = base.method,
                        pages,
                        collected = items.len(),
                        error = %reason,
                        "Listing abandoned, keeping partial result"
                    );
                    break Termination::Abandoned(reason);
                }
            }
        };

        debug!(
            method = base.method,
            pages,
            total = items.len(),
            complete = termination.is_exhausted(),
            "Pagination finished"
        );

        Collected {
            items,
            termination,
            pages,
        }
    }
}

impl Default for PageCollector {
    fn default() -> Self {
        Self::new()
    }
}
