//! Export tuning constants

use std::time::Duration;

/// Page size requested from listing endpoints.
/// 1000 is the largest page the API serves; fewer round-trips means fewer
/// chances to hit a rate limit mid-listing.
pub const PAGE_LIMIT: u64 = 1000;

/// Delay between successful pages of one listing.
/// Tier-limited listing endpoints tolerate roughly one request per second;
/// pacing proactively avoids most 429 responses instead of reacting to them.
pub const INTER_PAGE_DELAY: Duration = Duration::from_secs(1);

/// Fallback wait when a throttle response omits the Retry-After header.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(10);

/// Default number of concurrent work units (reply fetches or permalink
/// resolutions) in flight.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Maximum allowed concurrency. More than 10 parallel callers defeats the
/// per-page pacing and triggers sustained throttling.
pub const MAX_CONCURRENCY: usize = 10;

/// Maximum pages consumed from a single listing before abandoning it.
/// A well-formed listing terminates by omitting its next cursor; the cap
/// only guards against a server bug handing back a cycling cursor.
pub const MAX_PAGES: u64 = 10_000;
