//! Rate-limited fetching and cursor pagination

use std::time::Duration;

pub mod pager;
pub mod parser;
pub mod slack_http;

pub use pager::{Collected, PageCollector, Termination};
pub use parser::PageEnvelope;
pub use slack_http::SlackHttpClient;

/// Fetcher errors
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// HTTP request error
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Response parse error
    #[error("parse error: {0}")]
    ParseError(String),

    /// API error response
    #[error("API error: {0}")]
    ApiError(String),

    /// Network error
    #[error("network error: {0}")]
    NetworkError(String),
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// One logical API request: a method name plus its query parameters.
///
/// Cursor merging produces a fresh call each page so a throttled retry
/// re-issues the identical request.
#[derive(Debug, Clone)]
pub struct ApiCall {
    /// API method name (e.g. `conversations.history`)
    pub method: &'static str,
    /// Query parameters as key-value pairs
    pub params: Vec<(&'static str, String)>,
}

impl ApiCall {
    /// Create a call with no parameters
    pub fn new(method: &'static str) -> Self {
        Self {
            method,
            params: Vec::new(),
        }
    }

    /// Append a query parameter
    pub fn param(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.params.push((key, value.into()));
        self
    }

    /// Clone this call with the pagination cursor merged in, if present
    pub fn with_cursor(&self, cursor: Option<&str>) -> Self {
        let mut call = self.clone();
        if let Some(cursor) = cursor {
            call.params.push(("cursor", cursor.to_string()));
        }
        call
    }
}

/// Classified result of a single fetch.
///
/// The fetcher never retries; a `Throttled` outcome instructs the caller to
/// sleep the indicated duration and re-issue the identical request.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Successful response payload
    Data(PageEnvelope),
    /// Server-directed throttle; wait this long before retrying
    Throttled {
        /// Server-directed (or fallback) wait duration
        wait: Duration,
    },
    /// API-level rejection (ok=false) for a non-rate-limit reason
    SoftError(String),
    /// Transport or protocol failure
    HardError(String),
}
