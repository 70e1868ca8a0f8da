//! Slack HTTP client.
//!
//! Issues exactly one HTTP call per invocation and classifies the response
//! into a [`FetchOutcome`]. Retrying — including sleeping out a throttle —
//! is the caller's responsibility, so an in-flight pagination cursor is
//! never advanced past a failed request.

use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ExporterConfig;
use crate::downloader::config::DEFAULT_RETRY_AFTER;
use crate::fetcher::parser::parse_envelope;
use crate::fetcher::{ApiCall, FetchOutcome};

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://slack.com/api";

/// HTTP client for all Slack API interactions
pub struct SlackHttpClient {
    client: Arc<Client>,
    base_url: String,
    token: String,
    cookie: Option<String>,
}

impl SlackHttpClient {
    /// Create a new client.
    ///
    /// # Arguments
    /// * `client` - Shared HTTP client (Arc for cheap cloning)
    /// * `base_url` - Base URL for API endpoints
    /// * `token` - Bearer credential
    /// * `cookie` - Opaque session cookie, sent verbatim when present
    pub fn new(
        client: Arc<Client>,
        base_url: impl Into<String>,
        token: impl Into<String>,
        cookie: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            token: token.into(),
            cookie,
        }
    }

    /// Create a client from loaded configuration, using the default base URL
    pub fn from_config(config: &ExporterConfig) -> Self {
        Self::new(
            Arc::new(Client::new()),
            DEFAULT_BASE_URL,
            config.token.clone(),
            config.cookie.clone(),
        )
    }

    /// Base URL this client targets
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Execute one API call and classify the response.
    ///
    /// Never retries. A 429 status or an API-level `ratelimited` error
    /// classifies as [`FetchOutcome::Throttled`] with the server-directed
    /// wait (fallback [`DEFAULT_RETRY_AFTER`] when the header is absent).
    pub async fn execute(&self, call: &ApiCall) -> FetchOutcome {
        let url = format!("{}/{}", self.base_url, call.method);

        debug!(
            method = call.method,
            params = call.params.len(),
            "Making GET request"
        );

        let mut request = self
            .client
            .get(&url)
            .query(&call.params)
            .bearer_auth(&self.token);
        if let Some(cookie) = &self.cookie {
            request = request.header(reqwest::header::COOKIE, cookie);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return FetchOutcome::HardError(format!("request failed: {e}")),
        };

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let wait = parse_retry_after(response.headers()).unwrap_or(DEFAULT_RETRY_AFTER);
            warn!(
                method = call.method,
                wait_secs = wait.as_secs(),
                "Rate limited (429)"
            );
            return FetchOutcome::Throttled { wait };
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return FetchOutcome::HardError(format!("failed to read body: {e}")),
        };

        classify_payload(status, &body)
    }
}

/// Parse the `Retry-After` header into a wait duration.
///
/// Only the delta-seconds form is produced by the API; an HTTP-date or
/// unparsable value yields `None` so the caller falls back to the default.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(reqwest::header::RETRY_AFTER)?.to_str().ok()?;

    match value.trim().parse::<u64>() {
        Ok(secs) => Some(Duration::from_secs(secs)),
        Err(e) => {
            warn!("Failed to parse Retry-After header '{value}': {e}");
            None
        }
    }
}

/// Classify a non-429 response body into an outcome.
///
/// Split out from [`SlackHttpClient::execute`] so classification is testable
/// without a network.
pub fn classify_payload(status: StatusCode, body: &str) -> FetchOutcome {
    if !status.is_success() {
        return FetchOutcome::HardError(format!("HTTP {status}"));
    }

    let envelope = match parse_envelope(body) {
        Ok(envelope) => envelope,
        Err(e) => return FetchOutcome::HardError(e.to_string()),
    };

    if !envelope.ok {
        let error = envelope.error.unwrap_or_else(|| "unknown".to_string());
        // The API can signal throttling in-band without a 429 status
        if error == "ratelimited" {
            return FetchOutcome::Throttled {
                wait: DEFAULT_RETRY_AFTER,
            };
        }
        return FetchOutcome::SoftError(error);
    }

    FetchOutcome::Data(envelope)
}
