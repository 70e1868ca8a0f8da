//! Response envelope parsing.
//!
//! Converts wire JSON into model types, validating only the fields this
//! exporter consumes. Messages that fail boundary validation are skipped by
//! callers rather than failing the whole page.

use crate::fetcher::{FetcherError, FetcherResult};
use crate::Message;
use serde::Deserialize;

/// Envelope common to all consumed API responses
#[derive(Debug, Default, Deserialize)]
pub struct PageEnvelope {
    /// API-level success flag
    pub ok: bool,
    /// API-level error code when `ok` is false
    #[serde(default)]
    pub error: Option<String>,
    /// Page of messages for listing calls
    #[serde(default)]
    pub messages: Vec<RawMessage>,
    /// Pagination metadata
    #[serde(default)]
    pub response_metadata: Option<ResponseMetadata>,
    /// Resolved permalink for `chat.getPermalink` calls
    #[serde(default)]
    pub permalink: Option<String>,
}

impl PageEnvelope {
    /// Next-page cursor, normalized: an absent or empty cursor means the
    /// listing is exhausted.
    pub fn next_cursor(&self) -> Option<String> {
        self.response_metadata
            .as_ref()
            .and_then(|meta| meta.next_cursor.as_deref())
            .filter(|cursor| !cursor.is_empty())
            .map(str::to_string)
    }
}

/// Pagination metadata carried by listing responses
#[derive(Debug, Default, Deserialize)]
pub struct ResponseMetadata {
    /// Opaque token for the next page, empty when exhausted
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// A message as it appears on the wire, before boundary validation
#[derive(Debug, Default, Deserialize)]
pub struct RawMessage {
    /// Message id
    #[serde(default)]
    pub ts: Option<String>,
    /// Author user id
    #[serde(default)]
    pub user: Option<String>,
    /// Message text
    #[serde(default)]
    pub text: Option<String>,
    /// Thread id, if the message belongs to a thread
    #[serde(default)]
    pub thread_ts: Option<String>,
    /// Reply count, present on thread roots
    #[serde(default)]
    pub reply_count: Option<u64>,
    /// Message subtype
    #[serde(default)]
    pub subtype: Option<String>,
}

impl RawMessage {
    /// Convert into a validated [`Message`].
    ///
    /// # Errors
    /// Returns [`FetcherError::ParseError`] when the id is missing or fails
    /// validation.
    pub fn into_message(self) -> FetcherResult<Message> {
        let ts = self
            .ts
            .ok_or_else(|| FetcherError::ParseError("message missing ts".to_string()))?;

        let message = Message {
            ts,
            user: self.user.unwrap_or_else(|| "Unknown".to_string()),
            text: self.text.unwrap_or_default(),
            thread_ts: self.thread_ts,
            reply_count: self.reply_count.unwrap_or(0),
            subtype: self.subtype,
        };

        message.validate().map_err(FetcherError::ParseError)?;
        Ok(message)
    }
}

/// Parse a response body into an envelope
pub fn parse_envelope(body: &str) -> FetcherResult<PageEnvelope> {
    serde_json::from_str(body)
        .map_err(|e| FetcherError::ParseError(format!("failed to deserialize response: {e}")))
}
