//! Exporter configuration loading.
//!
//! Credentials are supplied pre-obtained in a key-value JSON document; no
//! authentication flow is performed here. A missing token or channel is a
//! fatal configuration error raised before any network activity.

use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Exporter configuration loaded from a `config.json` document
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    /// Bearer credential for API calls
    pub token: String,
    /// Opaque session cookie, sent verbatim when present
    pub cookie: Option<String>,
    /// Target channel identifier
    pub channel: String,
}

/// Raw document shape; every key is optional so that missing keys surface as
/// [`ConfigError::MissingKey`] instead of an opaque parse failure.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(rename = "SLACK_TOKEN")]
    token: Option<String>,
    #[serde(rename = "SLACK_COOKIE")]
    cookie: Option<String>,
    #[serde(rename = "CHANNEL_ID")]
    channel: Option<String>,
}

impl ExporterConfig {
    /// Load configuration from a key-value JSON document.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when the file is missing or unreadable, the
    /// document does not parse, or a required key is missing or empty.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let raw: RawConfig = serde_json::from_str(&contents)
            .map_err(|e| ConfigError::InvalidDocument(e.to_string()))?;

        let token = raw
            .token
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingKey("SLACK_TOKEN"))?;
        let channel = raw
            .channel
            .filter(|c| !c.is_empty())
            .ok_or(ConfigError::MissingKey("CHANNEL_ID"))?;
        let cookie = raw.cookie.filter(|c| !c.is_empty());

        debug!(channel = %channel, has_cookie = cookie.is_some(), "Configuration loaded");

        Ok(Self {
            token,
            cookie,
            channel,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file does not exist
    #[error("{0} not found. Create a config.json containing the token, cookie, and channel information.")]
    NotFound(String),

    /// Config file could not be read
    #[error("failed to read config: {0}")]
    IoError(String),

    /// Config file is not a valid key-value document
    #[error("invalid config document: {0}")]
    InvalidDocument(String),

    /// A required key is missing or empty
    #[error("required config key missing: {0}")]
    MissingKey(&'static str),
}
