//! Error types for image editing.

use std::time::Duration;

/// Errors that can occur while preparing, editing or adjusting an image.
#[derive(Debug, thiserror::Error)]
pub enum RetouchError {
    /// Required configuration is missing (e.g., no API key).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// API key rejected by the remote service.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limit exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Content was blocked by safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// The remote call succeeded but produced no image.
    #[error("no image was produced for this request")]
    NoImage,

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Another edit request is already in flight.
    #[error("an edit request is already in progress")]
    Busy,

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Malformed data URL or base64 payload.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// Raster could not be loaded, drawn or encoded.
    #[error("image processing failed: {0}")]
    Canvas(String),

    /// I/O error (e.g., reading the input or saving the download).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RetouchError {
    /// Returns true if the failure came from the remote edit call.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Auth(_)
                | Self::Api { .. }
                | Self::RateLimited { .. }
                | Self::ContentBlocked(_)
                | Self::Network(_)
                | Self::Json(_)
        )
    }

    /// Returns the suggested retry delay, if the service sent one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl From<image::ImageError> for RetouchError {
    fn from(err: image::ImageError) -> Self {
        Self::Canvas(err.to_string())
    }
}

/// Result type alias for image editing operations.
pub type Result<T> = std::result::Result<T, RetouchError>;

/// Maximum length of a remote error body kept in an error message.
const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Trims a remote error body and redacts anything that looks like an API key.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let redacted: Vec<String> = text
        .split_whitespace()
        .map(|word| {
            let bare = word.trim_matches(|c: char| !c.is_ascii_alphanumeric());
            if bare.starts_with("AIza") && bare.len() >= 30 {
                word.replace(bare, "[REDACTED]")
            } else {
                word.to_string()
            }
        })
        .collect();
    let joined = redacted.join(" ");

    if joined.chars().count() > MAX_ERROR_MESSAGE_LEN {
        let truncated: String = joined.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
        format!("{truncated}...")
    } else {
        joined
    }
}

/// Reads a `Retry-After` header expressed in whole seconds.
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
