//! Upstream generation APIs
//!
//! Provides the shared error taxonomy, the retrying HTTP client and the two
//! provider instantiations (text completion and image generation).

pub mod http_utils;
/// Implementations of the concrete upstream providers
pub mod providers;
pub mod upstream;

use crate::retry::{Disposition, RetryError, RetryObserver};
use async_trait::async_trait;
use thiserror::Error;

/// Status codes that indicate a defect in the request or credentials.
pub const NON_RETRYABLE_STATUSES: [u16; 3] = [400, 401, 403];

/// Classified outcome of a failed upstream call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    /// Too many requests (429)
    #[error("rate limit exceeded (429)")]
    RateLimited,
    /// 4xx response other than 429
    #[error("client error {status}: {message}")]
    ClientError {
        /// HTTP status code
        status: u16,
        /// Cleaned response body
        message: String,
    },
    /// 5xx or otherwise unexpected response
    #[error("server error {status}: {message}")]
    ServerError {
        /// HTTP status code
        status: u16,
        /// Cleaned response body
        message: String,
    },
    /// Connection-level failure
    #[error("network error: {0}")]
    Network(String),
    /// The request exceeded its timeout
    #[error("request timed out")]
    Timeout,
    /// A successful response that could not be interpreted
    #[error("malformed response: {0}")]
    Decode(String),
    /// Required configuration is missing; detected before any network call
    #[error("missing configuration: {0}")]
    Configuration(String),
}

impl UpstreamError {
    /// Maps a non-success HTTP status to an error class.
    #[must_use]
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            429 => Self::RateLimited,
            400..=499 => Self::ClientError { status, message },
            _ => Self::ServerError { status, message },
        }
    }

    /// HTTP status carried by the error, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::RateLimited => Some(429),
            Self::ClientError { status, .. } | Self::ServerError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Retry classification used by every upstream client.
    ///
    /// # Examples
    ///
    /// ```
    /// use relay_chat_bot::llm::UpstreamError;
    /// use relay_chat_bot::retry::Disposition;
    ///
    /// assert_eq!(UpstreamError::RateLimited.disposition(), Disposition::Retry);
    /// assert_eq!(
    ///     UpstreamError::from_status(401, String::new()).disposition(),
    ///     Disposition::Abort
    /// );
    /// ```
    #[must_use]
    pub fn disposition(&self) -> Disposition {
        match self {
            Self::RateLimited | Self::ServerError { .. } | Self::Network(_) | Self::Timeout => {
                Disposition::Retry
            }
            Self::ClientError { status, .. } if NON_RETRYABLE_STATUSES.contains(status) => {
                Disposition::Abort
            }
            Self::ClientError { .. } => Disposition::Retry,
            Self::Decode(_) | Self::Configuration(_) => Disposition::Abort,
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// Result of a retried upstream call
pub type UpstreamResult<T> = Result<T, RetryError<UpstreamError>>;

/// Text-completion operations used by the bot
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Single-turn chat completion with the fixed assistant instruction.
    async fn chat(&self, user_message: &str) -> UpstreamResult<String>;

    /// Best-effort English translation. Returns `text` unchanged on failure.
    async fn translate(&self, text: &str) -> String;
}

/// Image-generation operations used by the bot
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Generate images for `prompt`, returning raw encoded image bytes.
    ///
    /// `observer` is told about every retry so the caller can keep the user informed.
    async fn generate_image(
        &self,
        prompt: &str,
        observer: &dyn RetryObserver<UpstreamError>,
    ) -> UpstreamResult<Vec<Vec<u8>>>;
}
