//! Sink error types.

use thiserror::Error;
use tp_core::SyncError;

/// Errors that can occur when talking to the sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// HTTP client construction failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The sink section lacks a URL, elevated credential, or owner.
    #[error("sink is not configured: {0}")]
    NotConfigured(String),

    /// Connection, timeout, or a response cut off mid-body.
    #[error("transport error: {0}")]
    Transport(String),

    /// The sink returned a non-success status code.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code returned by the sink.
        status: u16,
        /// Error message or response body.
        message: String,
    },

    /// The sink returned a 429 Too Many Requests response.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// A response body could not be decoded.
    #[error("could not decode sink response: {0}")]
    Decode(String),
}

impl SinkError {
    /// Network/timeout class failures that a retry may clear.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::RateLimited { .. } => true,
            Self::Api { status, .. } => matches!(*status, 408 | 500..=599),
            Self::Http(_) | Self::NotConfigured(_) | Self::Decode(_) => false,
        }
    }

    /// HTTP status, when the sink answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// Map into the cross-crate taxonomy.
    #[must_use]
    pub fn classify(&self) -> SyncError {
        if self.is_transient() {
            SyncError::SinkTransientFailure(self.to_string())
        } else {
            SyncError::SinkPermanentFailure(self.to_string())
        }
    }
}

impl From<SinkError> for SyncError {
    fn from(err: SinkError) -> Self {
        err.classify()
    }
}
