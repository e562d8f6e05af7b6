//! Source adapter error types.

use thiserror::Error;
use tp_core::SyncError;

#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP client construction failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The source could not be reached, timed out, or dropped the connection.
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// The source answered with an application-level error.
    #[error("source rejected the request: {0}")]
    Rejected(String),

    /// The response could not be parsed as XML.
    #[error("malformed source response: {0}")]
    Malformed(String),
}

impl SourceError {
    /// Whether re-issuing the same request may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    /// Map into the cross-crate taxonomy.
    #[must_use]
    pub fn classify(&self) -> SyncError {
        match self {
            Self::Http(e) => SyncError::SourceUnavailable(e.to_string()),
            Self::Unavailable(msg) => SyncError::SourceUnavailable(msg.clone()),
            Self::Rejected(msg) => SyncError::SourceRejected(msg.clone()),
            Self::Malformed(msg) => SyncError::SourceRejected(format!("malformed response: {msg}")),
        }
    }
}

impl From<SourceError> for SyncError {
    fn from(err: SourceError) -> Self {
        err.classify()
    }
}

impl From<quick_xml::Error> for SourceError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_follows_taxonomy() {
        assert!(matches!(
            SourceError::Unavailable("refused".into()).classify(),
            SyncError::SourceUnavailable(_)
        ));
        assert!(matches!(
            SourceError::Malformed("bad tag".into()).classify(),
            SyncError::SourceRejected(_)
        ));
        assert!(SyncError::from(SourceError::Unavailable("x".into())).is_transient());
    }

    #[test]
    fn only_unavailability_is_transient() {
        assert!(SourceError::Unavailable("connection reset by peer".into()).is_transient());
        assert!(!SourceError::Rejected("unknown company".into()).is_transient());
        assert!(!SourceError::Malformed("unexpected EOF".into()).is_transient());
    }
}
