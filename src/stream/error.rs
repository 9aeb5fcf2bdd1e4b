//! Transport error types for the answer stream

use thiserror::Error;

/// Transport failure with classification
#[derive(Debug, Error)]
#[error("{message}")]
pub struct StreamError {
    pub kind: StreamErrorKind,
    pub message: String,
}

impl StreamError {
    #[must_use]
    pub fn new(kind: StreamErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(StreamErrorKind::Connect, message)
    }

    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(StreamErrorKind::Timeout, message)
    }

    #[must_use]
    pub fn status(message: impl Into<String>) -> Self {
        Self::new(StreamErrorKind::Status, message)
    }

    #[must_use]
    pub fn content_type(message: impl Into<String>) -> Self {
        Self::new(StreamErrorKind::ContentType, message)
    }

    #[must_use]
    pub fn body(message: impl Into<String>) -> Self {
        Self::new(StreamErrorKind::Body, message)
    }

    #[must_use]
    pub fn closed_early() -> Self {
        Self::new(
            StreamErrorKind::ClosedEarly,
            "Stream closed before the answer completed",
        )
    }

    /// Classify a reqwest failure raised while opening or reading the stream
    #[must_use]
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(format!("Request timeout: {err}"))
        } else if err.is_connect() {
            Self::connect(format!("Connection failed: {err}"))
        } else if err.is_body() || err.is_decode() {
            Self::body(format!("Failed to read stream: {err}"))
        } else {
            Self::connect(format!("Request failed: {err}"))
        }
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamErrorKind {
    /// Connection refused, DNS failure, TLS failure
    Connect,
    /// Connect timeout elapsed
    Timeout,
    /// Non-success HTTP status on open
    Status,
    /// Response is not an event stream
    ContentType,
    /// Network drop while reading the body
    Body,
    /// Body ended without a terminal event
    ClosedEarly,
}

impl StreamErrorKind {
    /// Whether any part of the answer may already have been delivered
    #[must_use]
    pub fn is_mid_stream(&self) -> bool {
        matches!(self, Self::Body | Self::ClosedEarly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_message() {
        let err = StreamError::status("HTTP 502: bad gateway");
        assert_eq!(err.to_string(), "HTTP 502: bad gateway");
        assert_eq!(err.kind, StreamErrorKind::Status);
    }

    #[test]
    fn test_mid_stream_kinds() {
        assert!(StreamError::closed_early().kind.is_mid_stream());
        assert!(StreamError::body("reset").kind.is_mid_stream());
        assert!(!StreamError::connect("refused").kind.is_mid_stream());
        assert!(!StreamError::content_type("text/html").kind.is_mid_stream());
    }
}
