//! Error types for feed replay.
//!
//! The replay core itself never fails: malformed messages are absorbed and
//! counted, per the feed-replay operating assumption that upstream data is
//! mostly but not perfectly clean. Errors surface only at the edges (opening
//! a feed file, decoding a row stream, CLI misuse).

use thiserror::Error;

/// Result type alias for replay operations.
pub type Result<T> = std::result::Result<T, ReplayError>;

/// Main error type for replay operations.
#[derive(Error, Debug)]
pub enum ReplayError {
    /// Underlying I/O failure while opening or reading a feed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The CSV layer failed to decode a record.
    #[error("feed decode error: {0}")]
    Feed(#[from] csv::Error),

    /// A timestamp string did not match the feed's `YYYY-MM-DD HH:mm:ss` +
    /// nanosecond-fraction format.
    #[error("unparseable timestamp {text:?}")]
    Timestamp {
        text: String,
        #[source]
        source: chrono::format::ParseError,
    },

    /// Invalid command-line usage.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl ReplayError {
    /// Create an `InvalidArgument` error from any string-like type.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        ReplayError::InvalidArgument(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReplayError::invalid_argument("--input requires a path");
        assert_eq!(err.to_string(), "invalid argument: --input requires a path");
    }

    #[test]
    fn test_timestamp_error_carries_text() {
        let err = crate::time::parse_timestamp("not a timestamp").unwrap_err();
        assert!(err.to_string().contains("not a timestamp"));
    }
}
