//! Error types shared between the engine and the terminal front-end.
//!
//! `TrackerError` covers user input validation, per-symbol fetch failures,
//! persistence and export I/O, and the channel/lock plumbing underneath. Fetch
//! failures are always tied to the code they happened for so they can be
//! reported one symbol at a time.
use std::io;
use std::sync::PoisonError;

use thiserror::Error;

/// Unified error type for the tracker workspace.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Input is not exactly four ASCII digits.
    #[error("Invalid stock code {0:?}: expected exactly 4 digits")]
    InvalidCode(String),

    /// The code is already tracked (or its first fetch is still in flight).
    #[error("Stock {0} is already tracked")]
    DuplicateCode(String),

    /// The provider returned no rows for the code on the requested date.
    #[error("No data found for stock {0}")]
    NotFound(String),

    /// The provider payload did not match the expected schema.
    #[error("Malformed response for stock {code}: bad field `{field}`")]
    MalformedResponse {
        /// Stock code the response belonged to.
        code: String,
        /// Name of the field that failed to parse.
        field: String,
    },

    /// The request did not complete within the configured timeout.
    #[error("Request timed out for stock {0}")]
    Timeout(String),

    /// Connection-level failure (DNS, refused, reset...).
    #[error("Network error for stock {code}: {cause}")]
    NetworkError {
        /// Stock code being fetched.
        code: String,
        /// Transport error description.
        cause: String,
    },

    /// Any other fetch failure.
    #[error("Unexpected error for stock {code}: {message}")]
    UnknownError {
        /// Stock code being fetched.
        code: String,
        /// Human-readable description.
        message: String,
    },

    /// The persisted symbol list could not be read or decoded.
    #[error("Failed to load tracked symbols: {0}")]
    PersistenceLoadError(String),

    /// The persisted symbol list could not be written.
    #[error("Failed to save tracked symbols: {0}")]
    PersistenceSaveError(String),

    /// Writing the CSV export failed.
    #[error("Export failed: {0}")]
    ExportIoError(String),

    /// Export was requested while nothing is tracked.
    #[error("Nothing to export: no stocks are tracked")]
    EmptyExport,

    /// A line typed at the prompt could not be understood.
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// The engine (worker pool or scheduler) has already been shut down.
    #[error("Engine stopped: {0}")]
    EngineStopped(String),

    /// I/O error originating from the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Failure while encoding/decoding JSON via serde_json.
    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// Channel send failed (receiver dropped); contains a short context string.
    #[error("Channel send failed: {0}")]
    ChannelSend(String),

    /// Error indicating a poisoned mutex/lock was encountered.
    #[error("Mutex Lock Poisoned: {0}")]
    MutexLock(String),
}

impl TrackerError {
    /// Returns `true` for errors produced while fetching a single quote.
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            TrackerError::NotFound(_)
                | TrackerError::MalformedResponse { .. }
                | TrackerError::Timeout(_)
                | TrackerError::NetworkError { .. }
                | TrackerError::UnknownError { .. }
        )
    }
}

impl<T> From<PoisonError<T>> for TrackerError {
    fn from(err: PoisonError<T>) -> Self {
        TrackerError::MutexLock(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_errors_are_classified() {
        assert!(TrackerError::Timeout("2330".into()).is_fetch_error());
        assert!(
            TrackerError::MalformedResponse {
                code: "2330".into(),
                field: "open".into()
            }
            .is_fetch_error()
        );
        assert!(!TrackerError::DuplicateCode("2330".into()).is_fetch_error());
        assert!(!TrackerError::EmptyExport.is_fetch_error());
    }

    #[test]
    fn messages_name_the_code() {
        let err = TrackerError::NetworkError {
            code: "0050".into(),
            cause: "connection refused".into(),
        };
        assert_eq!(
            err.to_string(),
            "Network error for stock 0050: connection refused"
        );
    }
}
