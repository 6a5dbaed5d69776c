//! Result type alias shared across the workspace.
//!
//! Defaults the error type to `TrackerError`, so functions can simply return
//! `Result<T>`.
use crate::error::TrackerError;

/// Workspace-wide `Result` alias with `TrackerError` as the default error.
pub type Result<T, E = TrackerError> = std::result::Result<T, E>;
