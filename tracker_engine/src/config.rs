//! Engine and scheduler settings with their defaults.
//!
//! The front-end fills these from command-line arguments; tests build them
//! directly, usually with millisecond-scale scheduler bounds.
use std::path::PathBuf;
use std::time::Duration;

use tracker_common::net::{DEFAULT_BASE_URL, REQUEST_TIMEOUT_SECS};

/// Default number of fetch worker threads.
pub const DEFAULT_WORKERS: usize = 8;
/// Shortest allowed auto-refresh interval.
pub const MIN_INTERVAL: Duration = Duration::from_secs(5);
/// Longest allowed auto-refresh interval.
pub const MAX_INTERVAL: Duration = Duration::from_secs(300);
/// Interval used until the user picks one.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// Settings for [`RefreshEngine`](crate::engine::RefreshEngine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on concurrent in-flight fetches.
    pub workers: usize,
    /// Provider endpoint.
    pub base_url: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Where the tracked code list is persisted; `None` disables persistence.
    pub store_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            store_path: crate::persistence::default_path(),
        }
    }
}

/// Settings for [`Scheduler`](crate::scheduler::Scheduler).
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Lower clamp bound for intervals.
    pub min_interval: Duration,
    /// Upper clamp bound for intervals.
    pub max_interval: Duration,
    /// Interval stored before the first `enable`/`set_interval`.
    pub initial_interval: Duration,
}

impl SchedulerConfig {
    /// Clamps `interval` into `[min_interval, max_interval]`.
    pub fn clamp(&self, interval: Duration) -> Duration {
        interval.clamp(self.min_interval, self.max_interval)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            min_interval: MIN_INTERVAL,
            max_interval: MAX_INTERVAL,
            initial_interval: DEFAULT_INTERVAL,
        }
    }
}
