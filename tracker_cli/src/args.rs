//! Command-line arguments for the stock tracker.
//!
//! This module defines the CLI interface using `clap` and turns it into engine
//! and scheduler settings. See `main` for end-to-end usage.
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use tracker_common::net::{DEFAULT_BASE_URL, REQUEST_TIMEOUT_SECS};
use tracker_engine::config::{DEFAULT_WORKERS, EngineConfig, SchedulerConfig};
use tracker_engine::persistence;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// File holding the saved stock list (default: ~/.stock_tracker_config.json).
    #[clap(long)]
    pub store_path: Option<String>,

    /// Neither load nor save the stock list.
    #[clap(long)]
    pub no_persist: bool,

    /// Auto-refresh interval in seconds, clamped to 5-300.
    #[clap(long, default_value_t = 30)]
    pub interval: u64,

    /// Start with auto-refresh turned on.
    #[clap(long)]
    pub auto: bool,

    /// Maximum number of quotes fetched at the same time.
    #[clap(long, default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Per-request timeout in seconds (at least 1).
    #[clap(long, default_value_t = REQUEST_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Quote provider endpoint.
    #[clap(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Text file with extra codes to add on startup.
    /// Codes may be separated by commas, spaces, or new lines.
    #[clap(long)]
    pub seed: Option<String>,
}

impl Args {
    /// Engine settings derived from the arguments.
    pub fn engine_config(&self) -> EngineConfig {
        let store_path = if self.no_persist {
            None
        } else {
            self.store_path
                .as_deref()
                .map(normalize_path)
                .or_else(persistence::default_path)
        };
        EngineConfig {
            workers: self.workers,
            base_url: self.base_url.clone(),
            request_timeout: Duration::from_secs(self.timeout),
            store_path,
        }
    }

    /// Scheduler settings derived from the arguments.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            initial_interval: Duration::from_secs(self.interval),
            ..SchedulerConfig::default()
        }
    }

    /// Seed file path, if one was given.
    pub fn seed_path(&self) -> Option<PathBuf> {
        self.seed.as_deref().map(normalize_path)
    }
}

/// Normalize a CLI-provided path string by trimming whitespace and matching quotes.
///
/// This allows passing Windows paths in quotes without breaking parsing.
pub fn normalize_path(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    let no_quotes = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    PathBuf::from(no_quotes)
}
