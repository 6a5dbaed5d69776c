//! Stock tracking engine.
//!
//! Keeps an in-memory table of the latest quote for each tracked stock and
//! keeps it fresh:
//! - `client` — blocking HTTP client for the quote provider (`QuoteSource` seam).
//! - `store` — `SymbolStore`, the single shared table, and its `Snapshot`s.
//! - `pool` — bounded worker pool running the fetches.
//! - `engine` — `RefreshEngine`: add, refresh-all, remove, clear, restore.
//! - `scheduler` — auto-refresh state machine on its own thread.
//! - `persistence` — durable list of tracked codes.
//! - `export` — CSV rendering of a snapshot.
//! - `events` — notifications for the rendering surface.
//! - `config` — engine and scheduler settings.
#![warn(missing_docs)]
pub mod client;
pub mod config;
pub mod engine;
pub mod events;
pub mod export;
pub mod persistence;
pub mod pool;
pub mod scheduler;
pub mod store;

pub use client::{QuoteClient, QuoteSource};
pub use config::{EngineConfig, SchedulerConfig};
pub use engine::{BatchReport, RefreshBatch, RefreshEngine};
pub use events::{EventSink, TrackerEvent};
pub use persistence::PersistenceGateway;
pub use scheduler::{RefreshCycle, Scheduler, SchedulerState};
pub use store::{Snapshot, SymbolStore};
