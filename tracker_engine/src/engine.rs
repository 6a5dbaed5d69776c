//! Fetch-and-update pipeline.
//!
//! `RefreshEngine` ties the quote source, the store, persistence and the event
//! sink together:
//!
//! - `fetch_one` adds a new code. It rejects invalid and already tracked codes
//!   before any network call, then queues the fetch; the code only enters the
//!   store once that fetch succeeds.
//! - `fetch_all` refreshes every tracked code, one pool job per code. Failures
//!   are reported per code and never affect the other jobs; a failed refresh
//!   keeps the last good record.
//! - `remove` / `clear` edit the table and persist the new code list.
//!
//! All fetches run on the bounded [`WorkerPool`]. Completions for the same code
//! race freely: whichever finishes last wins.
use crossbeam_channel::{Receiver, unbounded};
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use tracker_common::{Result, StockCode, TrackerError};

use crate::client::{QuoteClient, QuoteSource};
use crate::config::EngineConfig;
use crate::events::{EventSink, TrackerEvent};
use crate::export;
use crate::persistence::PersistenceGateway;
use crate::pool::WorkerPool;
use crate::scheduler::RefreshCycle;
use crate::store::{Snapshot, SymbolStore};

/// Result of one refresh job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The record was replaced with fresh data.
    Updated,
    /// The fetch failed; the old record is kept.
    Failed,
    /// The fetch succeeded but the code was removed meanwhile.
    Skipped,
}

/// Tally of a finished refresh batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Records replaced.
    pub updated: usize,
    /// Fetches that failed.
    pub failed: usize,
    /// Fresh data dropped because the code was no longer tracked.
    pub skipped: usize,
}

/// Handle on the jobs queued by one [`RefreshEngine::fetch_all`] call.
#[derive(Debug)]
pub struct RefreshBatch {
    queued: usize,
    outcomes: Receiver<RefreshOutcome>,
}

impl RefreshBatch {
    /// Number of jobs queued for this batch.
    pub fn len(&self) -> usize {
        self.queued
    }

    /// Whether nothing was queued.
    pub fn is_empty(&self) -> bool {
        self.queued == 0
    }

    /// Block until every job of the batch has finished.
    pub fn wait(self) -> BatchReport {
        let mut report = BatchReport::default();
        for _ in 0..self.queued {
            // A job that panicked drops its sender without reporting.
            match self.outcomes.recv() {
                Ok(RefreshOutcome::Updated) => report.updated += 1,
                Ok(RefreshOutcome::Failed) => report.failed += 1,
                Ok(RefreshOutcome::Skipped) => report.skipped += 1,
                Err(_) => break,
            }
        }
        report
    }
}

/// State shared with pool jobs.
struct Shared {
    store: Arc<SymbolStore>,
    source: Arc<dyn QuoteSource>,
    persistence: Option<PersistenceGateway>,
    events: EventSink,
    /// Codes whose first fetch is in flight.
    pending: Mutex<HashSet<StockCode>>,
    /// Serializes snapshot-and-save so the newest list is written last.
    persist_lock: Mutex<()>,
}

impl Shared {
    fn pending(&self) -> MutexGuard<'_, HashSet<StockCode>> {
        self.pending.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn persist(&self) {
        if let Some(gateway) = &self.persistence {
            let _guard = self.persist_lock.lock().unwrap_or_else(|p| p.into_inner());
            gateway.save(&self.store.codes());
        }
    }

    /// First fetch of a new code.
    fn track(&self, code: StockCode) {
        let result = self.source.fetch(&code);
        match result {
            Ok(record) => {
                let inserted = self.store.upsert(record.clone());
                self.pending().remove(&code);
                if inserted {
                    info!("Now tracking {} ({})", code, record.name);
                    self.persist();
                    self.events.emit(TrackerEvent::Added(record));
                } else {
                    self.events.emit(TrackerEvent::Updated(record));
                }
            }
            Err(error) => {
                self.pending().remove(&code);
                warn!("Could not add {}: {}", code, error);
                self.events.emit(TrackerEvent::Failed { code, error });
            }
        }
    }

    /// Refresh of an already tracked code.
    fn refresh(&self, code: StockCode) -> RefreshOutcome {
        match self.source.fetch(&code) {
            Ok(record) => {
                if self.store.refresh(record.clone()) {
                    debug!("Refreshed {}: {:.2}", code, record.price);
                    self.events.emit(TrackerEvent::Updated(record));
                    RefreshOutcome::Updated
                } else {
                    debug!("Dropping refresh for {}: no longer tracked", code);
                    RefreshOutcome::Skipped
                }
            }
            Err(error) => {
                if error.is_fetch_error() {
                    warn!("Refresh failed for {}: {}", code, error);
                } else {
                    error!("Refresh of {} aborted: {}", code, error);
                }
                self.events.emit(TrackerEvent::Failed { code, error });
                RefreshOutcome::Failed
            }
        }
    }
}

/// Concurrent fetch-and-update engine over a [`SymbolStore`].
pub struct RefreshEngine {
    shared: Arc<Shared>,
    pool: WorkerPool,
}

impl RefreshEngine {
    /// Engine over an explicit quote source.
    ///
    /// `persistence` of `None` keeps the code list in memory only.
    pub fn new(
        source: Arc<dyn QuoteSource>,
        persistence: Option<PersistenceGateway>,
        events: EventSink,
        workers: usize,
    ) -> Result<Self> {
        let pool = WorkerPool::new(workers)?;
        info!("Refresh engine started with {} fetch workers", pool.size());
        Ok(Self {
            shared: Arc::new(Shared {
                store: Arc::new(SymbolStore::new()),
                source,
                persistence,
                events,
                pending: Mutex::new(HashSet::new()),
                persist_lock: Mutex::new(()),
            }),
            pool,
        })
    }

    /// Engine talking to the HTTP provider described by `config`.
    pub fn from_config(config: &EngineConfig, events: EventSink) -> Result<Self> {
        let client = QuoteClient::new(&config.base_url, config.request_timeout)?;
        let persistence = config.store_path.clone().map(PersistenceGateway::new);
        Self::new(Arc::new(client), persistence, events, config.workers)
    }

    /// The underlying store, for read-only use by renderers.
    pub fn store(&self) -> &Arc<SymbolStore> {
        &self.shared.store
    }

    /// Start tracking `raw_code`.
    ///
    /// Returns once the fetch is queued; the outcome arrives as an
    /// [`TrackerEvent::Added`] or [`TrackerEvent::Failed`] event.
    pub fn fetch_one(&self, raw_code: &str) -> Result<StockCode> {
        let code = StockCode::parse(raw_code)?;
        {
            let mut pending = self.shared.pending();
            if pending.contains(&code) || self.shared.store.contains(&code) {
                return Err(TrackerError::DuplicateCode(code.to_string()));
            }
            pending.insert(code.clone());
        }

        let shared = Arc::clone(&self.shared);
        let job_code = code.clone();
        if let Err(e) = self.pool.execute(move || shared.track(job_code)) {
            self.shared.pending().remove(&code);
            return Err(e);
        }
        debug!("Queued first fetch for {}", code);
        Ok(code)
    }

    /// Refresh every code tracked right now.
    pub fn fetch_all(&self) -> RefreshBatch {
        let codes = self.shared.store.codes();
        let (tx, rx) = unbounded();
        let mut queued = 0;

        for code in codes {
            let shared = Arc::clone(&self.shared);
            let tx = tx.clone();
            let job = move || {
                let outcome = shared.refresh(code);
                let _ = tx.send(outcome);
            };
            match self.pool.execute(job) {
                Ok(()) => queued += 1,
                Err(e) => warn!("Could not queue refresh: {}", e),
            }
        }
        debug!("Queued refresh of {} stocks", queued);

        RefreshBatch {
            queued,
            outcomes: rx,
        }
    }

    /// Stop tracking `codes`; returns how many were tracked.
    pub fn remove(&self, codes: &[StockCode]) -> usize {
        let removed = self.shared.store.remove(codes);
        if removed > 0 {
            info!("Removed {} stocks", removed);
            self.shared.persist();
            self.shared.events.emit(TrackerEvent::Removed(codes.to_vec()));
        }
        removed
    }

    /// Stop tracking everything; returns how many rows were dropped.
    ///
    /// A first fetch still in flight may add its code back after this returns.
    pub fn clear(&self) -> usize {
        let removed = self.shared.store.clear();
        info!("Cleared {} stocks", removed);
        self.shared.persist();
        self.shared.events.emit(TrackerEvent::Cleared(removed));
        removed
    }

    /// Consistent copy of the table.
    pub fn snapshot(&self) -> Snapshot {
        self.shared.store.snapshot()
    }

    /// Write the current table as CSV to `path`.
    pub fn export_csv(&self, path: &Path) -> Result<usize> {
        export::write_csv(path, &self.snapshot())
    }

    /// Queue first fetches for every persisted code; returns how many were queued.
    pub fn restore(&self) -> usize {
        let Some(gateway) = &self.shared.persistence else {
            return 0;
        };
        let mut queued = 0;
        for code in gateway.load() {
            match self.fetch_one(code.as_str()) {
                Ok(_) => queued += 1,
                Err(e) => debug!("Skipping saved code {}: {}", code, e),
            }
        }
        info!(
            "Restoring {} saved stocks from {}",
            queued,
            gateway.path().display()
        );
        queued
    }

    /// Finish queued fetches and stop the workers.
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }
}

impl RefreshCycle for RefreshEngine {
    fn run_cycle(&self) {
        let report = self.fetch_all().wait();
        info!(
            "Refresh cycle done: {} updated, {} failed, {} skipped",
            report.updated, report.failed, report.skipped
        );
    }
}
