//! In-memory table of tracked stocks.
//!
//! `SymbolStore` owns the ordered mapping code → latest `QuoteRecord`. One mutex
//! guards it and every operation takes that lock exactly once, so readers never
//! see a half-applied change. Insertion order is display order.
//!
//! Fetch completions write through `upsert` (first add) or `refresh` (batch
//! refresh). `refresh` never inserts, so a refresh that finishes after the code
//! was deleted is dropped instead of bringing the row back.

use log::{debug, warn};
use std::sync::{Mutex, MutexGuard};

use tracker_common::{QuoteRecord, StockCode};

/// Thread-safe ordered table of quote records.
#[derive(Debug, Default)]
pub struct SymbolStore {
    records: Mutex<Vec<QuoteRecord>>,
}

/// Point-in-time copy of the store, in display order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    records: Vec<QuoteRecord>,
}

impl SymbolStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // Every mutation replaces or removes whole records, so data behind a
    // poisoned lock is still consistent.
    fn lock(&self) -> MutexGuard<'_, Vec<QuoteRecord>> {
        self.records.lock().unwrap_or_else(|poisoned| {
            warn!("Symbol store lock was poisoned; recovering");
            poisoned.into_inner()
        })
    }

    /// Insert `record`, or replace the existing record with the same code.
    ///
    /// Returns `true` when the code was not tracked before.
    pub fn upsert(&self, record: QuoteRecord) -> bool {
        let mut records = self.lock();
        match records.iter_mut().find(|r| r.code == record.code) {
            Some(slot) => {
                *slot = record;
                false
            }
            None => {
                debug!("Store: inserting {}", record.code);
                records.push(record);
                true
            }
        }
    }

    /// Replace the record for an already tracked code. Untracked codes are ignored.
    pub fn refresh(&self, record: QuoteRecord) -> bool {
        let mut records = self.lock();
        match records.iter_mut().find(|r| r.code == record.code) {
            Some(slot) => {
                *slot = record;
                true
            }
            None => false,
        }
    }

    /// Remove the given codes and return how many were actually present.
    pub fn remove(&self, codes: &[StockCode]) -> usize {
        let mut records = self.lock();
        let before = records.len();
        records.retain(|r| !codes.contains(&r.code));
        before - records.len()
    }

    /// Remove everything and return how many records were dropped.
    pub fn clear(&self) -> usize {
        let mut records = self.lock();
        let removed = records.len();
        records.clear();
        removed
    }

    /// Consistent copy of the whole table.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            records: self.lock().clone(),
        }
    }

    /// Whether `code` is tracked.
    pub fn contains(&self, code: &StockCode) -> bool {
        self.lock().iter().any(|r| &r.code == code)
    }

    /// Tracked codes in display order.
    pub fn codes(&self) -> Vec<StockCode> {
        self.lock().iter().map(|r| r.code.clone()).collect()
    }

    /// Number of tracked codes.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Snapshot {
    /// Records in display order.
    pub fn iter(&self) -> impl Iterator<Item = &QuoteRecord> {
        self.records.iter()
    }

    /// Record for `code`, if tracked at snapshot time.
    pub fn get(&self, code: &StockCode) -> Option<&QuoteRecord> {
        self.records.iter().find(|r| &r.code == code)
    }

    /// Codes in display order.
    pub fn codes(&self) -> Vec<StockCode> {
        self.records.iter().map(|r| r.code.clone()).collect()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the snapshot holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a QuoteRecord;
    type IntoIter = std::slice::Iter<'a, QuoteRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Local;
    use std::sync::Arc;
    use std::thread;

    pub(crate) fn record(code: &str, price: f64) -> QuoteRecord {
        QuoteRecord {
            code: StockCode::parse(code).unwrap(),
            name: format!("Stock {}", code),
            price,
            change: 0.0,
            open: price,
            high: price,
            low: price,
            volume: 1_000,
            timestamp: Local::now().naive_local(),
        }
    }

    fn code(raw: &str) -> StockCode {
        StockCode::parse(raw).unwrap()
    }

    #[test]
    fn upsert_replaces_in_place() {
        let store = SymbolStore::new();
        assert!(store.upsert(record("2330", 580.0)));
        assert!(store.upsert(record("0050", 150.0)));
        assert!(!store.upsert(record("2330", 590.0)));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.codes(), vec![code("2330"), code("0050")]);
        assert_eq!(snapshot.get(&code("2330")).unwrap().price, 590.0);
    }

    #[test]
    fn refresh_never_inserts() {
        let store = SymbolStore::new();
        assert!(!store.refresh(record("2330", 580.0)));
        assert!(store.is_empty());

        store.upsert(record("2330", 580.0));
        assert!(store.refresh(record("2330", 600.0)));
        assert_eq!(store.snapshot().get(&code("2330")).unwrap().price, 600.0);
    }

    #[test]
    fn remove_is_idempotent() {
        let store = SymbolStore::new();
        store.upsert(record("2330", 580.0));
        store.upsert(record("0050", 150.0));

        assert_eq!(store.remove(&[code("2330")]), 1);
        assert_eq!(store.remove(&[code("2330")]), 0);
        assert_eq!(store.remove(&[code("9999")]), 0);
        assert_eq!(store.codes(), vec![code("0050")]);
    }

    #[test]
    fn clear_then_snapshot_is_empty() {
        let store = SymbolStore::new();
        store.upsert(record("2330", 580.0));
        store.upsert(record("0050", 150.0));
        assert_eq!(store.clear(), 2);
        assert!(store.snapshot().is_empty());
        assert_eq!(store.clear(), 0);
    }

    #[test]
    fn snapshot_is_detached_from_later_writes() {
        let store = SymbolStore::new();
        store.upsert(record("2330", 580.0));
        let before = store.snapshot();
        store.upsert(record("2330", 600.0));
        store.upsert(record("0050", 150.0));

        assert_eq!(before.len(), 1);
        assert_eq!(before.get(&code("2330")).unwrap().price, 580.0);
    }

    #[test]
    fn concurrent_writers_keep_one_record_per_code() {
        let store = Arc::new(SymbolStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for n in 0..100 {
                        let raw = format!("{:04}", n % 10);
                        store.upsert(record(&raw, (i * 100 + n) as f64));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 10);
        let mut codes = snapshot.codes();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), 10);
    }
}
