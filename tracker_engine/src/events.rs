//! Notifications emitted by the engine for the rendering surface.
//!
//! Events are sent over a crossbeam channel. The receiver typically redraws
//! from a fresh store snapshot on each one and reports failures to the user.
use crossbeam_channel::Sender;
use log::debug;

use tracker_common::{QuoteRecord, StockCode, TrackerError};

/// Something changed in the tracked table, or a fetch failed.
#[derive(Debug)]
pub enum TrackerEvent {
    /// A code was tracked for the first time.
    Added(QuoteRecord),
    /// A tracked code got a fresh record.
    Updated(QuoteRecord),
    /// Fetching `code` failed; its row (if any) is unchanged.
    Failed {
        /// Code that failed.
        code: StockCode,
        /// Why it failed.
        error: TrackerError,
    },
    /// Codes were removed from the table.
    Removed(Vec<StockCode>),
    /// The table was cleared; carries the number of rows dropped.
    Cleared(usize),
}

/// Send side of the event channel. A missing or closed receiver is not an error.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    sender: Option<Sender<TrackerEvent>>,
}

impl EventSink {
    /// Sink forwarding to `sender`.
    pub fn new(sender: Sender<TrackerEvent>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    /// Deliver `event` if anyone is listening.
    pub fn emit(&self, event: TrackerEvent) {
        if let Some(sender) = &self.sender {
            if let Err(e) = sender.send(event) {
                debug!("Event dropped, receiver gone: {:?}", e.into_inner());
            }
        }
    }
}
