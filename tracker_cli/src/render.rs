//! Terminal rendering of the quote table.
//!
//! The renderer thread never touches the store directly: it waits for engine
//! events, folds whatever else is already queued into the same redraw, and
//! prints a table built from a fresh snapshot.
use crossbeam_channel::Receiver;
use log::{debug, warn};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracker_common::quote::{Trend, format_change, format_price, group_thousands};
use tracker_engine::{Snapshot, SymbolStore, TrackerEvent};

/// Column titles of the on-screen table.
const TITLES: [&str; 9] = [
    "Code", "Name", "Price", "Change", "Open", "High", "Low", "Volume", "Updated",
];
const WIDTHS: [usize; 9] = [6, 14, 10, 10, 10, 10, 10, 15, 19];

/// Render `snapshot` as a fixed-width text table.
pub fn render_table(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    out.push_str(&row(TITLES.map(String::from)));
    out.push('\n');
    out.push_str(&"-".repeat(WIDTHS.iter().sum::<usize>() + WIDTHS.len() - 1));
    out.push('\n');

    if snapshot.is_empty() {
        out.push_str("(no stocks tracked; try `add 2330`)\n");
        return out;
    }

    for record in snapshot {
        let marker = match record.trend() {
            Trend::Up => '▲',
            Trend::Down => '▼',
            Trend::Flat => ' ',
        };
        out.push_str(&row([
            record.code.to_string(),
            record.name.clone(),
            format_price(record.price),
            format!("{} {}", format_change(record.change), marker),
            format_price(record.open),
            format_price(record.high),
            format_price(record.low),
            group_thousands(record.volume),
            record.timestamp_text(),
        ]));
        out.push('\n');
    }
    out
}

fn row(cells: [String; 9]) -> String {
    cells
        .iter()
        .zip(WIDTHS)
        .enumerate()
        .map(|(i, (cell, width))| {
            // Text columns left-aligned, numbers right-aligned.
            if i < 2 || i == 8 {
                format!("{:<width$}", cell, width = width)
            } else {
                format!("{:>width$}", cell, width = width)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// One line describing an event for the user, if it deserves one.
pub fn describe(event: &TrackerEvent) -> Option<String> {
    match event {
        TrackerEvent::Added(record) => Some(format!("+ {} {}", record.code, record.name)),
        TrackerEvent::Failed { error, .. } => Some(format!("! {}", error)),
        TrackerEvent::Removed(codes) => Some(format!(
            "- {}",
            codes.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(", ")
        )),
        TrackerEvent::Cleared(n) => Some(format!("- cleared {} stocks", n)),
        TrackerEvent::Updated(_) => None,
    }
}

/// Spawn the renderer thread. It exits once every event sender is gone.
pub fn spawn(store: Arc<SymbolStore>, events: Receiver<TrackerEvent>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("renderer".into())
        .spawn(move || {
            while let Ok(first) = events.recv() {
                let mut lines: Vec<String> = describe(&first).into_iter().collect();
                lines.extend(events.try_iter().filter_map(|e| describe(&e)));

                for line in lines {
                    println!("{}", line);
                }
                println!("{}", render_table(&store.snapshot()));
            }
            debug!("Renderer stopping: event channel closed");
        })
        .inspect_err(|e| warn!("Could not start renderer: {}", e))
}
