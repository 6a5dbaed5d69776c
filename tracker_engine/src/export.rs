//! CSV export of a store snapshot.
//!
//! Output is UTF-8 with a byte-order mark so spreadsheet tools pick the right
//! encoding. Rows follow snapshot order. Text fields containing a separator,
//! quote or line break are quoted. The grouped volume is written bare
//! (`12,345,678`).
use std::borrow::Cow;
use std::fs;
use std::path::Path;

use log::info;
use tracker_common::quote::{format_change, format_price, group_thousands};
use tracker_common::{QuoteRecord, Result, TrackerError};

use crate::store::Snapshot;

/// Column names of the header row.
pub const HEADER: [&str; 9] = [
    "code",
    "name",
    "price",
    "change",
    "open",
    "high",
    "low",
    "volume",
    "timestamp",
];

const BOM: char = '\u{feff}';

/// Render `snapshot` as CSV text, BOM included.
pub fn render_csv(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    out.push(BOM);
    out.push_str(&HEADER.join(","));
    out.push('\n');
    for record in snapshot {
        out.push_str(&render_row(record));
        out.push('\n');
    }
    out
}

fn render_row(record: &QuoteRecord) -> String {
    let fields = [
        escape(record.code.as_str()).into_owned(),
        escape(&record.name).into_owned(),
        format_price(record.price),
        format_change(record.change),
        format_price(record.open),
        format_price(record.high),
        format_price(record.low),
        // Grouped digits go out unquoted.
        group_thousands(record.volume),
        escape(&record.timestamp_text()).into_owned(),
    ];
    fields.join(",")
}

fn escape(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Write `snapshot` to `path` and return the number of data rows.
///
/// An empty snapshot is rejected with [`TrackerError::EmptyExport`].
pub fn write_csv(path: &Path, snapshot: &Snapshot) -> Result<usize> {
    if snapshot.is_empty() {
        return Err(TrackerError::EmptyExport);
    }
    fs::write(path, render_csv(snapshot))
        .map_err(|e| TrackerError::ExportIoError(format!("{}: {}", path.display(), e)))?;
    info!("Exported {} rows to {}", snapshot.len(), path.display());
    Ok(snapshot.len())
}
