//! Quote record model and display formatting.
//!
//! A `QuoteRecord` is the latest known state of one tracked stock: the values of
//! the most recent daily row reported by the provider, plus the local time the
//! fetch completed. Formatting helpers here are shared by the terminal table and
//! the CSV export so both render numbers the same way.
use chrono::NaiveDateTime;
use strum_macros::{Display, EnumString};

use crate::code::StockCode;

/// Format used for fetch timestamps on screen and in exports.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Latest known quote for a single stock.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRecord {
    /// Unique key of the record.
    pub code: StockCode,
    /// Display name reported by the provider, or the code when absent.
    pub name: String,
    /// Closing (latest) price.
    pub price: f64,
    /// Delta versus the prior close.
    pub change: f64,
    /// Opening price.
    pub open: f64,
    /// Session high.
    pub high: f64,
    /// Session low.
    pub low: f64,
    /// Traded volume in shares.
    pub volume: u64,
    /// Local wall-clock time of the fetch that produced this record.
    pub timestamp: NaiveDateTime,
}

/// Direction of the last price move.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl QuoteRecord {
    /// Direction derived from the sign of `change`.
    pub fn trend(&self) -> Trend {
        if self.change > 0.0 {
            Trend::Up
        } else if self.change < 0.0 {
            Trend::Down
        } else {
            Trend::Flat
        }
    }

    /// Timestamp rendered with [`TIMESTAMP_FORMAT`].
    pub fn timestamp_text(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Price with two decimals, e.g. `580.00`.
pub fn format_price(value: f64) -> String {
    format!("{:.2}", value)
}

/// Signed change with two decimals, e.g. `+5.50` or `-1.20`.
pub fn format_change(value: f64) -> String {
    format!("{:+.2}", value)
}

/// Integer with `,` thousands separators, e.g. `12,345,678`.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(change: f64) -> QuoteRecord {
        QuoteRecord {
            code: StockCode::parse("2330").unwrap(),
            name: "TSMC".into(),
            price: 580.0,
            change,
            open: 575.0,
            high: 582.0,
            low: 574.0,
            volume: 12_345_678,
            timestamp: NaiveDate::from_ymd_opt(2024, 5, 2)
                .unwrap()
                .and_hms_opt(13, 30, 5)
                .unwrap(),
        }
    }

    #[test]
    fn trend_follows_sign() {
        assert_eq!(record(5.5).trend(), Trend::Up);
        assert_eq!(record(-0.5).trend(), Trend::Down);
        assert_eq!(record(0.0).trend(), Trend::Flat);
        assert_eq!(Trend::Up.to_string(), "up");
    }

    #[test]
    fn grouping() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_000), "1,000");
        assert_eq!(group_thousands(12_345_678), "12,345,678");
    }

    #[test]
    fn number_formats() {
        assert_eq!(format_price(580.0), "580.00");
        assert_eq!(format_change(5.5), "+5.50");
        assert_eq!(format_change(-1.234), "-1.23");
        assert_eq!(record(0.0).timestamp_text(), "2024-05-02 13:30:05");
    }
}
