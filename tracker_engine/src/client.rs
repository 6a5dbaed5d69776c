//! Quote provider client.
//!
//! `QuoteClient` issues one blocking HTTP GET per stock for today's daily
//! report and turns the latest row into a `QuoteRecord`. It holds no mutable
//! state, so one instance is shared by every fetch worker.
//!
//! The provider answers with `{"data": [[...], ...], "name": "..."}` where each
//! row is a list of text cells. The latest row is the last one; the cells used
//! here sit at fixed positions (see the `COL_*` constants) and may contain `,`
//! grouping separators.
use chrono::{Local, NaiveDateTime};
use log::debug;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use tracker_common::net::{QUERY_DATE_FORMAT, USER_AGENT, daily_report_url};
use tracker_common::{QuoteRecord, Result, StockCode, TrackerError};

const COL_VOLUME: usize = 1;
const COL_OPEN: usize = 3;
const COL_HIGH: usize = 4;
const COL_LOW: usize = 5;
const COL_CLOSE: usize = 6;
const COL_CHANGE: usize = 7;

/// Anything that can produce a fresh quote for a code.
///
/// The engine only talks to this trait; tests plug in closures.
pub trait QuoteSource: Send + Sync {
    /// Fetch the latest quote for `code`.
    fn fetch(&self, code: &StockCode) -> Result<QuoteRecord>;
}

impl<F> QuoteSource for F
where
    F: Fn(&StockCode) -> Result<QuoteRecord> + Send + Sync,
{
    fn fetch(&self, code: &StockCode) -> Result<QuoteRecord> {
        self(code)
    }
}

/// Raw provider payload.
#[derive(Debug, Deserialize)]
pub struct ProviderPayload {
    /// Daily rows, oldest first.
    #[serde(default)]
    pub data: Option<Vec<Vec<Value>>>,
    /// Display name of the stock.
    #[serde(default)]
    pub name: Option<String>,
}

/// Blocking HTTP client for the daily-report endpoint.
pub struct QuoteClient {
    http: Client,
    base_url: String,
}

impl QuoteClient {
    /// Build a client for `base_url` whose requests give up after `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TrackerError::Io(std::io::Error::other(e)))?;
        Ok(Self {
            http,
            base_url: base_url.to_string(),
        })
    }
}

impl QuoteSource for QuoteClient {
    fn fetch(&self, code: &StockCode) -> Result<QuoteRecord> {
        let date = Local::now().format(QUERY_DATE_FORMAT).to_string();
        let url = daily_report_url(&self.base_url, &date, code.as_str());
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| classify(code, e))?;
        let body = response.text().map_err(|e| classify(code, e))?;
        let payload: ProviderPayload =
            serde_json::from_str(&body).map_err(|_| malformed(code, "body"))?;

        parse_payload(code, &payload, Local::now().naive_local())
    }
}

/// Turn a provider payload into a record stamped with `fetched_at`.
pub fn parse_payload(
    code: &StockCode,
    payload: &ProviderPayload,
    fetched_at: NaiveDateTime,
) -> Result<QuoteRecord> {
    let latest = payload
        .data
        .as_ref()
        .and_then(|rows| rows.last())
        .ok_or_else(|| TrackerError::NotFound(code.to_string()))?;

    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(code.as_str())
        .to_string();

    let volume = cell(code, latest, COL_VOLUME, "volume")?
        .parse::<u64>()
        .map_err(|_| malformed(code, "volume"))?;

    Ok(QuoteRecord {
        code: code.clone(),
        name,
        price: number(code, latest, COL_CLOSE, "close")?,
        change: number(code, latest, COL_CHANGE, "change")?,
        open: number(code, latest, COL_OPEN, "open")?,
        high: number(code, latest, COL_HIGH, "high")?,
        low: number(code, latest, COL_LOW, "low")?,
        volume,
        timestamp: fetched_at,
    })
}

/// Cell text at `index` with grouping separators removed.
fn cell(code: &StockCode, row: &[Value], index: usize, field: &str) -> Result<String> {
    let text = match row.get(index) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(malformed(code, field)),
    };
    Ok(text.trim().replace(',', ""))
}

fn number(code: &StockCode, row: &[Value], index: usize, field: &str) -> Result<f64> {
    cell(code, row, index, field)?
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| malformed(code, field))
}

fn malformed(code: &StockCode, field: &str) -> TrackerError {
    TrackerError::MalformedResponse {
        code: code.to_string(),
        field: field.to_string(),
    }
}

fn classify(code: &StockCode, err: reqwest::Error) -> TrackerError {
    if err.is_timeout() {
        TrackerError::Timeout(code.to_string())
    } else if err.is_connect() || err.is_request() {
        TrackerError::NetworkError {
            code: code.to_string(),
            cause: err.to_string(),
        }
    } else {
        TrackerError::UnknownError {
            code: code.to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn code() -> StockCode {
        StockCode::parse("2330").unwrap()
    }

    fn fetched_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 2)
            .unwrap()
            .and_hms_opt(14, 0, 0)
            .unwrap()
    }

    fn payload(json: &str) -> ProviderPayload {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn parses_latest_row() {
        let body = r#"{
            "stat": "OK",
            "name": "TSMC",
            "data": [
                ["113/05/01", "20,000,000", "11,000,000,000", "570.00", "576.00", "568.00", "574.50", "-2.00", "10,000"],
                ["113/05/02", "12,345,678", "7,160,000,000", "575.00", "582.00", "574.00", "580.00", "+5.50", "9,876"]
            ]
        }"#;
        let record = parse_payload(&code(), &payload(body), fetched_at()).unwrap();

        assert_eq!(record.name, "TSMC");
        assert_eq!(record.volume, 12_345_678);
        assert_eq!(record.open, 575.0);
        assert_eq!(record.high, 582.0);
        assert_eq!(record.low, 574.0);
        assert_eq!(record.price, 580.0);
        assert_eq!(record.change, 5.5);
        assert_eq!(record.timestamp, fetched_at());
    }

    #[test]
    fn name_falls_back_to_code() {
        let body = r#"{"data": [["d", "1", "x", "1", "1", "1", "1", "0.00"]]}"#;
        let record = parse_payload(&code(), &payload(body), fetched_at()).unwrap();
        assert_eq!(record.name, "2330");
    }

    #[test]
    fn empty_or_missing_data_is_not_found() {
        for body in [r#"{"data": []}"#, r#"{"stat": "no data"}"#] {
            assert!(matches!(
                parse_payload(&code(), &payload(body), fetched_at()),
                Err(TrackerError::NotFound(c)) if c == "2330"
            ));
        }
    }

    #[test]
    fn bad_cells_name_the_field() {
        let short = r#"{"data": [["d", "1", "x", "1", "1"]]}"#;
        assert!(matches!(
            parse_payload(&code(), &payload(short), fetched_at()),
            Err(TrackerError::MalformedResponse { field, .. }) if field == "close"
        ));

        let bad_open = r#"{"data": [["d", "1", "x", "--", "1", "1", "1", "0"]]}"#;
        assert!(matches!(
            parse_payload(&code(), &payload(bad_open), fetched_at()),
            Err(TrackerError::MalformedResponse { field, .. }) if field == "open"
        ));

        let bad_volume = r#"{"data": [["d", "1.5", "x", "1", "1", "1", "1", "0"]]}"#;
        assert!(matches!(
            parse_payload(&code(), &payload(bad_volume), fetched_at()),
            Err(TrackerError::MalformedResponse { field, .. }) if field == "volume"
        ));
    }

    #[test]
    fn closures_are_sources() {
        let source = |c: &StockCode| -> Result<QuoteRecord> { Err(TrackerError::NotFound(c.to_string())) };
        assert!(matches!(source.fetch(&code()), Err(TrackerError::NotFound(_))));
    }

    #[test]
    fn unreachable_host_is_a_network_error() {
        // Port 9 on localhost is assumed closed.
        let client = QuoteClient::new("http://127.0.0.1:9/report", Duration::from_secs(2)).unwrap();
        match client.fetch(&code()) {
            Err(TrackerError::NetworkError { code, .. }) | Err(TrackerError::Timeout(code)) => {
                assert_eq!(code, "2330")
            }
            other => panic!("expected a transport error, got {:?}", other),
        }
    }
}
