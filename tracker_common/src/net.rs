//! Remote quote provider constants shared by the engine and the front-end.

/// Daily-report endpoint of the quote provider.
pub const DEFAULT_BASE_URL: &str = "https://www.twse.com.tw/exchangeReport/STOCK_DAY";
/// Per-request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 10;
/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("stock-tracker/", env!("CARGO_PKG_VERSION"));
/// Date format the provider expects in the `date` query parameter.
pub const QUERY_DATE_FORMAT: &str = "%Y%m%d";

/// Helper to build the request URL for `code` on `date` (already formatted).
pub fn daily_report_url(base_url: &str, date: &str, code: &str) -> String {
    format!("{}?response=json&date={}&stockNo={}", base_url, date, code)
}
