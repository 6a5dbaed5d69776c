//! Stock codes and helpers for reading them from text.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::BufRead;
use std::str::FromStr;

use crate::error::TrackerError;

/// Number of digits in a valid stock code.
pub const CODE_LEN: usize = 4;

/// A validated four-digit stock code, e.g. `2330`.
///
/// Serialized as a plain JSON string; deserializing an invalid string fails.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StockCode(String);

impl StockCode {
    /// Validates `raw` (surrounding whitespace is ignored).
    pub fn parse(raw: &str) -> Result<Self, TrackerError> {
        let trimmed = raw.trim();
        if trimmed.len() == CODE_LEN && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            Ok(StockCode(trimmed.to_string()))
        } else {
            Err(TrackerError::InvalidCode(trimmed.to_string()))
        }
    }

    /// The code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StockCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for StockCode {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StockCode::parse(s)
    }
}

impl TryFrom<String> for StockCode {
    type Error = TrackerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        StockCode::parse(&value)
    }
}

impl From<StockCode> for String {
    fn from(code: StockCode) -> Self {
        code.0
    }
}

impl AsRef<str> for StockCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Trait providing list parsing for stock codes.
pub trait CodeParser {
    /// Parses codes from a buffered reader.
    ///
    /// Codes may be separated by commas, whitespace or new lines. Returns an
    /// error on the first token that is not a valid code.
    fn parse_from_reader<R: BufRead>(reader: R) -> Result<Vec<StockCode>, TrackerError>;
}

impl CodeParser for StockCode {
    fn parse_from_reader<R: BufRead>(reader: R) -> Result<Vec<Self>, TrackerError> {
        let mut codes = Vec::new();

        for line_result in reader.lines() {
            let line = line_result?;
            for token in line
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|t| !t.is_empty())
            {
                codes.push(token.parse::<Self>()?);
            }
        }
        Ok(codes)
    }
}
