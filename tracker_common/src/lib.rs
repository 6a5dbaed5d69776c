//!
//! Common types and utilities shared by the tracking engine and its front-end.
//!
//! This crate aggregates:
//! - `error` — unified error type `TrackerError` used across the workspace.
//! - `result` — handy `Result<T, TrackerError>` alias.
//! - `code` — validated stock codes and list parsing.
//! - `quote` — the `QuoteRecord` model and number formatting.
//! - `command` — user commands typed at the prompt.
//! - `net` — quote provider constants.
#![warn(missing_docs)]
pub mod error;
pub mod result;
pub mod code;
pub mod quote;
pub mod command;
pub mod net;

pub use error::TrackerError;
pub use result::Result;
pub use code::StockCode;
pub use quote::QuoteRecord;
pub use command::Command;
