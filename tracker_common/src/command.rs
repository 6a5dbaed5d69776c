//! User commands typed at the tracker prompt.
//!
//! Each line is a verb followed by arguments, e.g. `add 2330` or `interval 60`.
//! Verbs are case-insensitive and have short aliases. Parsing only checks the
//! shape of the line; stock codes given to `add` are validated by the engine so
//! the rejection is reported the same way as for any other add request.
use std::path::PathBuf;
use std::str::FromStr;

use strum_macros::{Display, EnumString};

use crate::code::StockCode;
use crate::error::TrackerError;

/// Command verbs understood by the prompt.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum Verb {
    #[strum(serialize = "add", serialize = "a")]
    Add,
    #[strum(serialize = "refresh", serialize = "r")]
    Refresh,
    #[strum(serialize = "delete", serialize = "del", serialize = "rm")]
    Delete,
    Clear,
    Export,
    Auto,
    Interval,
    #[strum(serialize = "list", serialize = "ls")]
    List,
    Status,
    #[strum(serialize = "help", serialize = "?")]
    Help,
    #[strum(serialize = "quit", serialize = "exit", serialize = "q")]
    Quit,
}

/// A parsed user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start tracking a code (raw text, validated by the engine).
    Add(String),
    /// Refresh every tracked stock now.
    Refresh,
    /// Stop tracking the given codes.
    Delete(Vec<StockCode>),
    /// Stop tracking everything.
    Clear,
    /// Write the current table to a CSV file.
    Export(PathBuf),
    /// Turn auto-refresh on or off.
    Auto(bool),
    /// Change the auto-refresh interval, in seconds.
    Interval(u64),
    /// Redraw the table.
    List,
    /// Show scheduler state.
    Status,
    /// Print the command reference.
    Help,
    /// Leave the program.
    Quit,
}

/// One-screen command reference printed by `help`.
pub const HELP: &str = "\
commands:
  add <code>            start tracking a 4-digit stock code
  refresh               refresh every tracked stock now
  delete <code>...      stop tracking the given codes
  clear                 stop tracking everything
  export <path>         write the table to a CSV file
  auto on|off           toggle auto-refresh
  interval <seconds>    set the auto-refresh interval (5-300)
  list                  redraw the table
  status                show auto-refresh state
  help                  show this text
  quit                  exit";

impl FromStr for Command {
    type Err = TrackerError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let verb_text = parts
            .next()
            .ok_or_else(|| TrackerError::InvalidCommand("empty line".into()))?;
        let verb = Verb::from_str(verb_text)
            .map_err(|_| TrackerError::InvalidCommand(format!("unknown command `{}`", verb_text)))?;
        let args: Vec<&str> = parts.collect();

        let command = match verb {
            Verb::Add => match args.as_slice() {
                [code] => Command::Add((*code).to_string()),
                _ => return Err(usage("add <code>")),
            },
            Verb::Delete => {
                if args.is_empty() {
                    return Err(usage("delete <code>..."));
                }
                let codes = args
                    .iter()
                    .map(|raw| StockCode::parse(raw))
                    .collect::<Result<Vec<_>, _>>()?;
                Command::Delete(codes)
            }
            Verb::Export => {
                if args.is_empty() {
                    return Err(usage("export <path>"));
                }
                Command::Export(PathBuf::from(args.join(" ")))
            }
            Verb::Auto => match args.as_slice() {
                [flag] => match flag.to_ascii_lowercase().as_str() {
                    "on" | "true" | "1" => Command::Auto(true),
                    "off" | "false" | "0" => Command::Auto(false),
                    _ => return Err(usage("auto on|off")),
                },
                _ => return Err(usage("auto on|off")),
            },
            Verb::Interval => match args.as_slice() {
                [secs] => Command::Interval(secs.parse().map_err(|_| usage("interval <seconds>"))?),
                _ => return Err(usage("interval <seconds>")),
            },
            Verb::Refresh => Command::Refresh,
            Verb::Clear => Command::Clear,
            Verb::List => Command::List,
            Verb::Status => Command::Status,
            Verb::Help => Command::Help,
            Verb::Quit => Command::Quit,
        };
        Ok(command)
    }
}

fn usage(text: &str) -> TrackerError {
    TrackerError::InvalidCommand(format!("usage: {}", text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_verbs_and_aliases() {
        assert_eq!("add 2330".parse::<Command>().unwrap(), Command::Add("2330".into()));
        assert_eq!("A 0050".parse::<Command>().unwrap(), Command::Add("0050".into()));
        assert_eq!("REFRESH".parse::<Command>().unwrap(), Command::Refresh);
        assert_eq!("q".parse::<Command>().unwrap(), Command::Quit);
        assert_eq!("auto On".parse::<Command>().unwrap(), Command::Auto(true));
        assert_eq!("auto off".parse::<Command>().unwrap(), Command::Auto(false));
        assert_eq!("interval 60".parse::<Command>().unwrap(), Command::Interval(60));
    }

    #[test]
    fn delete_validates_codes() {
        let cmd = "rm 2330 0050".parse::<Command>().unwrap();
        match cmd {
            Command::Delete(codes) => assert_eq!(codes.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            "delete 23".parse::<Command>(),
            Err(TrackerError::InvalidCode(_))
        ));
    }

    #[test]
    fn export_keeps_spaces_in_path() {
        assert_eq!(
            "export my quotes.csv".parse::<Command>().unwrap(),
            Command::Export(PathBuf::from("my quotes.csv"))
        );
    }

    #[test]
    fn rejects_bad_lines() {
        for line in ["", "buy 2330", "add", "auto maybe", "interval soon", "export"] {
            assert!(
                matches!(line.parse::<Command>(), Err(TrackerError::InvalidCommand(_))),
                "line {:?} should be rejected",
                line
            );
        }
    }
}
