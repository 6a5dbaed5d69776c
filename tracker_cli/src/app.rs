//! Dispatch of user commands onto the engine and the scheduler.
use log::info;
use std::sync::Arc;
use std::time::Duration;

use tracker_common::command::HELP;
use tracker_common::{Command, Result};
use tracker_engine::{RefreshEngine, Scheduler, SchedulerConfig, SchedulerState};

use crate::render::render_table;

/// What the prompt should do after a command.
#[derive(Debug, PartialEq, Eq)]
pub enum Reply {
    /// Print this text and keep going.
    Message(String),
    /// Leave the prompt.
    Quit,
}

/// The tracker as seen from the prompt.
pub struct App {
    engine: Arc<RefreshEngine>,
    scheduler: Scheduler,
}

impl App {
    /// Wire `engine` to a fresh scheduler.
    pub fn new(engine: Arc<RefreshEngine>, config: SchedulerConfig) -> Result<Self> {
        let scheduler = Scheduler::start(engine.clone(), config)?;
        Ok(Self { engine, scheduler })
    }

    /// The scheduler, for startup options such as `--auto`.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Run one command. Errors are meant to be shown to the user as-is.
    pub fn handle(&self, command: Command) -> Result<Reply> {
        let text = match command {
            Command::Add(raw) => {
                let code = self.engine.fetch_one(&raw)?;
                format!("Fetching {}...", code)
            }
            Command::Refresh => {
                let batch = self.engine.fetch_all();
                if batch.is_empty() {
                    "Nothing to refresh".to_string()
                } else {
                    format!("Refreshing {} stocks...", batch.len())
                }
            }
            Command::Delete(codes) => {
                let removed = self.engine.remove(&codes);
                format!("Removed {} of {} stocks", removed, codes.len())
            }
            Command::Clear => {
                let removed = self.engine.clear();
                format!("Cleared {} stocks", removed)
            }
            Command::Export(path) => {
                let rows = self.engine.export_csv(&path)?;
                format!("Exported {} rows to {}", rows, path.display())
            }
            Command::Auto(true) => {
                let interval = self.scheduler.enable_stored()?;
                format!("Auto-refresh on, every {}s", interval.as_secs())
            }
            Command::Auto(false) => {
                self.scheduler.disable()?;
                "Auto-refresh off".to_string()
            }
            Command::Interval(secs) => {
                let interval = self.scheduler.set_interval(Duration::from_secs(secs))?;
                format!("Interval set to {}s", interval.as_secs())
            }
            Command::List => render_table(&self.engine.snapshot()),
            Command::Status => self.status(),
            Command::Help => HELP.to_string(),
            Command::Quit => return Ok(Reply::Quit),
        };
        Ok(Reply::Message(text))
    }

    fn status(&self) -> String {
        let auto = match self.scheduler.state() {
            SchedulerState::Enabled { interval } => format!("on, every {}s", interval.as_secs()),
            SchedulerState::Disabled => format!("off (interval {}s)", self.scheduler.interval().as_secs()),
        };
        format!(
            "tracking {} stocks; auto-refresh {}; {} cycles run",
            self.engine.store().len(),
            auto,
            self.scheduler.cycles()
        )
    }

    /// Stop the scheduler, then let queued fetches finish.
    pub fn shutdown(&self) {
        info!("Shutting down tracker...");
        self.scheduler.shutdown();
        self.engine.shutdown();
    }
}
