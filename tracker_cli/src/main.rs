//! Stock Tracker — a terminal front-end for the tracking engine. It keeps a
//! table of the latest daily quote for a handful of 4-digit stock codes,
//! refreshes it on demand or on a timer, and remembers the tracked codes
//! between sessions.
//!
//! Usage example (CLI):
//! ```bash
//! tracker_cli --interval 60 --auto --seed ./codes.txt
//! ```
//!
//! Once running, type `help` at the prompt for the list of commands
//! (`add 2330`, `refresh`, `delete 2330`, `export quotes.csv`, `auto on`, ...).
//!
//! Threads:
//! - the main thread multiplexes typed lines and Ctrl+C with crossbeam `select!`;
//! - a stdin reader thread forwards lines to the main thread;
//! - the renderer thread redraws the table whenever the engine reports a change;
//! - the engine's fetch workers and scheduler thread live inside `tracker_engine`.
#![warn(missing_docs)]
mod app;
mod args;
mod render;

use crate::app::{App, Reply};
use crate::args::Args;
use clap::Parser;
use crossbeam_channel::{Receiver, bounded, select, unbounded};
use log::{error, info, warn};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::sync::Arc;
use std::thread;
use tracker_common::code::CodeParser;
use tracker_common::{Command, Result, StockCode, TrackerError};
use tracker_engine::{EventSink, RefreshEngine};

fn main() -> Result<(), TrackerError> {
    init_logger();
    let args = Args::parse();

    let (stop_tx, stop_rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        info!("Ctrl+C received. Shutting down tracker...");
        let _ = stop_tx.try_send(());
    })
    .expect("Error setting Ctrl+C handler");

    let (event_tx, event_rx) = unbounded();
    let engine = Arc::new(RefreshEngine::from_config(
        &args.engine_config(),
        EventSink::new(event_tx),
    )?);
    let renderer = render::spawn(Arc::clone(engine.store()), event_rx)?;
    let app = App::new(Arc::clone(&engine), args.scheduler_config())?;

    let restored = engine.restore();
    if restored == 0 {
        info!("No saved stocks; start with `add <code>`");
    }
    if let Some(path) = args.seed_path() {
        seed(&engine, &path)?;
    }
    if args.auto {
        app.scheduler().enable_stored()?;
    }

    println!("Stock tracker ready. Type `help` for commands.");
    run_prompt(&app, spawn_stdin_reader()?, stop_rx);

    app.shutdown();
    drop(app);
    drop(engine);
    if renderer.join().is_err() {
        error!("Renderer thread exited abnormally");
    }
    Ok(())
}

/// Reads commands until `quit`, end of input or Ctrl+C.
fn run_prompt(app: &App, lines: Receiver<String>, stop: Receiver<()>) {
    prompt();
    loop {
        select! {
            recv(stop) -> _ => break,
            recv(lines) -> msg => match msg {
                Ok(line) => {
                    if line.trim().is_empty() {
                        prompt();
                        continue;
                    }
                    match line.parse::<Command>().and_then(|cmd| app.handle(cmd)) {
                        Ok(Reply::Message(text)) => println!("{}", text),
                        Ok(Reply::Quit) => break,
                        Err(e) => println!("error: {}", e),
                    }
                    prompt();
                }
                Err(_) => {
                    info!("Input closed");
                    break;
                }
            }
        }
    }
}

fn prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}

/// Forwards stdin lines over a channel so the prompt can also wait on Ctrl+C.
fn spawn_stdin_reader() -> Result<Receiver<String>> {
    let (tx, rx) = unbounded();
    thread::Builder::new().name("stdin".into()).spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!("Read input error: {}", e);
                    break;
                }
            }
        }
    })?;
    Ok(rx)
}

/// Adds every code listed in the seed file that is not tracked yet.
fn seed(engine: &RefreshEngine, path: &std::path::Path) -> Result<()> {
    let file = File::open(path)?;
    let codes = StockCode::parse_from_reader(BufReader::new(file))?;
    info!("Seeding {} codes from {}", codes.len(), path.display());
    for code in codes {
        match engine.fetch_one(code.as_str()) {
            Ok(_) | Err(TrackerError::DuplicateCode(_)) => {}
            Err(e) => warn!("Skipping seed code {}: {}", code, e),
        }
    }
    Ok(())
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
