//! Auto-refresh scheduler.
//!
//! A single background thread owns the scheduler state machine
//! (`Disabled` / `Enabled { interval }`) and the one timer. Callers talk to it
//! through a control channel, so `enable`, `disable` and `set_interval` all go
//! through the same cancellation point and timers are never stacked.
//!
//! A cycle runs on the scheduler thread and blocks it until the refresh batch
//! completes. Control messages that arrive meanwhile are applied right after the
//! cycle, before the next deadline is armed: a `disable` during a cycle means no
//! further cycle, and an interval change during a cycle is measured from the
//! moment the cycle finished.
use crossbeam_channel::{Receiver, Sender, after, never, select, unbounded};
use log::{debug, error, info};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracker_common::{Result, TrackerError};

use crate::config::SchedulerConfig;

/// Work performed on every scheduled tick.
pub trait RefreshCycle: Send + Sync {
    /// Run one full refresh and return when it is done.
    fn run_cycle(&self);
}

/// Externally visible scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No cycles are armed.
    Disabled,
    /// Cycles repeat every `interval`.
    Enabled {
        /// Time between the end of one cycle and the start of the next.
        interval: Duration,
    },
}

enum Control {
    Enable(Duration),
    Disable,
    SetInterval(Duration),
    Shutdown,
}

#[derive(Debug)]
struct Status {
    state: SchedulerState,
    interval: Duration,
}

/// Handle on the scheduler thread.
pub struct Scheduler {
    control: Sender<Control>,
    status: Mutex<Status>,
    cycles: Arc<AtomicU64>,
    handle: Mutex<Option<JoinHandle<()>>>,
    config: SchedulerConfig,
}

impl Scheduler {
    /// Spawn the scheduler thread in the `Disabled` state.
    pub fn start(cycle: Arc<dyn RefreshCycle>, config: SchedulerConfig) -> Result<Self> {
        let (control_tx, control_rx) = unbounded();
        let cycles = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&cycles);
        let handle = thread::Builder::new()
            .name("refresh-scheduler".into())
            .spawn(move || run(cycle, control_rx, counter))?;

        Ok(Self {
            control: control_tx,
            status: Mutex::new(Status {
                state: SchedulerState::Disabled,
                interval: config.clamp(config.initial_interval),
            }),
            cycles,
            handle: Mutex::new(Some(handle)),
            config,
        })
    }

    fn status(&self) -> MutexGuard<'_, Status> {
        self.status.lock().unwrap_or_else(|p| p.into_inner())
    }

    // Callers hold the status lock across the send so the mirrored state and
    // the order of messages seen by the thread always agree.
    fn send(&self, msg: Control) -> Result<()> {
        self.control
            .send(msg)
            .map_err(|_| TrackerError::EngineStopped("scheduler is shut down".into()))
    }

    /// Turn auto-refresh on: one cycle now, then one per `interval`.
    ///
    /// Returns the interval after clamping. Enabling an enabled scheduler only
    /// changes the interval.
    pub fn enable(&self, interval: Duration) -> Result<Duration> {
        let interval = self.config.clamp(interval);
        let mut status = self.status();
        self.send(Control::Enable(interval))?;
        status.state = SchedulerState::Enabled { interval };
        status.interval = interval;
        info!("Auto-refresh enabled every {:?}", interval);
        Ok(interval)
    }

    /// Turn auto-refresh on with the stored interval.
    pub fn enable_stored(&self) -> Result<Duration> {
        let interval = self.interval();
        self.enable(interval)
    }

    /// Turn auto-refresh off. A cycle already running is allowed to finish.
    pub fn disable(&self) -> Result<()> {
        let mut status = self.status();
        self.send(Control::Disable)?;
        status.state = SchedulerState::Disabled;
        info!("Auto-refresh disabled");
        Ok(())
    }

    /// Change the interval; re-arms the timer when enabled.
    ///
    /// Returns the interval after clamping.
    pub fn set_interval(&self, interval: Duration) -> Result<Duration> {
        let interval = self.config.clamp(interval);
        let mut status = self.status();
        self.send(Control::SetInterval(interval))?;
        status.interval = interval;
        if let SchedulerState::Enabled { .. } = status.state {
            status.state = SchedulerState::Enabled { interval };
        }
        info!("Auto-refresh interval set to {:?}", interval);
        Ok(interval)
    }

    /// Current state.
    pub fn state(&self) -> SchedulerState {
        self.status().state
    }

    /// Stored interval (used by the next `enable_stored` when disabled).
    pub fn interval(&self) -> Duration {
        self.status().interval
    }

    /// Number of cycles completed so far.
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    /// Stop the thread, waiting for a running cycle to finish.
    pub fn shutdown(&self) {
        let _ = self.control.send(Control::Shutdown);
        let handle = match self.handle.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("Scheduler thread exited abnormally");
            }
            debug!("Scheduler thread joined");
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// State owned by the scheduler thread.
struct Machine {
    state: SchedulerState,
    deadline: Option<Instant>,
}

impl Machine {
    /// Apply one control message; returns `false` on shutdown.
    fn apply(&mut self, msg: Control) -> bool {
        match msg {
            Control::Enable(interval) => {
                let was_enabled = matches!(self.state, SchedulerState::Enabled { .. });
                self.state = SchedulerState::Enabled { interval };
                self.deadline = Some(if was_enabled {
                    Instant::now() + interval
                } else {
                    Instant::now()
                });
            }
            Control::Disable => {
                self.state = SchedulerState::Disabled;
                self.deadline = None;
            }
            Control::SetInterval(interval) => {
                if let SchedulerState::Enabled { .. } = self.state {
                    self.state = SchedulerState::Enabled { interval };
                    self.deadline = Some(Instant::now() + interval);
                }
            }
            Control::Shutdown => return false,
        }
        true
    }

    fn rearm(&mut self) {
        self.deadline = match self.state {
            SchedulerState::Enabled { interval } => Some(Instant::now() + interval),
            SchedulerState::Disabled => None,
        };
    }
}

fn run(cycle: Arc<dyn RefreshCycle>, control: Receiver<Control>, cycles: Arc<AtomicU64>) {
    debug!("Scheduler thread started");
    let mut machine = Machine {
        state: SchedulerState::Disabled,
        deadline: None,
    };

    loop {
        let timer = match machine.deadline {
            Some(at) => after(at.saturating_duration_since(Instant::now())),
            None => never(),
        };

        select! {
            recv(control) -> msg => match msg {
                Ok(msg) => {
                    if !machine.apply(msg) {
                        break;
                    }
                }
                Err(_) => break,
            },
            recv(timer) -> _ => {
                cycle.run_cycle();
                cycles.fetch_add(1, Ordering::SeqCst);
                machine.rearm();

                let mut running = true;
                while let Ok(msg) = control.try_recv() {
                    if !machine.apply(msg) {
                        running = false;
                        break;
                    }
                }
                if !running {
                    break;
                }
            },
        }
    }
    debug!("Scheduler thread stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counts cycles, optionally taking `delay` each.
    struct Counter {
        runs: AtomicU64,
        delay: Duration,
    }

    impl RefreshCycle for Counter {
        fn run_cycle(&self) {
            self.runs.fetch_add(1, Ordering::SeqCst);
            thread::sleep(self.delay);
        }
    }

    fn counter(delay: Duration) -> Arc<Counter> {
        Arc::new(Counter {
            runs: AtomicU64::new(0),
            delay,
        })
    }

    /// Millisecond-scale bounds so timing tests stay short.
    fn fast_config() -> SchedulerConfig {
        SchedulerConfig {
            min_interval: Duration::from_millis(10),
            max_interval: Duration::from_secs(10),
            initial_interval: Duration::from_millis(200),
        }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn starts_disabled_and_idle() {
        let work = counter(Duration::ZERO);
        let scheduler = Scheduler::start(work.clone(), fast_config()).unwrap();
        thread::sleep(ms(100));
        assert_eq!(scheduler.state(), SchedulerState::Disabled);
        assert_eq!(work.runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn interval_of_ten_over_twenty_five_runs_two_or_three_cycles() {
        let work = counter(Duration::ZERO);
        let scheduler = Scheduler::start(work.clone(), fast_config()).unwrap();
        scheduler.enable(ms(200)).unwrap();
        thread::sleep(ms(500));
        scheduler.disable().unwrap();

        let runs = work.runs.load(Ordering::SeqCst);
        assert!((2..=3).contains(&runs), "ran {} cycles", runs);
    }

    #[test]
    fn enable_runs_immediately() {
        let work = counter(Duration::ZERO);
        let scheduler = Scheduler::start(work.clone(), fast_config()).unwrap();
        scheduler.enable(Duration::from_secs(5)).unwrap();
        thread::sleep(ms(100));
        assert_eq!(work.runs.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.cycles(), 1);
    }

    #[test]
    fn disable_stops_future_cycles() {
        let work = counter(Duration::ZERO);
        let scheduler = Scheduler::start(work.clone(), fast_config()).unwrap();
        scheduler.enable(ms(30)).unwrap();
        thread::sleep(ms(100));
        scheduler.disable().unwrap();
        thread::sleep(ms(20));

        let settled = work.runs.load(Ordering::SeqCst);
        thread::sleep(ms(200));
        assert_eq!(work.runs.load(Ordering::SeqCst), settled);
        assert_eq!(scheduler.state(), SchedulerState::Disabled);
    }

    #[test]
    fn disable_during_cycle_lets_it_finish_without_rearming() {
        let work = counter(ms(150));
        let scheduler = Scheduler::start(work.clone(), fast_config()).unwrap();
        scheduler.enable(ms(20)).unwrap();
        thread::sleep(ms(50));
        scheduler.disable().unwrap();
        thread::sleep(ms(300));

        assert_eq!(work.runs.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.cycles(), 1);
    }

    #[test]
    fn set_interval_replaces_the_timer() {
        let work = counter(Duration::ZERO);
        let scheduler = Scheduler::start(work.clone(), fast_config()).unwrap();
        scheduler.enable(Duration::from_secs(5)).unwrap();
        thread::sleep(ms(50));
        assert_eq!(work.runs.load(Ordering::SeqCst), 1);

        scheduler.set_interval(ms(40)).unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Enabled { interval: ms(40) });
        thread::sleep(ms(300));
        assert!(work.runs.load(Ordering::SeqCst) >= 3);
    }

    #[test]
    fn set_interval_while_disabled_only_stores_it() {
        let work = counter(Duration::ZERO);
        let scheduler = Scheduler::start(work.clone(), fast_config()).unwrap();
        scheduler.set_interval(ms(50)).unwrap();
        thread::sleep(ms(150));

        assert_eq!(scheduler.state(), SchedulerState::Disabled);
        assert_eq!(scheduler.interval(), ms(50));
        assert_eq!(work.runs.load(Ordering::SeqCst), 0);

        assert_eq!(scheduler.enable_stored().unwrap(), ms(50));
        assert_eq!(scheduler.state(), SchedulerState::Enabled { interval: ms(50) });
    }

    #[test]
    fn intervals_are_clamped() {
        let work = counter(Duration::ZERO);
        let scheduler = Scheduler::start(work, SchedulerConfig::default()).unwrap();
        assert_eq!(
            scheduler.set_interval(Duration::from_secs(1)).unwrap(),
            Duration::from_secs(5)
        );
        assert_eq!(
            scheduler.set_interval(Duration::from_secs(301)).unwrap(),
            Duration::from_secs(300)
        );
        assert_eq!(scheduler.interval(), Duration::from_secs(300));
        assert_eq!(
            scheduler.enable(Duration::ZERO).unwrap(),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn rapid_toggling_leaves_a_single_timer() {
        let work = counter(Duration::ZERO);
        let scheduler = Scheduler::start(work.clone(), fast_config()).unwrap();
        for _ in 0..10 {
            scheduler.enable(ms(100)).unwrap();
            scheduler.disable().unwrap();
        }
        scheduler.enable(ms(100)).unwrap();
        thread::sleep(ms(50));
        let start = work.runs.load(Ordering::SeqCst);
        thread::sleep(ms(250));
        let later = work.runs.load(Ordering::SeqCst);
        // One timer at 100ms yields 2-3 more cycles; stacked timers would yield far more.
        assert!(later - start <= 3, "{} extra cycles", later - start);
    }

    #[test]
    fn shutdown_stops_the_thread() {
        let work = counter(Duration::ZERO);
        let scheduler = Scheduler::start(work.clone(), fast_config()).unwrap();
        scheduler.enable(ms(20)).unwrap();
        thread::sleep(ms(30));
        scheduler.shutdown();
        let settled = work.runs.load(Ordering::SeqCst);
        thread::sleep(ms(100));
        assert_eq!(work.runs.load(Ordering::SeqCst), settled);
        assert!(matches!(
            scheduler.enable(ms(20)),
            Err(TrackerError::EngineStopped(_))
        ));
    }
}
