//! Fixed-size pool of fetch worker threads.
//!
//! Jobs are queued on a crossbeam channel and picked up by whichever worker is
//! free, so at most `size` fetches are in flight no matter how many stocks are
//! tracked. Dropping the pool (or calling `shutdown`) closes the queue; jobs
//! already queued still run before the workers exit.
use crossbeam_channel::{Sender, unbounded};
use log::{debug, error};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};

use tracker_common::{Result, TrackerError};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Bounded set of worker threads consuming a shared job queue.
pub struct WorkerPool {
    sender: Mutex<Option<Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    size: usize,
}

impl WorkerPool {
    /// Spawn `size` workers (at least one).
    pub fn new(size: usize) -> Result<Self> {
        let size = size.max(1);
        let (tx, rx) = unbounded::<Job>();
        let mut workers = Vec::with_capacity(size);

        for id in 0..size {
            let rx = rx.clone();
            let handle = thread::Builder::new()
                .name(format!("fetch-worker-{}", id))
                .spawn(move || {
                    for job in rx.iter() {
                        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                            error!("fetch-worker-{}: job panicked", id);
                        }
                    }
                    debug!("fetch-worker-{} stopping", id);
                })?;
            workers.push(handle);
        }

        Ok(Self {
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
            size,
        })
    }

    /// Number of worker threads.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Queue `job` for the next free worker.
    pub fn execute<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let guard = self.sender.lock()?;
        let sender = guard
            .as_ref()
            .ok_or_else(|| TrackerError::EngineStopped("worker pool is shut down".into()))?;
        sender
            .send(Box::new(job))
            .map_err(|e| TrackerError::ChannelSend(e.to_string()))
    }

    /// Close the queue, let queued jobs finish and join every worker.
    pub fn shutdown(&self) {
        if let Ok(mut guard) = self.sender.lock() {
            guard.take();
        }
        let handles = match self.workers.lock() {
            Ok(mut workers) => std::mem::take(&mut *workers),
            Err(_) => return,
        };
        for handle in handles {
            if handle.join().is_err() {
                error!("A fetch worker exited abnormally");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn runs_every_queued_job() {
        let pool = WorkerPool::new(3).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..20 {
            let counter = Arc::clone(&counter);
            pool.execute(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        pool.shutdown();
        assert_eq!(counter.load(Ordering::SeqCst), 20);
    }

    #[test]
    fn never_exceeds_worker_count() {
        let pool = WorkerPool::new(2).unwrap();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        for _ in 0..8 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            pool.execute(move || {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(20));
                running.fetch_sub(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        pool.shutdown();
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn panicking_job_does_not_kill_the_worker() {
        let pool = WorkerPool::new(1).unwrap();
        let done = Arc::new(AtomicUsize::new(0));
        pool.execute(|| panic!("boom")).unwrap();
        let flag = Arc::clone(&done);
        pool.execute(move || {
            flag.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        pool.shutdown();
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn rejects_jobs_after_shutdown() {
        let pool = WorkerPool::new(1).unwrap();
        pool.shutdown();
        assert!(matches!(
            pool.execute(|| {}),
            Err(TrackerError::EngineStopped(_))
        ));
    }
}
