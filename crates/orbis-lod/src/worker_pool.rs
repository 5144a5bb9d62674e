//! Background worker pool for split and merge work.
//!
//! Jobs are boxed closures pulled from a `crossbeam-channel` by named
//! worker threads. Capacity is budgeted: callers reserve slots up front with
//! [`WorkerPool::try_reserve`] so that a group of jobs (the four children of
//! a split) is either scheduled as a whole or not at all. [`JoinAll`] runs a
//! continuation once every job of a group has reported back.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use orbis_config::WorkerConfig;
use tracing::{debug, error, trace};

use crate::LodError;

/// A unit of background work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed set of worker threads with a bounded number of in-flight jobs.
pub struct WorkerPool {
    /// Sender for submitting jobs; `None` once shut down.
    job_sender: Mutex<Option<Sender<Job>>>,
    /// Worker threads, joined on shutdown.
    worker_handles: Mutex<Vec<JoinHandle<()>>>,
    /// Maximum number of reserved, queued or running jobs.
    budget: usize,
    /// Reserved + queued + running jobs.
    in_flight: Arc<AtomicUsize>,
}

impl WorkerPool {
    /// Spawn `thread_count` workers (at least one) with room for `budget` jobs.
    pub fn new(thread_count: usize, budget: usize) -> Self {
        let thread_count = thread_count.max(1);
        let (job_sender, job_receiver) = crossbeam_channel::unbounded::<Job>();
        let in_flight = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::with_capacity(thread_count);
        for index in 0..thread_count {
            let receiver = job_receiver.clone();
            let in_flight = Arc::clone(&in_flight);
            let spawned = std::thread::Builder::new()
                .name(format!("lod-worker-{index}"))
                .spawn(move || worker_loop(&receiver, &in_flight));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(err) => error!("failed to spawn lod worker {index}: {err}"),
            }
        }
        debug!(threads = handles.len(), budget, "worker pool started");

        Self {
            job_sender: Mutex::new(Some(job_sender)),
            worker_handles: Mutex::new(handles),
            budget,
            in_flight,
        }
    }

    /// Build a pool from config. `threads == 0` leaves one core for the
    /// simulation thread.
    pub fn from_config(config: &WorkerConfig) -> Self {
        let threads = if config.threads == 0 {
            num_cpus::get().saturating_sub(1).max(1)
        } else {
            config.threads
        };
        Self::new(threads, config.queue_budget)
    }

    /// Reserve capacity for `count` jobs, all or nothing.
    pub fn try_reserve(&self, count: usize) -> Result<Reservation<'_>, LodError> {
        if !self.is_running() {
            return Err(LodError::PoolShutDown);
        }
        self.in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current + count <= self.budget).then_some(current + count)
            })
            .map_err(|current| LodError::PoolExhausted {
                requested: count,
                available: self.budget.saturating_sub(current),
            })?;
        Ok(Reservation {
            pool: self,
            remaining: count,
        })
    }

    /// Number of jobs reserved, queued, or running.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Maximum number of in-flight jobs.
    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Whether the pool still accepts jobs.
    pub fn is_running(&self) -> bool {
        self.job_sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Block until no job is in flight, or `timeout` elapses.
    ///
    /// Returns `true` if the pool went idle. Jobs spawned by other jobs are
    /// counted before their parent finishes, so idle means fully settled.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let start = Instant::now();
        while self.in_flight_count() > 0 {
            if start.elapsed() >= timeout {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        true
    }

    /// Stop accepting jobs, let workers drain the queue, and join them.
    pub fn shutdown(&self) {
        // Dropping the sender closes the channel once the queue is empty.
        self.job_sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let handles: Vec<_> = self
            .worker_handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        let current = std::thread::current().id();
        for handle in handles {
            // The last reference can be dropped by a job running on a worker.
            if handle.thread().id() == current {
                continue;
            }
            let _ = handle.join();
        }
    }

    fn send(&self, job: Job) -> Result<(), Job> {
        let sender = self
            .job_sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match sender.as_ref() {
            Some(sender) => sender.send(job).map_err(|e| e.into_inner()),
            None => Err(job),
        }
    }

    fn release(&self, count: usize) {
        if count > 0 {
            self.in_flight.fetch_sub(count, Ordering::AcqRel);
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("budget", &self.budget)
            .field("in_flight", &self.in_flight_count())
            .field("running", &self.is_running())
            .finish()
    }
}

fn worker_loop(receiver: &Receiver<Job>, in_flight: &AtomicUsize) {
    while let Ok(job) = receiver.recv() {
        if catch_unwind(AssertUnwindSafe(job)).is_err() {
            error!("lod worker job panicked");
        }
        in_flight.fetch_sub(1, Ordering::AcqRel);
    }
    trace!("lod worker exiting");
}

/// Capacity held for jobs that have not been spawned yet.
///
/// Unused slots are released when the reservation is dropped.
#[derive(Debug)]
pub struct Reservation<'a> {
    pool: &'a WorkerPool,
    remaining: usize,
}

impl Reservation<'_> {
    /// Submit one job against this reservation.
    ///
    /// Hands the job back if the reservation is used up or the pool has
    /// shut down in the meantime.
    pub fn spawn(&mut self, job: impl FnOnce() + Send + 'static) -> Result<(), Job> {
        let job: Job = Box::new(job);
        if self.remaining == 0 {
            return Err(job);
        }
        self.remaining -= 1;
        self.pool.send(job).inspect_err(|_| self.pool.release(1))
    }

    /// Slots not yet used.
    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        self.pool.release(self.remaining);
    }
}

type Continuation<T, const N: usize> = Box<dyn FnOnce([Option<T>; N]) + Send + 'static>;

/// Collects the results of `N` jobs and runs a continuation after the last
/// one reports, with results in slot order regardless of completion order.
///
/// A slot reported as `None` marks a failed job; the continuation decides
/// what to do with a partial set.
pub struct JoinAll<T, const N: usize> {
    slots: Mutex<[Option<T>; N]>,
    remaining: AtomicUsize,
    continuation: Mutex<Option<Continuation<T, N>>>,
}

impl<T: Send + 'static, const N: usize> JoinAll<T, N> {
    /// Create a join point that calls `continuation` once all `N` slots report.
    pub fn new(continuation: impl FnOnce([Option<T>; N]) + Send + 'static) -> Arc<Self> {
        Arc::new(Self {
            slots: Mutex::new(std::array::from_fn(|_| None)),
            remaining: AtomicUsize::new(N),
            continuation: Mutex::new(Some(Box::new(continuation))),
        })
    }

    /// Report the result for `index`. Each slot must be reported exactly once.
    pub fn complete(&self, index: usize, value: Option<T>) {
        {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            debug_assert!(index < N, "slot {index} out of range");
            slots[index] = value;
        }
        if self.remaining.fetch_sub(1, Ordering::AcqRel) != 1 {
            return;
        }
        let results = std::mem::replace(
            &mut *self.slots.lock().unwrap_or_else(PoisonError::into_inner),
            std::array::from_fn(|_| None),
        );
        let continuation = self
            .continuation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(continuation) = continuation {
            continuation(results);
        }
    }

    /// Slots that have not reported yet.
    pub fn pending(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }
}
