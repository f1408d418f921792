//! Fixed worker pool with drop-on-saturation backpressure.
//!
//! At most `pool_size` frames are admitted at once (queued or processing).
//! A frame arriving while the pool is full is dropped and counted; `submit`
//! never blocks. Results reach the emitter in completion order.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::emitter::ResultEmitter;
use crate::error::{ConfigError, ScanError};
use crate::models::Frame;
use crate::pipeline::FrameProcessor;
use crate::tracker::SharedTracker;

const RUNNING: u8 = 0;
const PAUSED: u8 = 1;
const STOPPED: u8 = 2;

/// Scheduler run state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Accepting frames
    Running,
    /// Rejecting frames, state preserved
    Paused,
    /// Shut down for good
    Stopped,
}

impl SchedulerState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            RUNNING => SchedulerState::Running,
            PAUSED => SchedulerState::Paused,
            _ => SchedulerState::Stopped,
        }
    }
}

/// What happened to a submitted frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Queued for a worker under this frame id
    Accepted(u64),
    /// Every worker was busy; the frame was discarded
    Dropped,
    /// The scheduler is paused
    Paused,
    /// The scheduler has stopped
    Stopped,
}

/// Frame counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Frames offered while running
    pub submitted: u64,
    /// Frames that produced a result
    pub processed: u64,
    /// Frames discarded because the pool was saturated
    pub dropped: u64,
}

struct Job {
    frame_id: u64,
    frame: Frame,
}

struct Shared {
    processor: Arc<dyn FrameProcessor>,
    tracker: SharedTracker,
    emitter: Arc<ResultEmitter>,
    state: AtomicU8,
    in_flight: AtomicUsize,
    next_frame_id: AtomicU64,
    submitted: AtomicU64,
    processed: AtomicU64,
    dropped: AtomicU64,
    /// Set after a drop until the next completion, so a burst logs once
    dropping: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn worker_loop(shared: Arc<Shared>, jobs: Arc<Mutex<Receiver<Job>>>) {
    loop {
        let job = lock(&jobs).recv();
        let Ok(Job { frame_id, frame }) = job else {
            break;
        };
        if shared.state.load(Ordering::Acquire) == STOPPED {
            // queued before stop; never started
            shared.in_flight.fetch_sub(1, Ordering::AcqRel);
            continue;
        }

        let result = shared.processor.process(frame_id, &frame);
        drop(frame);
        let update = shared.tracker.observe(&result);
        shared.processed.fetch_add(1, Ordering::Relaxed);
        shared.emitter.emit(&result, update.is_confirmed());
        shared.dropping.store(false, Ordering::Relaxed);
        shared.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Worker pool running a [`FrameProcessor`] on submitted frames
pub struct Scheduler {
    shared: Arc<Shared>,
    pool_size: usize,
    sender: Mutex<Option<SyncSender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    /// Spawn `pool_size` workers and start accepting frames
    pub fn start(
        pool_size: usize,
        processor: Arc<dyn FrameProcessor>,
        tracker: SharedTracker,
        emitter: Arc<ResultEmitter>,
    ) -> Result<Self, ScanError> {
        if pool_size == 0 {
            return Err(ConfigError::InvalidWorkerCount.into());
        }
        let shared = Arc::new(Shared {
            processor,
            tracker,
            emitter,
            state: AtomicU8::new(RUNNING),
            in_flight: AtomicUsize::new(0),
            next_frame_id: AtomicU64::new(0),
            submitted: AtomicU64::new(0),
            processed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            dropping: AtomicBool::new(false),
        });

        let (sender, receiver) = mpsc::sync_channel::<Job>(pool_size);
        let receiver = Arc::new(Mutex::new(receiver));
        let mut workers = Vec::with_capacity(pool_size);
        for index in 0..pool_size {
            let shared = Arc::clone(&shared);
            let jobs = Arc::clone(&receiver);
            let handle = thread::Builder::new()
                .name(format!("barcode-worker-{index}"))
                .spawn(move || worker_loop(shared, jobs))?;
            workers.push(handle);
        }
        info!(pool_size, "scheduler started");

        Ok(Self {
            shared,
            pool_size,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
        })
    }

    /// Number of workers
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Current run state
    pub fn state(&self) -> SchedulerState {
        SchedulerState::from_raw(self.shared.state.load(Ordering::Acquire))
    }

    /// Frames admitted and not yet finished
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    /// Counter snapshot
    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            submitted: self.shared.submitted.load(Ordering::Relaxed),
            processed: self.shared.processed.load(Ordering::Relaxed),
            dropped: self.shared.dropped.load(Ordering::Relaxed),
        }
    }

    fn reject(&self) {
        self.shared.in_flight.fetch_sub(1, Ordering::AcqRel);
    }

    /// Offer a frame; never blocks
    pub fn submit(&self, frame: Frame) -> SubmitOutcome {
        match self.shared.state.load(Ordering::Acquire) {
            PAUSED => return SubmitOutcome::Paused,
            STOPPED => return SubmitOutcome::Stopped,
            _ => {}
        }
        self.shared.submitted.fetch_add(1, Ordering::Relaxed);

        if self.shared.in_flight.fetch_add(1, Ordering::AcqRel) >= self.pool_size {
            self.reject();
            let dropped = self.shared.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            if !self.shared.dropping.swap(true, Ordering::Relaxed) {
                warn!(dropped, pool_size = self.pool_size, "worker pool saturated, dropping frames");
            }
            return SubmitOutcome::Dropped;
        }

        let frame_id = self.shared.next_frame_id.fetch_add(1, Ordering::Relaxed);
        let sender = lock(&self.sender);
        let Some(tx) = sender.as_ref() else {
            self.reject();
            return SubmitOutcome::Stopped;
        };
        match tx.try_send(Job { frame_id, frame }) {
            Ok(()) => SubmitOutcome::Accepted(frame_id),
            Err(TrySendError::Full(_)) => {
                self.reject();
                self.shared.dropped.fetch_add(1, Ordering::Relaxed);
                SubmitOutcome::Dropped
            }
            Err(TrySendError::Disconnected(_)) => {
                self.reject();
                SubmitOutcome::Stopped
            }
        }
    }

    /// Stop admitting frames; queued work and tracker state are kept
    pub fn pause(&self) -> bool {
        let paused = self
            .shared
            .state
            .compare_exchange(RUNNING, PAUSED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if paused {
            info!("scheduler paused");
        }
        paused
    }

    /// Resume after [`Scheduler::pause`]
    pub fn resume(&self) -> bool {
        let resumed = self
            .shared
            .state
            .compare_exchange(PAUSED, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if resumed {
            info!("scheduler resumed");
        }
        resumed
    }

    /// Shut down: in-flight frames finish and are emitted, queued frames are
    /// discarded, workers are joined.
    ///
    /// Safe to call from a result callback; the calling worker is not joined.
    pub fn stop(&self) {
        if self.shared.state.swap(STOPPED, Ordering::AcqRel) == STOPPED {
            return;
        }
        lock(&self.sender).take();
        let current = thread::current().id();
        let workers: Vec<JoinHandle<()>> = lock(&self.workers).drain(..).collect();
        for handle in workers {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                warn!("worker thread panicked");
            }
        }
        let stats = self.stats();
        info!(
            processed = stats.processed,
            dropped = stats.dropped,
            "scheduler stopped"
        );
    }

    /// Poll until nothing is in flight or `timeout` passes; true when idle
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.in_flight() > 0 {
            if Instant::now() >= deadline {
                debug!(in_flight = self.in_flight(), "wait_idle timed out");
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
        true
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("pool_size", &self.pool_size)
            .field("state", &self.state())
            .field("in_flight", &self.in_flight())
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScanFailure;
    use crate::models::ScanResult;
    use std::sync::atomic::AtomicUsize;

    fn blank() -> Frame {
        Frame::gray(4, 4, vec![0; 16])
    }

    fn echo(frame_id: u64, _frame: &Frame) -> ScanResult {
        ScanResult::failed(frame_id, ScanFailure::NoCandidate)
    }

    #[test]
    fn test_zero_workers_rejected() {
        let err = Scheduler::start(
            0,
            Arc::new(echo),
            SharedTracker::disabled(),
            Arc::new(ResultEmitter::new()),
        )
        .unwrap_err();
        assert!(matches!(err, ScanError::Config(ConfigError::InvalidWorkerCount)));
    }

    #[test]
    fn test_processes_and_emits() {
        let emitter = Arc::new(ResultEmitter::new());
        let seen = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&seen);
        emitter.on_processed(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        });
        let scheduler =
            Scheduler::start(2, Arc::new(echo), SharedTracker::disabled(), emitter).unwrap();
        let mut accepted = 0;
        for _ in 0..20 {
            if let SubmitOutcome::Accepted(_) = scheduler.submit(blank()) {
                accepted += 1;
            }
            scheduler.wait_idle(Duration::from_secs(5));
        }
        assert!(scheduler.wait_idle(Duration::from_secs(5)));
        assert_eq!(accepted, 20);
        assert_eq!(seen.load(Ordering::SeqCst), 20);
        assert_eq!(scheduler.stats().processed, 20);
    }

    #[test]
    fn test_pause_and_stop() {
        let scheduler = Scheduler::start(
            1,
            Arc::new(echo),
            SharedTracker::disabled(),
            Arc::new(ResultEmitter::new()),
        )
        .unwrap();
        assert!(scheduler.pause());
        assert_eq!(scheduler.submit(blank()), SubmitOutcome::Paused);
        assert_eq!(scheduler.state(), SchedulerState::Paused);
        assert!(scheduler.resume());
        assert!(matches!(scheduler.submit(blank()), SubmitOutcome::Accepted(_)));
        scheduler.stop();
        assert_eq!(scheduler.submit(blank()), SubmitOutcome::Stopped);
        assert!(!scheduler.resume());
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }
}
