//! Worker pool admission, backpressure and shutdown

use rust_barcode::emitter::ResultEmitter;
use rust_barcode::models::{Frame, ScanResult};
use rust_barcode::scheduler::{Scheduler, SchedulerState};
use rust_barcode::tracker::SharedTracker;
use rust_barcode::{FrameProcessor, ScanFailure, SubmitOutcome};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// Processor that holds every frame until the gate opens
struct Gated {
    open: Mutex<bool>,
    cond: Condvar,
    started: AtomicUsize,
}

impl Gated {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            open: Mutex::new(false),
            cond: Condvar::new(),
            started: AtomicUsize::new(0),
        })
    }

    fn release(&self) {
        *self.open.lock().unwrap() = true;
        self.cond.notify_all();
    }

    fn wait_started(&self, n: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while self.started.load(Ordering::SeqCst) < n {
            assert!(Instant::now() < deadline, "workers never picked up frames");
            std::thread::sleep(Duration::from_millis(1));
        }
    }
}

impl FrameProcessor for Gated {
    fn process(&self, frame_id: u64, _frame: &Frame) -> ScanResult {
        self.started.fetch_add(1, Ordering::SeqCst);
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.cond.wait(open).unwrap();
        }
        ScanResult::failed(frame_id, ScanFailure::NoCandidate)
    }
}

fn blank() -> Frame {
    Frame::gray(8, 8, vec![0; 64])
}

fn start(pool: usize, processor: Arc<dyn FrameProcessor>) -> (Scheduler, Arc<ResultEmitter>) {
    let emitter = Arc::new(ResultEmitter::new());
    let scheduler =
        Scheduler::start(pool, processor, SharedTracker::disabled(), Arc::clone(&emitter)).unwrap();
    (scheduler, emitter)
}

#[test]
fn test_saturated_pool_drops_without_blocking() {
    let gate = Gated::new();
    let (scheduler, emitter) = start(2, gate.clone());
    let results = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&results);
    emitter.on_processed(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    assert_eq!(scheduler.submit(blank()), SubmitOutcome::Accepted(0));
    assert_eq!(scheduler.submit(blank()), SubmitOutcome::Accepted(1));
    gate.wait_started(2);

    let before = Instant::now();
    for _ in 0..5 {
        assert_eq!(scheduler.submit(blank()), SubmitOutcome::Dropped);
    }
    assert!(before.elapsed() < Duration::from_secs(1));
    assert_eq!(scheduler.in_flight(), 2);

    gate.release();
    assert!(scheduler.wait_idle(Duration::from_secs(5)));
    let stats = scheduler.stats();
    assert_eq!(stats.submitted, 7);
    assert_eq!(stats.processed, 2);
    assert_eq!(stats.dropped, 5);
    assert_eq!(results.load(Ordering::SeqCst), 2);

    // capacity is back
    assert_eq!(scheduler.submit(blank()), SubmitOutcome::Accepted(2));
    assert!(scheduler.wait_idle(Duration::from_secs(5)));
    scheduler.stop();
}

#[test]
fn test_paused_pool_rejects_and_keeps_counters() {
    let (scheduler, _emitter) = start(1, Arc::new(|id: u64, _: &Frame| {
        ScanResult::failed(id, ScanFailure::NoCandidate)
    }));
    assert!(scheduler.pause());
    assert_eq!(scheduler.state(), SchedulerState::Paused);
    assert_eq!(scheduler.submit(blank()), SubmitOutcome::Paused);
    assert_eq!(scheduler.stats().submitted, 0);

    assert!(scheduler.resume());
    assert!(matches!(scheduler.submit(blank()), SubmitOutcome::Accepted(_)));
    assert!(scheduler.wait_idle(Duration::from_secs(5)));
    assert_eq!(scheduler.stats().processed, 1);
}

#[test]
fn test_stop_finishes_in_flight_frame() {
    let gate = Gated::new();
    let (scheduler, emitter) = start(1, gate.clone());
    let results = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&results);
    emitter.on_processed(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    assert!(matches!(scheduler.submit(blank()), SubmitOutcome::Accepted(_)));
    gate.wait_started(1);

    let releaser = {
        let gate = Arc::clone(&gate);
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            gate.release();
        })
    };
    scheduler.stop();
    releaser.join().unwrap();

    assert_eq!(scheduler.state(), SchedulerState::Stopped);
    assert_eq!(results.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler.submit(blank()), SubmitOutcome::Stopped);
}
