//! Result delivery.
//!
//! Two channels: `processed` receives every result record, `detected` only
//! results that feed a confirmed track. Callbacks run on the worker thread
//! that finished the frame, in completion order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::models::ScanResult;

/// A registered result callback
pub type ResultCallback = Arc<dyn Fn(&ScanResult) + Send + Sync>;

/// Handle returned on registration, used to remove the callback again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

#[derive(Default)]
struct Channel {
    callbacks: RwLock<Vec<(CallbackId, ResultCallback)>>,
}

impl Channel {
    fn read(&self) -> RwLockReadGuard<'_, Vec<(CallbackId, ResultCallback)>> {
        self.callbacks.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<(CallbackId, ResultCallback)>> {
        self.callbacks.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, result: &ScanResult) {
        // clone out so callbacks may register or remove callbacks themselves
        let callbacks: Vec<ResultCallback> = self.read().iter().map(|(_, cb)| Arc::clone(cb)).collect();
        for callback in callbacks {
            callback(result);
        }
    }

    fn remove(&self, id: CallbackId) -> bool {
        let mut callbacks = self.write();
        let before = callbacks.len();
        callbacks.retain(|(existing, _)| *existing != id);
        callbacks.len() != before
    }
}

/// Callback registry for the processed and detected channels
#[derive(Default)]
pub struct ResultEmitter {
    processed: Channel,
    detected: Channel,
    next_id: AtomicU64,
}

impl ResultEmitter {
    /// Emitter with no callbacks
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> CallbackId {
        CallbackId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Call `callback` for every processed frame
    pub fn on_processed<F>(&self, callback: F) -> CallbackId
    where
        F: Fn(&ScanResult) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.processed.write().push((id, Arc::new(callback)));
        id
    }

    /// Call `callback` for every confirmed detection
    pub fn on_detected<F>(&self, callback: F) -> CallbackId
    where
        F: Fn(&ScanResult) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.detected.write().push((id, Arc::new(callback)));
        id
    }

    /// Remove a processed callback; false if it was not registered
    pub fn off_processed(&self, id: CallbackId) -> bool {
        self.processed.remove(id)
    }

    /// Remove a detected callback; false if it was not registered
    pub fn off_detected(&self, id: CallbackId) -> bool {
        self.detected.remove(id)
    }

    /// Deliver one result; `confirmed` also routes it to the detected channel
    pub fn emit(&self, result: &ScanResult, confirmed: bool) {
        self.processed.emit(result);
        if confirmed && result.is_success() {
            self.detected.emit(result);
        }
    }
}

impl std::fmt::Debug for ResultEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultEmitter")
            .field("processed", &self.processed.read().len())
            .field("detected", &self.detected.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScanFailure;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_failures_only_reach_processed() {
        let emitter = ResultEmitter::new();
        let processed = Arc::new(AtomicUsize::new(0));
        let detected = Arc::new(AtomicUsize::new(0));
        let p = Arc::clone(&processed);
        emitter.on_processed(move |_| {
            p.fetch_add(1, Ordering::SeqCst);
        });
        let d = Arc::clone(&detected);
        emitter.on_detected(move |_| {
            d.fetch_add(1, Ordering::SeqCst);
        });

        let failure = ScanResult::failed(1, ScanFailure::NoCandidate);
        emitter.emit(&failure, true);
        assert_eq!(processed.load(Ordering::SeqCst), 1);
        assert_eq!(detected.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_off_removes_callback() {
        let emitter = ResultEmitter::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let id = emitter.on_processed(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        let result = ScanResult::failed(1, ScanFailure::NoCandidate);
        emitter.emit(&result, false);
        assert!(emitter.off_processed(id));
        assert!(!emitter.off_processed(id));
        assert!(!emitter.off_detected(id));
        emitter.emit(&result, false);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
