//! Scanner lifecycle: init, start, pause, stop.

use std::sync::Arc;

use tracing::info;

use crate::config::ScannerConfig;
use crate::debug::{DebugSink, TracingSink, debug_enabled};
use crate::decoder::{ReaderRegistry, SymbologyDecoder};
use crate::emitter::{CallbackId, ResultEmitter};
use crate::error::{ConfigError, ScanError};
use crate::models::{Frame, ScanResult};
use crate::pipeline::Pipeline;
use crate::scheduler::{Scheduler, SchedulerState, SchedulerStats, SubmitOutcome};
use crate::tracker::{SharedTracker, TrackedDetection};

/// Run the pipeline once on one frame, without scheduler or tracker
pub fn decode_single(config: &ScannerConfig, frame: &Frame) -> Result<ScanResult, ScanError> {
    Ok(Pipeline::from_config(config)?.process(0, frame))
}

/// Streaming scanner.
///
/// Frames go in through [`BarcodeScanner::submit`]; results come out through
/// the callbacks registered with `on_processed` and `on_detected`.
pub struct BarcodeScanner {
    config: ScannerConfig,
    registry: ReaderRegistry,
    emitter: Arc<ResultEmitter>,
    tracker: SharedTracker,
    sink: Option<Arc<dyn DebugSink>>,
    scheduler: Option<Scheduler>,
    stopped: bool,
}

impl BarcodeScanner {
    /// Validate `config` against the built-in readers
    pub fn init(config: ScannerConfig) -> Result<Self, ScanError> {
        Self::with_registry(config, ReaderRegistry::with_defaults())
    }

    /// Validate `config` against a custom registry
    pub fn with_registry(config: ScannerConfig, registry: ReaderRegistry) -> Result<Self, ScanError> {
        config.validate()?;
        registry.resolve(&config.decoder.readers)?;
        let tracker = if config.tracking {
            SharedTracker::new(config.tracking_options.clone())
        } else {
            SharedTracker::disabled()
        };
        let sink: Option<Arc<dyn DebugSink>> = if config.debug || debug_enabled() {
            Some(Arc::new(TracingSink))
        } else {
            None
        };
        Ok(Self {
            config,
            registry,
            emitter: Arc::new(ResultEmitter::new()),
            tracker,
            sink,
            scheduler: None,
            stopped: false,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Replace the visualization sink; takes effect on the next start
    pub fn set_debug_sink(&mut self, sink: Option<Arc<dyn DebugSink>>) {
        self.sink = sink;
    }

    /// Whether frames are currently admitted
    pub fn is_running(&self) -> bool {
        self.scheduler
            .as_ref()
            .is_some_and(|s| s.state() == SchedulerState::Running)
    }

    /// Add a custom reader; not allowed while running
    pub fn register_reader(
        &mut self,
        name: &str,
        decoder: Arc<dyn SymbologyDecoder>,
    ) -> Result<(), ScanError> {
        if self.is_running() {
            return Err(ScanError::AlreadyRunning);
        }
        self.registry.register(name, decoder)
    }

    /// Replace the enabled readers.
    ///
    /// Fails with [`ScanError::AlreadyRunning`] while running. A paused
    /// scanner drops its queued frames and picks the new readers up on
    /// [`BarcodeScanner::start`]; tracker state is kept.
    pub fn set_readers<S: AsRef<str>>(&mut self, readers: &[S]) -> Result<(), ScanError> {
        if self.is_running() {
            return Err(ScanError::AlreadyRunning);
        }
        if readers.is_empty() {
            return Err(ConfigError::EmptyReaderList.into());
        }
        self.registry.resolve(readers)?;
        self.config.decoder.readers = readers.iter().map(|r| r.as_ref().to_string()).collect();
        if let Some(scheduler) = self.scheduler.take() {
            scheduler.stop();
        }
        info!(readers = ?self.config.decoder.readers, "readers updated");
        Ok(())
    }

    /// Start the worker pool, or resume it after a pause
    pub fn start(&mut self) -> Result<(), ScanError> {
        if self.stopped {
            return Err(ScanError::Stopped);
        }
        if let Some(scheduler) = &self.scheduler {
            scheduler.resume();
            return Ok(());
        }
        let decoders = self.registry.resolve(&self.config.decoder.readers)?;
        let mut pipeline = Pipeline::new(&self.config, decoders);
        if let Some(sink) = &self.sink {
            pipeline = pipeline.with_debug_sink(Arc::clone(sink));
        }
        let scheduler = Scheduler::start(
            self.config.num_of_workers,
            Arc::new(pipeline),
            self.tracker.clone(),
            Arc::clone(&self.emitter),
        )?;
        self.scheduler = Some(scheduler);
        Ok(())
    }

    /// Stop admitting frames until the next [`BarcodeScanner::start`]
    pub fn pause(&self) {
        if let Some(scheduler) = &self.scheduler {
            scheduler.pause();
        }
    }

    /// Finish in-flight frames and shut down; the scanner cannot restart
    pub fn stop(&mut self) {
        if let Some(scheduler) = &self.scheduler {
            scheduler.stop();
        }
        self.stopped = true;
    }

    /// Offer a frame.
    ///
    /// Before the first start frames are reported as `Paused`.
    pub fn submit(&self, frame: Frame) -> SubmitOutcome {
        match &self.scheduler {
            Some(scheduler) => scheduler.submit(frame),
            None if self.stopped => SubmitOutcome::Stopped,
            None => SubmitOutcome::Paused,
        }
    }

    /// Block until in-flight frames finish or `timeout` passes
    pub fn wait_idle(&self, timeout: std::time::Duration) -> bool {
        self.scheduler
            .as_ref()
            .is_none_or(|scheduler| scheduler.wait_idle(timeout))
    }

    /// Frame counters of the current session
    pub fn stats(&self) -> SchedulerStats {
        self.scheduler
            .as_ref()
            .map(Scheduler::stats)
            .unwrap_or_default()
    }

    /// Live tracks
    pub fn tracks(&self) -> Vec<TrackedDetection> {
        self.tracker.snapshot()
    }

    /// Register a callback for every processed frame
    pub fn on_processed<F>(&self, callback: F) -> CallbackId
    where
        F: Fn(&ScanResult) + Send + Sync + 'static,
    {
        self.emitter.on_processed(callback)
    }

    /// Register a callback for confirmed detections
    pub fn on_detected<F>(&self, callback: F) -> CallbackId
    where
        F: Fn(&ScanResult) + Send + Sync + 'static,
    {
        self.emitter.on_detected(callback)
    }

    /// Remove a processed callback
    pub fn off_processed(&self, id: CallbackId) -> bool {
        self.emitter.off_processed(id)
    }

    /// Remove a detected callback
    pub fn off_detected(&self, id: CallbackId) -> bool {
        self.emitter.off_detected(id)
    }
}

impl std::fmt::Debug for BarcodeScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BarcodeScanner")
            .field("readers", &self.config.decoder.readers)
            .field("tracking", &self.tracker.is_enabled())
            .field("scheduler", &self.scheduler)
            .field("stopped", &self.stopped)
            .finish()
    }
}
