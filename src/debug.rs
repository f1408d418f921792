//! Visualization hooks.
//!
//! The pipeline reports intermediate geometry through an optional
//! [`DebugSink`]. With no sink installed nothing is collected.

use std::sync::OnceLock;

use tracing::debug;

use crate::models::{CandidateBox, Scanline};

static DEBUG_ENABLED: OnceLock<bool> = OnceLock::new();

/// `BARCODE_DEBUG` is set in the environment
pub fn debug_enabled() -> bool {
    *DEBUG_ENABLED.get_or_init(|| std::env::var("BARCODE_DEBUG").is_ok())
}

/// Receiver for intermediate locator and sampler output
pub trait DebugSink: Send + Sync {
    /// Cluster label per patch (row-major, 0 = not bar-like)
    fn patch_labels(&self, labels: &[u32], cols: usize, rows: usize, patch_size: usize) {
        let _ = (labels, cols, rows, patch_size);
    }

    /// Candidate boxes after overlap suppression, best first
    fn candidates(&self, boxes: &[CandidateBox]) {
        let _ = boxes;
    }

    /// A scanline about to be decoded
    fn scanline(&self, line: &Scanline) {
        let _ = line;
    }
}

/// Sink that logs everything at debug level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DebugSink for TracingSink {
    fn patch_labels(&self, labels: &[u32], cols: usize, rows: usize, patch_size: usize) {
        let labelled = labels.iter().filter(|&&l| l != 0).count();
        debug!(cols, rows, patch_size, labelled, "patch labels");
    }

    fn candidates(&self, boxes: &[CandidateBox]) {
        for (i, b) in boxes.iter().enumerate() {
            debug!(
                index = i,
                confidence = b.confidence,
                angle_deg = b.angle.to_degrees(),
                patches = b.patch_count,
                corners = ?b.corners,
                "candidate box"
            );
        }
    }

    fn scanline(&self, line: &Scanline) {
        debug!(start = ?line.start, end = ?line.end, samples = line.len(), "scanline");
    }
}
