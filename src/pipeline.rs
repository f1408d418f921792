//! Single-frame locate-and-decode.
//!
//! prepare -> locate (or a fixed middle band) -> per candidate, per
//! scanline: threshold -> decoders in configured order. The first decoded
//! scanline ends the frame. Every outcome, failures included, comes back as
//! a [`ScanResult`].

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::config::{LocatorConfig, ScannerConfig};
use crate::debug::DebugSink;
use crate::decoder::{DecoderSet, ReaderRegistry, error_rank};
use crate::detector::locate_with_debug;
use crate::error::{DecodeError, ScanError, ScanFailure};
use crate::models::{CandidateBox, Frame, ScanResult};
use crate::preprocess::{PreparedFrame, prepare_frame};
use crate::sampler::{Extension, sample, to_bar_pattern};

/// Share of the frame height covered by the band scanned when locating is off
const MIDDLE_BAND: f32 = 0.2;

/// Anything that turns one frame into one result record.
///
/// [`Pipeline`] is the real implementation; the scheduler only sees this
/// trait.
pub trait FrameProcessor: Send + Sync {
    /// Process one frame end to end
    fn process(&self, frame_id: u64, frame: &Frame) -> ScanResult;
}

impl<F> FrameProcessor for F
where
    F: Fn(u64, &Frame) -> ScanResult + Send + Sync,
{
    fn process(&self, frame_id: u64, frame: &Frame) -> ScanResult {
        self(frame_id, frame)
    }
}

/// Configured locate-and-decode pipeline
pub struct Pipeline {
    locate: bool,
    half_sample: bool,
    scanlines: usize,
    locator: LocatorConfig,
    decoders: DecoderSet,
    sink: Option<Arc<dyn DebugSink>>,
}

impl Pipeline {
    /// Pipeline over an already resolved decoder set
    pub fn new(config: &ScannerConfig, decoders: DecoderSet) -> Self {
        Self {
            locate: config.locate,
            half_sample: config.locator.half_sample,
            scanlines: config.decoder.scanlines,
            locator: config.locator.clone(),
            decoders,
            sink: None,
        }
    }

    /// Validate `config` and resolve its readers against the built-in registry
    pub fn from_config(config: &ScannerConfig) -> Result<Self, ScanError> {
        config.validate()?;
        let decoders = ReaderRegistry::with_defaults().resolve(&config.decoder.readers)?;
        Ok(Self::new(config, decoders))
    }

    /// Report intermediate geometry to `sink`
    pub fn with_debug_sink(mut self, sink: Arc<dyn DebugSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Enabled decoders in trial order
    pub fn decoders(&self) -> &DecoderSet {
        &self.decoders
    }

    /// Candidate boxes in frame coordinates
    fn candidates(&self, prepared: &PreparedFrame) -> Vec<CandidateBox> {
        if self.locate {
            let scale = prepared.locator_scale();
            return locate_with_debug(prepared.locator(), &self.locator, self.sink.as_deref())
                .iter()
                .map(|c| c.scaled(scale))
                .collect();
        }
        let w = prepared.full.width() as f32;
        let h = prepared.full.height() as f32;
        let half_band = h * MIDDLE_BAND / 2.0;
        vec![CandidateBox::from_rect(
            0.0,
            h / 2.0 - half_band,
            w - 1.0,
            h / 2.0 + half_band,
        )]
    }

    fn extension(&self) -> Extension {
        if self.locate {
            Extension::default()
        } else {
            Extension {
                relative: 0.0,
                absolute: 0.0,
            }
        }
    }

    /// Locate and decode one frame.
    ///
    /// Locating may run on a half-sampled raster, but scanlines are always
    /// read from the full-resolution one so narrow modules survive. Geometry
    /// in the result is in frame coordinates.
    pub fn process(&self, frame_id: u64, frame: &Frame) -> ScanResult {
        let prepared = match prepare_frame(frame, self.half_sample) {
            Ok(prepared) => prepared,
            Err(err) => {
                warn!(frame_id, error = %err, "dropping invalid frame");
                let reason = match err {
                    ScanError::InvalidFrame { reason } => reason,
                    other => other.to_string(),
                };
                return ScanResult::failed(frame_id, ScanFailure::InvalidFrame(reason));
            }
        };

        let candidates = self.candidates(&prepared);
        if candidates.is_empty() {
            debug!(frame_id, "no candidate");
            return ScanResult::failed(frame_id, ScanFailure::NoCandidate);
        }

        let mut failure: Option<DecodeError> = None;
        let mut attempts = 0usize;
        for candidate in &candidates {
            for line in sample(&prepared.full, candidate, self.scanlines, self.extension()) {
                if let Some(sink) = &self.sink {
                    sink.scanline(&line);
                }
                attempts += 1;
                let pattern = to_bar_pattern(&line);
                match self.decoders.decode(&pattern) {
                    Ok(code_result) => {
                        debug!(
                            frame_id,
                            code = %code_result.code,
                            format = %code_result.format,
                            direction = ?code_result.direction,
                            attempts,
                            "decoded"
                        );
                        return ScanResult {
                            frame_id,
                            code_result: Some(code_result),
                            failure: None,
                            line: Some([line.start, line.end]),
                            angle: Some(candidate.angle),
                            pattern: pattern.widths().to_vec(),
                            bbox: Some(candidate.corners),
                            boxes: Vec::new(),
                        }
                        .with_boxes(&candidates);
                    }
                    Err(err) => {
                        trace!(frame_id, runs = pattern.len(), error = %err, "scanline rejected");
                        if failure.as_ref().is_none_or(|f| error_rank(&err) > error_rank(f)) {
                            failure = Some(err);
                        }
                    }
                }
            }
        }

        let err = failure.unwrap_or(DecodeError::TooShort);
        debug!(frame_id, candidates = candidates.len(), attempts, error = %err, "nothing decoded");
        ScanResult::failed(frame_id, ScanFailure::Decode(err)).with_boxes(&candidates)
    }
}

impl FrameProcessor for Pipeline {
    fn process(&self, frame_id: u64, frame: &Frame) -> ScanResult {
        Pipeline::process(self, frame_id, frame)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("locate", &self.locate)
            .field("half_sample", &self.half_sample)
            .field("scanlines", &self.scanlines)
            .field("decoders", &self.decoders)
            .field("debug_sink", &self.sink.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::{Placement, Symbology, render};

    fn config(readers: &[&str]) -> ScannerConfig {
        let mut config = ScannerConfig::default();
        config.decoder.readers = readers.iter().map(|r| r.to_string()).collect();
        config
    }

    #[test]
    fn test_invalid_frame_is_a_result() {
        let pipeline = Pipeline::from_config(&config(&["code_128_reader"])).unwrap();
        let result = pipeline.process(3, &Frame::gray(0, 0, Vec::new()));
        assert_eq!(result.frame_id, 3);
        assert!(matches!(result.failure, Some(ScanFailure::InvalidFrame(_))));
    }

    #[test]
    fn test_blank_frame_has_no_candidate() {
        let pipeline = Pipeline::from_config(&config(&["code_128_reader"])).unwrap();
        let result = pipeline.process(1, &Frame::gray(320, 240, vec![200; 320 * 240]));
        assert_eq!(result.failure, Some(ScanFailure::NoCandidate));
        assert!(result.boxes.is_empty());
    }

    #[test]
    fn test_middle_band_without_locator() {
        let mut config = config(&["ean_reader"]);
        config.locate = false;
        config.locator.half_sample = false;
        let frame = render(Symbology::Ean13, "400638133393", &Placement::centered(400, 200, 2)).unwrap();
        let result = Pipeline::from_config(&config).unwrap().process(5, &frame);
        assert_eq!(result.code(), Some("4006381333931"));
        assert_eq!(result.boxes.len(), 1);
    }

    #[test]
    fn test_half_sampled_frame_decodes_at_full_resolution() {
        // 2 px modules become 1 px after half-sampling; scanlines must not see that raster
        let mut config = config(&["ean_reader"]);
        config.locate = false;
        assert!(config.locator.half_sample);
        let frame = render(Symbology::Ean13, "400638133393", &Placement::centered(400, 200, 2)).unwrap();
        let result = Pipeline::from_config(&config).unwrap().process(6, &frame);
        assert_eq!(result.code(), Some("4006381333931"));
        let [start, end] = result.line.unwrap();
        assert!(start.x.min(end.x) < 10.0 && start.x.max(end.x) > 389.0);
        assert!((start.y - 100.0).abs() < 21.0);
    }

    #[test]
    fn test_located_geometry_is_in_frame_coordinates() {
        let frame = render(Symbology::Code128, "123456", &Placement::centered(640, 480, 4)).unwrap();
        let result = Pipeline::from_config(&config(&["code_128_reader"])).unwrap().process(7, &frame);
        assert_eq!(result.code(), Some("123456"));
        let bbox = CandidateBox::new(result.bbox.unwrap(), 1.0, 0.0);
        let c = bbox.center();
        assert!((c.x - 320.0).abs() < 40.0 && (c.y - 240.0).abs() < 40.0, "center {:?}", c);
    }

    #[test]
    fn test_unknown_reader_rejected() {
        let err = Pipeline::from_config(&config(&["aztec_reader"])).unwrap_err();
        assert!(matches!(err, ScanError::UnknownReader(_)));
    }
}
