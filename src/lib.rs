//! rust_barcode - real-time 1-D barcode locating and decoding
//!
//! Frames are converted to luminance, searched for patches of parallel
//! bars, and each candidate box is sampled with scanlines that are decoded
//! as Code 128, EAN-13/8, UPC-A or Code 39. A worker pool and a tracker turn
//! this into a streaming scanner.
//!
//! ```
//! use rust_barcode::synth::{Placement, Symbology, render};
//!
//! let frame = render(Symbology::Code128, "123456", &Placement::centered(640, 480, 4)).unwrap();
//! let result = rust_barcode::detect_frame(&frame).unwrap();
//! assert_eq!(result.code, "123456");
//! ```

#![warn(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

/// Scanner configuration (serde)
pub mod config;
/// Visualization hooks
pub mod debug;
/// Symbology decoders and the reader registry
pub mod decoder;
/// Candidate box search (patches, skeletons, clustering)
pub mod detector;
/// Processed/detected result callbacks
pub mod emitter;
/// Error types
pub mod error;
/// Core data structures (frames, boxes, scanlines, results)
pub mod models;
/// Single-frame locate-and-decode
pub mod pipeline;
/// Frame normalization
pub mod preprocess;
/// Scanline sampling and thresholding
pub mod sampler;
/// Streaming lifecycle
pub mod scanner;
/// Worker pool
pub mod scheduler;
/// Synthetic barcode rendering
pub mod synth;
/// Image loading and logging setup for binaries
pub mod tools;
/// Multi-frame result tracking
pub mod tracker;
/// Utility functions (grayscale, binarization, geometry)
pub mod utils;

pub use config::ScannerConfig;
pub use decoder::{DecoderSet, ReaderRegistry, SymbologyDecoder};
pub use error::{ConfigError, DecodeError, ScanError, ScanFailure};
pub use models::{
    BarPattern, CandidateBox, CodeResult, DecodedCode, Direction, Frame, PixelFormat, Point,
    ScanResult,
};
pub use pipeline::{FrameProcessor, Pipeline};
pub use scanner::{BarcodeScanner, decode_single};
pub use scheduler::{SchedulerStats, SubmitOutcome};

/// Every built-in reader, in the order [`Detector::new`] tries them
pub const ALL_READERS: [&str; 5] = [
    "code_128_reader",
    "ean_reader",
    "ean_8_reader",
    "upc_reader",
    "code_39_reader",
];

/// Decode the first barcode found in an RGB image with every built-in reader
///
/// # Arguments
/// * `image` - Raw RGB bytes (3 bytes per pixel)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
pub fn detect(image: &[u8], width: usize, height: usize) -> Option<CodeResult> {
    Detector::new()
        .detect(&Frame::rgb(width, height, image.to_vec()))
        .code_result
}

/// Decode the first barcode found in a grayscale image (1 byte per pixel)
pub fn detect_from_grayscale(image: &[u8], width: usize, height: usize) -> Option<CodeResult> {
    Detector::new()
        .detect(&Frame::gray(width, height, image.to_vec()))
        .code_result
}

/// Decode the first barcode in an already wrapped frame
pub fn detect_frame(frame: &Frame) -> Option<CodeResult> {
    Detector::new().detect(frame).code_result
}

/// Reusable single-frame detector
#[derive(Debug)]
pub struct Detector {
    pipeline: Pipeline,
}

impl Detector {
    /// Detector with default settings and every built-in reader
    pub fn new() -> Self {
        let mut config = ScannerConfig::default();
        config.decoder.readers = ALL_READERS.iter().map(|r| r.to_string()).collect();
        let decoders = ReaderRegistry::with_defaults()
            .resolve(&ALL_READERS)
            .unwrap_or_default();
        Self {
            pipeline: Pipeline::new(&config, decoders),
        }
    }

    /// Detector for a specific configuration
    pub fn with_config(config: &ScannerConfig) -> Result<Self, ScanError> {
        Ok(Self {
            pipeline: Pipeline::from_config(config)?,
        })
    }

    /// Run the full pipeline on one frame
    pub fn detect(&self, frame: &Frame) -> ScanResult {
        self.pipeline.process(0, frame)
    }
}

impl Default for Detector {
    fn default() -> Self {
        Self::new()
    }
}
