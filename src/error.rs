//! Error taxonomy.
//!
//! Only configuration and lifecycle misuse surface as `Err` to callers.
//! Per-frame failures travel inside [`crate::ScanResult`] as a
//! [`ScanFailure`], next to successful results.

use serde::Serialize;
use thiserror::Error;

/// Errors returned by scanner construction and lifecycle calls.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The input raster is malformed (zero area, short buffer, bad stride).
    #[error("invalid frame: {reason}")]
    InvalidFrame {
        /// What is wrong with the frame
        reason: String,
    },

    /// Configuration rejected by validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A reader name with no registered decoder.
    #[error("unknown reader: {0}")]
    UnknownReader(String),

    /// A reader name registered twice.
    #[error("reader already registered: {0}")]
    DuplicateReader(String),

    /// The operation is not allowed while the scheduler runs.
    #[error("scanner is running; stop or pause it first")]
    AlreadyRunning,

    /// `start` was called after `stop`.
    #[error("scanner has been stopped")]
    Stopped,

    /// Failed to read or decode an image file.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration validation and parsing errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// `numOfWorkers` must be at least 1.
    #[error("worker count must be greater than 0")]
    InvalidWorkerCount,

    /// No reader enabled.
    #[error("at least one reader must be enabled")]
    EmptyReaderList,

    /// Tracking thresholds out of range.
    #[error("invalid tracking options: {message}")]
    InvalidTracking {
        /// Which threshold is out of range
        message: String,
    },

    /// A numeric option out of range.
    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        /// Configuration key
        field: &'static str,
        /// Why the value was rejected
        message: String,
    },

    /// JSON parse failure.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Why a bar pattern did not decode under one symbology.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DecodeError {
    /// No start pattern (or start guard) in the runs.
    #[error("no start pattern found")]
    NoStartPattern,

    /// Input exhausted before a stop pattern was found.
    #[error("no stop pattern found")]
    NoStopPattern,

    /// Every symbol matched but the check value disagrees.
    #[error("checksum mismatch: expected {expected}, found {actual}")]
    ChecksumMismatch {
        /// Check value computed from the data
        expected: u32,
        /// Check value read from the symbol
        actual: u32,
    },

    /// A symbol group matched no codeword closely enough.
    #[error("invalid code at run {position}")]
    InvalidCode {
        /// Index of the first run of the unmatched symbol
        position: usize,
    },

    /// Not enough runs for even the shortest symbol.
    #[error("bar pattern too short")]
    TooShort,
}

impl DecodeError {
    /// Structural failures justify a reverse reading; a checksum mismatch does not.
    pub fn is_structural(&self) -> bool {
        !matches!(self, DecodeError::ChecksumMismatch { .. })
    }
}

/// Per-frame failure recorded in a result record.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum ScanFailure {
    /// The frame itself was unusable.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// The locator produced no candidate; a legitimate empty result.
    #[error("no candidate region found")]
    NoCandidate,

    /// Candidates were sampled but nothing decoded; holds the last decoder error.
    #[error("decode failed: {0}")]
    Decode(DecodeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_is_not_structural() {
        assert!(
            !DecodeError::ChecksumMismatch {
                expected: 1,
                actual: 2
            }
            .is_structural()
        );
        assert!(DecodeError::NoStartPattern.is_structural());
        assert!(DecodeError::InvalidCode { position: 3 }.is_structural());
    }

    #[test]
    fn test_display() {
        let err = ScanError::UnknownReader("foo_reader".into());
        assert_eq!(err.to_string(), "unknown reader: foo_reader");
        let err: ScanError = ConfigError::InvalidWorkerCount.into();
        assert_eq!(err.to_string(), "worker count must be greater than 0");
    }
}
