use serde::Serialize;

use super::{CandidateBox, Point};
use crate::error::ScanFailure;

/// Which way the decoder traversed the bar pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Runs read in scanline order
    Forward,
    /// Runs read from the far end
    Reverse,
}

impl Direction {
    /// 1 for forward, -1 for reverse
    pub fn sign(&self) -> i8 {
        match self {
            Direction::Forward => 1,
            Direction::Reverse => -1,
        }
    }
}

/// One matched codeword
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedCode {
    /// Codeword value in the symbology's codebook
    pub code: u16,
    /// First sample index (scanline coordinates)
    pub start: usize,
    /// One past the last sample index
    pub end: usize,
    /// Mean normalized width deviation of the match (0 = perfect)
    pub error: f32,
}

/// Successful decode of one bar pattern
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeResult {
    /// Assembled symbol text
    pub code: String,
    /// Symbology identifier, e.g. `code_128`
    pub format: String,
    /// Code set active at the start (Code 128 only)
    pub codeset: Option<u8>,
    /// First sample of the start pattern
    pub start: usize,
    /// One past the last sample of the stop pattern
    pub end: usize,
    /// Start pattern match
    pub start_info: DecodedCode,
    /// Every codeword between start and stop, check value included
    pub decoded_codes: Vec<DecodedCode>,
    /// Stop pattern match
    pub end_info: DecodedCode,
    /// Reading direction
    pub direction: Direction,
    /// Whether a check value was present and verified
    pub checksum_valid: bool,
}

impl CodeResult {
    /// Mean codeword error, start and stop included
    pub fn mean_error(&self) -> f32 {
        let n = self.decoded_codes.len() + 2;
        let total: f32 = self.decoded_codes.iter().map(|c| c.error).sum::<f32>()
            + self.start_info.error
            + self.end_info.error;
        total / n as f32
    }

    /// Map sample indices recorded against a reversed pattern back to scanline order
    pub(crate) fn remap_reversed(&mut self, total_len: usize) {
        let flip = |c: &mut DecodedCode| {
            let (s, e) = (c.start, c.end);
            c.start = total_len - e;
            c.end = total_len - s;
        };
        flip(&mut self.start_info);
        flip(&mut self.end_info);
        self.decoded_codes.iter_mut().for_each(flip);
        let (s, e) = (self.start, self.end);
        self.start = total_len - e;
        self.end = total_len - s;
        self.direction = Direction::Reverse;
    }
}

/// Result record for one processed frame.
///
/// Failures and successes share this shape; `code_result` is `Some` only
/// on success.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    /// Sequence number assigned at submission
    pub frame_id: u64,
    /// Decoded symbol, if any
    pub code_result: Option<CodeResult>,
    /// Why nothing decoded
    pub failure: Option<ScanFailure>,
    /// Endpoints of the scanline that decoded (frame coordinates)
    pub line: Option<[Point; 2]>,
    /// Reading direction angle of the decoded box, radians
    pub angle: Option<f32>,
    /// Run widths of the decoded bar pattern
    pub pattern: Vec<u32>,
    /// Box that decoded (frame coordinates)
    #[serde(rename = "box")]
    pub bbox: Option<[Point; 4]>,
    /// Every candidate box considered (frame coordinates)
    pub boxes: Vec<[Point; 4]>,
}

impl ScanResult {
    /// Empty failure record
    pub fn failed(frame_id: u64, failure: ScanFailure) -> Self {
        Self {
            frame_id,
            code_result: None,
            failure: Some(failure),
            line: None,
            angle: None,
            pattern: Vec::new(),
            bbox: None,
            boxes: Vec::new(),
        }
    }

    /// Whether a symbol was decoded
    pub fn is_success(&self) -> bool {
        self.code_result.is_some()
    }

    /// Decoded text, if any
    pub fn code(&self) -> Option<&str> {
        self.code_result.as_ref().map(|c| c.code.as_str())
    }

    /// Attach the boxes the locator considered
    pub(crate) fn with_boxes(mut self, boxes: &[CandidateBox]) -> Self {
        self.boxes = boxes.iter().map(|b| b.corners).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(start: usize, end: usize) -> DecodedCode {
        DecodedCode {
            code: 1,
            start,
            end,
            error: 0.1,
        }
    }

    #[test]
    fn test_remap_reversed() {
        let mut r = CodeResult {
            code: "x".into(),
            format: "code_128".into(),
            codeset: None,
            start: 10,
            end: 90,
            start_info: code(10, 21),
            decoded_codes: vec![code(21, 32)],
            end_info: code(77, 90),
            direction: Direction::Forward,
            checksum_valid: true,
        };
        r.remap_reversed(100);
        assert_eq!((r.start, r.end), (10, 90));
        assert_eq!((r.start_info.start, r.start_info.end), (79, 90));
        assert_eq!((r.end_info.start, r.end_info.end), (10, 23));
        assert_eq!(r.direction, Direction::Reverse);
        assert!((r.mean_error() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_failed_record() {
        let r = ScanResult::failed(7, ScanFailure::NoCandidate);
        assert!(!r.is_success());
        assert_eq!(r.code(), None);
        assert_eq!(r.frame_id, 7);
    }
}
