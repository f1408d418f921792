//! Symbology decoders
//!
//! Every decoder turns a [`BarPattern`] into a [`CodeResult`] or a
//! [`DecodeError`]. Widths are compared after normalizing a symbol's runs to
//! its module count, so the same tables work at any scale.
//!
//! - Code 128 (sets A/B/C, SHIFT, FNC1, mod-103 check)
//! - EAN-13, EAN-8 and UPC-A (mod-10 check, parity-encoded first digit)
//! - Code 39 (optional mod-43 check)

/// Code 128 decoder and encoder
pub mod code128;
/// Code 39 decoder and encoder
pub mod code39;
/// EAN-13, EAN-8 and UPC-A decoders and encoders
pub mod ean;
/// Reader name registry and ordered decoder sets
pub mod registry;

pub use registry::{DecoderSet, ReaderRegistry};

use crate::error::DecodeError;
use crate::models::{BarPattern, CodeResult};

/// A decoder for one symbology.
///
/// Implementors only read forward; [`SymbologyDecoder::decode`] retries on the
/// reversed runs when the forward read fails structurally.
pub trait SymbologyDecoder: Send + Sync {
    /// Format identifier reported in results, e.g. `code_128`
    fn format(&self) -> &'static str;

    /// Whether a structurally failed read should be retried from the other end
    fn supports_reverse(&self) -> bool {
        true
    }

    /// Decode reading runs in order
    fn decode_forward(&self, pattern: &BarPattern) -> Result<CodeResult, DecodeError>;

    /// Decode in either direction.
    ///
    /// A checksum mismatch on the forward read is final. When both directions
    /// fail, the more specific of the two errors is returned.
    fn decode(&self, pattern: &BarPattern) -> Result<CodeResult, DecodeError> {
        let forward = match self.decode_forward(pattern) {
            Ok(result) => return Ok(result),
            Err(err) => err,
        };
        if !forward.is_structural() || !self.supports_reverse() {
            return Err(forward);
        }
        match self.decode_forward(&pattern.reversed()) {
            Ok(mut result) => {
                result.remap_reversed(pattern.total_len());
                Ok(result)
            }
            Err(reverse) if error_rank(&reverse) > error_rank(&forward) => Err(reverse),
            Err(_) => Err(forward),
        }
    }
}

/// How far a read got before failing; higher means closer to a valid symbol.
pub(crate) fn error_rank(err: &DecodeError) -> u8 {
    match err {
        DecodeError::TooShort => 0,
        DecodeError::NoStartPattern => 1,
        DecodeError::InvalidCode { .. } => 2,
        DecodeError::NoStopPattern => 3,
        DecodeError::ChecksumMismatch { .. } => 4,
    }
}

/// Mean absolute deviation, in modules, between observed runs and a pattern.
///
/// The observed widths are scaled so their sum equals the pattern's module
/// count. Returns infinity for mismatched lengths or empty input.
pub(crate) fn pattern_error(widths: &[u32], expected: &[u8]) -> f32 {
    let observed: u32 = widths.iter().sum();
    let modules: u32 = expected.iter().map(|&e| e as u32).sum();
    if widths.len() != expected.len() || observed == 0 || modules == 0 {
        return f32::INFINITY;
    }
    let scale = observed as f32 / modules as f32;
    let total: f32 = widths
        .iter()
        .zip(expected)
        .map(|(&w, &e)| (w as f32 / scale - e as f32).abs())
        .sum();
    total / widths.len() as f32
}

/// Closest codebook entry and its error
pub(crate) fn best_match<const N: usize>(widths: &[u32], codebook: &[[u8; N]]) -> (usize, f32) {
    let mut best = (0, f32::INFINITY);
    for (index, entry) in codebook.iter().enumerate() {
        let err = pattern_error(widths, entry);
        if err < best.1 {
            best = (index, err);
        }
    }
    best
}

/// Whether the space before run `index` is at least `min_modules` wide.
///
/// A run at index 0 has no visible space before it, so a symbol cut off at
/// the start of the scanline never has a quiet zone.
pub(crate) fn has_quiet_zone(
    pattern: &BarPattern,
    index: usize,
    module: f32,
    min_modules: f32,
) -> bool {
    if index == 0 {
        return false;
    }
    !pattern.is_bar(index - 1) && pattern.width(index - 1) as f32 >= module * min_modules
}

/// Lay encoded module widths out as runs with quiet zones on both sides.
///
/// `modules` starts with a bar. Useful for synthesizing test input.
pub fn modules_to_pattern(modules: &[u8], unit: u32, quiet_modules: u32) -> BarPattern {
    let mut widths = Vec::with_capacity(modules.len() + 2);
    widths.push(quiet_modules * unit);
    widths.extend(modules.iter().map(|&m| m as u32 * unit));
    widths.push(quiet_modules * unit);
    BarPattern::from_widths(false, widths)
}
