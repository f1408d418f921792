//! Scanline extraction and bar/space thresholding.

use crate::models::{BarPattern, CandidateBox, GrayRaster, Point, Scanline};
use crate::utils::binarization::binarize_profile;

/// Boxes shorter than this (raster pixels) along the reading axis are degenerate
pub const MIN_BOX_LENGTH: f32 = 2.0;

/// Share of the box height spanned by the outermost scanlines
const SPREAD: f32 = 0.7;

/// Local contrast below which a profile window is treated as quiet zone
pub const PROFILE_MIN_CONTRAST: u8 = 24;

/// How far scanlines run past the box ends along the reading axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extension {
    /// Fraction of the box length added at each end
    pub relative: f32,
    /// Fixed pixels added at each end
    pub absolute: f32,
}

impl Default for Extension {
    fn default() -> Self {
        Self {
            relative: 0.2,
            absolute: 16.0,
        }
    }
}

/// Offsets across the box (as fractions of its height), centre first
fn line_offsets(count: usize) -> Vec<f32> {
    if count <= 1 {
        return vec![0.0];
    }
    let mut offsets: Vec<f32> = (0..count)
        .map(|i| -SPREAD / 2.0 + SPREAD * i as f32 / (count - 1) as f32)
        .collect();
    offsets.sort_by(|a, b| a.abs().total_cmp(&b.abs()));
    offsets
}

/// Sample `count` scanlines across `candidate`, perpendicular to its bars.
///
/// Returns an empty vector when the box is degenerate.
pub fn sample(
    raster: &GrayRaster,
    candidate: &CandidateBox,
    count: usize,
    extension: Extension,
) -> Vec<Scanline> {
    let length = candidate.length();
    if !length.is_finite() || length < MIN_BOX_LENGTH {
        return Vec::new();
    }
    let height = candidate.height();
    let center = candidate.center();
    let axis = candidate.axis();
    let normal = (-axis.1, axis.0);
    let half = length / 2.0 + length * extension.relative + extension.absolute;

    line_offsets(count)
        .into_iter()
        .map(|f| {
            let mid = center.offset_along(normal, f * height);
            let start = mid.offset_along(axis, -half);
            let end = mid.offset_along(axis, half);
            sample_segment(raster, start, end)
        })
        .collect()
}

/// Bilinear samples at unit spacing from `start` to `end` (inclusive)
pub fn sample_segment(raster: &GrayRaster, start: Point, end: Point) -> Scanline {
    let len = start.distance(&end);
    let n = (len.ceil() as usize).max(1) + 1;
    let samples = (0..n)
        .map(|i| {
            let t = i as f32 / (n - 1) as f32;
            let x = start.x + (end.x - start.x) * t;
            let y = start.y + (end.y - start.y) * t;
            raster.sample_bilinear(x, y).round().clamp(0.0, 255.0) as u8
        })
        .collect();
    Scanline {
        start,
        end,
        samples,
    }
}

/// Threshold a scanline into alternating bar/space runs
pub fn to_bar_pattern(line: &Scanline) -> BarPattern {
    BarPattern::from_binary(&binarize_profile(&line.samples, PROFILE_MIN_CONTRAST))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_centre_first() {
        assert_eq!(line_offsets(1), vec![0.0]);
        let o = line_offsets(3);
        assert_eq!(o[0], 0.0);
        assert!((o[1].abs() - 0.35).abs() < 1e-6);
        assert_eq!(o.len(), 3);
    }

    #[test]
    fn test_degenerate_box_gives_nothing() {
        let raster = GrayRaster::new(10, 10, vec![0; 100]);
        let b = CandidateBox::from_rect(5.0, 1.0, 5.5, 9.0);
        assert!(sample(&raster, &b, 3, Extension::default()).is_empty());
    }

    #[test]
    fn test_horizontal_scanline_reads_bars() {
        // 60x10 raster with bars 4px wide starting at x=20
        let mut data = vec![240u8; 60 * 10];
        for y in 0..10 {
            for x in 20..40 {
                if ((x - 20) / 4) % 2 == 0 {
                    data[y * 60 + x] = 10;
                }
            }
        }
        let raster = GrayRaster::new(60, 10, data);
        let b = CandidateBox::from_rect(20.0, 2.0, 40.0, 8.0);
        let lines = sample(
            &raster,
            &b,
            1,
            Extension {
                relative: 0.0,
                absolute: 10.0,
            },
        );
        assert_eq!(lines.len(), 1);
        let pattern = to_bar_pattern(&lines[0]);
        assert!(!pattern.starts_with_bar());
        // quiet, then 3 bars and 2 spaces of 4px, then quiet
        assert_eq!(&pattern.widths()[1..6], &[4, 4, 4, 4, 4]);
    }
}
