//! Per-patch texture analysis.
//!
//! Each patch gets a contrast score, a gradient orientation histogram, and a
//! skeleton stroke count. A patch is "bar-like" when its contrast is high,
//! its gradients agree on one axis, and its dark pixels thin down to several
//! separate strokes.

use std::f32::consts::PI;

use crate::config::LocatorConfig;
use crate::detector::connected_components::label_components;
use crate::detector::skeleton::skeletonize;
use crate::models::{BitMatrix, GrayRaster};
use crate::utils::geometry::axial_mean;

/// Orientation histogram resolution over [0, pi)
pub const ORIENTATION_BINS: usize = 18;

/// Fraction of gradient energy that must fall in the peak bin and its neighbours
pub const MIN_COHERENCE: f32 = 0.6;

/// Minimum skeleton strokes for a patch to count as bar-like
pub const MIN_STROKES: usize = 2;

/// Sobel magnitudes below this are treated as flat
const MIN_GRADIENT: f32 = 16.0;

/// Grid geometry for one locator pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchGrid {
    /// Patch edge in pixels
    pub size: usize,
    /// Patches per row
    pub cols: usize,
    /// Patch rows
    pub rows: usize,
}

impl PatchGrid {
    /// Lay out square patches over a raster, coarsening until at most `max_patches` remain
    pub fn new(width: usize, height: usize, config: &LocatorConfig) -> Self {
        let mut size = config.patch_size.pixels_for(width, height);
        while (width / size) * (height / size) > config.max_patches {
            size += size / 2;
        }
        Self {
            size,
            cols: width / size,
            rows: height / size,
        }
    }

    /// Total patch count
    pub fn len(&self) -> usize {
        self.cols * self.rows
    }

    /// True when the raster is smaller than one patch
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Top-left pixel of patch `index`
    pub fn origin(&self, index: usize) -> (usize, usize) {
        ((index % self.cols) * self.size, (index / self.cols) * self.size)
    }
}

/// Result of analysing one patch
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    /// Top-left x
    pub x: usize,
    /// Top-left y
    pub y: usize,
    /// Max minus min intensity
    pub contrast: u8,
    /// Dominant gradient axis in [0, pi), i.e. the reading direction
    pub orientation: f32,
    /// Share of gradient energy around the dominant axis
    pub coherence: f32,
    /// Skeleton strokes of the dark mask
    pub strokes: usize,
    /// Passed every test
    pub accepted: bool,
}

/// Analyse the patch at `(x0, y0)` of edge `size`
pub fn analyze_patch(
    raster: &GrayRaster,
    x0: usize,
    y0: usize,
    size: usize,
    min_contrast: u8,
) -> Patch {
    let mut patch = Patch {
        x: x0,
        y: y0,
        contrast: 0,
        orientation: 0.0,
        coherence: 0.0,
        strokes: 0,
        accepted: false,
    };

    let (mut lo, mut hi) = (u8::MAX, u8::MIN);
    for y in y0..y0 + size {
        for &v in &raster.row(y)[x0..x0 + size] {
            lo = lo.min(v);
            hi = hi.max(v);
        }
    }
    patch.contrast = hi - lo;
    if patch.contrast < min_contrast {
        return patch;
    }

    let (orientation, coherence) = dominant_orientation(raster, x0, y0, size);
    patch.orientation = orientation;
    patch.coherence = coherence;
    if coherence < MIN_COHERENCE {
        return patch;
    }

    let threshold = ((lo as u16 + hi as u16) / 2) as u8;
    let mask = BitMatrix::from_fn(size, size, |x, y| raster.get(x0 + x, y0 + y) < threshold);
    patch.strokes = count_strokes(&mask, size / 3);
    patch.accepted = patch.strokes >= MIN_STROKES;
    patch
}

/// Gradient orientation histogram: returns (axial mean of the peak, coherence)
fn dominant_orientation(raster: &GrayRaster, x0: usize, y0: usize, size: usize) -> (f32, f32) {
    let mut histogram = [0.0f32; ORIENTATION_BINS];
    let mut angles = Vec::with_capacity(size * size);
    let mut weights = Vec::with_capacity(size * size);
    let mut total = 0.0f32;

    let px = |x: isize, y: isize| raster.get(x.max(0) as usize, y.max(0) as usize) as f32;
    for y in y0..y0 + size {
        for x in x0..x0 + size {
            let (xi, yi) = (x as isize, y as isize);
            let gx = (px(xi + 1, yi - 1) + 2.0 * px(xi + 1, yi) + px(xi + 1, yi + 1))
                - (px(xi - 1, yi - 1) + 2.0 * px(xi - 1, yi) + px(xi - 1, yi + 1));
            let gy = (px(xi - 1, yi + 1) + 2.0 * px(xi, yi + 1) + px(xi + 1, yi + 1))
                - (px(xi - 1, yi - 1) + 2.0 * px(xi, yi - 1) + px(xi + 1, yi - 1));
            let magnitude = (gx * gx + gy * gy).sqrt();
            if magnitude < MIN_GRADIENT {
                continue;
            }
            let angle = gy.atan2(gx).rem_euclid(PI);
            let bin = ((angle / PI * ORIENTATION_BINS as f32) as usize).min(ORIENTATION_BINS - 1);
            histogram[bin] += magnitude;
            total += magnitude;
            angles.push(angle);
            weights.push(magnitude);
        }
    }
    if total <= 0.0 {
        return (0.0, 0.0);
    }

    let peak = (0..ORIENTATION_BINS)
        .max_by(|&a, &b| histogram[a].total_cmp(&histogram[b]))
        .unwrap_or(0);
    let near_peak = |bin: usize| {
        let d = bin.abs_diff(peak);
        d <= 1 || d == ORIENTATION_BINS - 1
    };
    let peak_mass: f32 = (0..ORIENTATION_BINS)
        .filter(|&b| near_peak(b))
        .map(|b| histogram[b])
        .sum();

    // refine the angle from the samples that voted for the peak
    let mut peak_angles = Vec::new();
    let mut peak_weights = Vec::new();
    for (&a, &w) in angles.iter().zip(&weights) {
        let bin = ((a / PI * ORIENTATION_BINS as f32) as usize).min(ORIENTATION_BINS - 1);
        if near_peak(bin) {
            peak_angles.push(a);
            peak_weights.push(w);
        }
    }
    let (orientation, _) = axial_mean(&peak_angles, &peak_weights);
    (orientation, peak_mass / total)
}

/// Skeletonize the mask and count strokes of at least `min_len` pixels
pub fn count_strokes(mask: &BitMatrix, min_len: usize) -> usize {
    let skeleton = skeletonize(mask);
    let (labels, count) = label_components(&skeleton);
    if count == 0 {
        return 0;
    }
    let mut sizes = vec![0usize; count + 1];
    for &l in &labels {
        sizes[l as usize] += 1;
    }
    sizes[1..].iter().filter(|&&s| s >= min_len.max(2)).count()
}

/// Analyse every patch of the grid (row-parallel)
pub fn analyze_grid(raster: &GrayRaster, grid: &PatchGrid, config: &LocatorConfig) -> Vec<Patch> {
    use rayon::prelude::*;

    (0..grid.len())
        .into_par_iter()
        .map(|i| {
            let (x, y) = grid.origin(i);
            analyze_patch(raster, x, y, grid.size, config.min_contrast)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stripes(width: usize, height: usize, period: usize, vertical: bool) -> GrayRaster {
        let mut data = vec![0u8; width * height];
        for y in 0..height {
            for x in 0..width {
                let t = if vertical { x } else { y };
                data[y * width + x] = if (t / period) % 2 == 0 { 20 } else { 230 };
            }
        }
        GrayRaster::new(width, height, data)
    }

    #[test]
    fn test_vertical_bars_accepted_horizontal_orientation() {
        let raster = stripes(64, 64, 4, true);
        let patch = analyze_patch(&raster, 16, 16, 32, 40);
        assert!(patch.accepted, "{:?}", patch);
        // gradient runs along x
        assert!(crate::utils::geometry::axial_difference(patch.orientation, 0.0) < 0.1);
        assert!(patch.strokes >= 2);
    }

    #[test]
    fn test_horizontal_bars_vertical_orientation() {
        let raster = stripes(64, 64, 4, false);
        let patch = analyze_patch(&raster, 16, 16, 32, 40);
        assert!(patch.accepted);
        assert!(crate::utils::geometry::axial_difference(patch.orientation, PI / 2.0) < 0.1);
    }

    #[test]
    fn test_flat_patch_rejected() {
        let raster = GrayRaster::new(32, 32, vec![128; 32 * 32]);
        let patch = analyze_patch(&raster, 0, 0, 32, 40);
        assert!(!patch.accepted);
        assert_eq!(patch.contrast, 0);
    }

    #[test]
    fn test_single_edge_rejected() {
        // left half dark, right half light: coherent but only one stroke
        let data: Vec<u8> = (0..64 * 64)
            .map(|i| if i % 64 < 32 { 20 } else { 230 })
            .collect();
        let raster = GrayRaster::new(64, 64, data);
        let patch = analyze_patch(&raster, 16, 16, 32, 40);
        assert!(!patch.accepted);
    }

    #[test]
    fn test_grid_respects_cap() {
        let mut config = LocatorConfig::default();
        config.patch_size = crate::config::PatchSize::XSmall;
        config.max_patches = 100;
        let grid = PatchGrid::new(640, 480, &config);
        assert!(grid.len() <= 100);
        assert!(!grid.is_empty());
    }
}
