//! Candidate box search.
//!
//! Patches that look like bars are clustered with their neighbours when
//! their orientations agree. Each cluster is boxed by rotating its patch
//! corners into the cluster's own axis frame and taking the extent there,
//! which gives the tightest rectangle aligned with the bars.
//!
//! Wide spaces inside a symbol can leave a column of patches with a single
//! stroke, which splits one symbol into several clusters. Clusters that share
//! an axis, overlap across the bars, and sit close along the reading axis are
//! merged before boxing.

use std::f32::consts::PI;

use tracing::{debug, trace};

use crate::config::LocatorConfig;
use crate::debug::DebugSink;
use crate::detector::connected_components::{UnionFind, label_grid};
use crate::detector::patches::{Patch, PatchGrid, analyze_grid};
use crate::models::{CandidateBox, GrayRaster, Point};
use crate::utils::geometry::{axial_difference, axial_mean, overlap_fraction};

/// Clusters further apart than this many patch edges along the reading axis stay separate
const MERGE_GAP_PATCHES: f32 = 2.0;

/// Share of the shorter cross-bar extent two clusters must have in common to merge
const MERGE_MIN_SHARED: f32 = 0.5;

/// Locate candidate regions, best first
pub fn locate(raster: &GrayRaster, config: &LocatorConfig) -> Vec<CandidateBox> {
    locate_with_debug(raster, config, None)
}

/// [`locate`] that also reports patch labels and raw boxes to a debug sink
pub fn locate_with_debug(
    raster: &GrayRaster,
    config: &LocatorConfig,
    sink: Option<&dyn DebugSink>,
) -> Vec<CandidateBox> {
    let grid = PatchGrid::new(raster.width(), raster.height(), config);
    if grid.is_empty() {
        debug!(
            width = raster.width(),
            height = raster.height(),
            "raster smaller than one patch"
        );
        return Vec::new();
    }

    let patches = analyze_grid(raster, &grid, config);
    let active: Vec<bool> = patches.iter().map(|p| p.accepted).collect();
    let max_diff = config.max_angle_difference.to_radians();
    let (labels, label_count) = label_grid(grid.cols, grid.rows, &active, |a, b| {
        axial_difference(patches[a].orientation, patches[b].orientation) <= max_diff
    });

    if let Some(sink) = sink {
        sink.patch_labels(&labels, grid.cols, grid.rows, grid.size);
    }

    let mut members: Vec<Vec<usize>> = vec![Vec::new(); label_count];
    for (i, &l) in labels.iter().enumerate() {
        if l != 0 {
            members[l as usize - 1].push(i);
        }
    }
    let clusters = merge_collinear(&patches, members, grid.size, max_diff);

    let mut boxes: Vec<CandidateBox> = clusters
        .iter()
        .filter(|m| m.len() >= config.min_patches)
        .filter_map(|m| box_from_patches(&patches, m, grid.size, config.min_patches))
        .filter(|b| b.confidence >= config.min_confidence && b.is_simple())
        .collect();

    trace!(
        accepted = active.iter().filter(|&&a| a).count(),
        components = label_count,
        clusters = clusters.len(),
        raw_boxes = boxes.len(),
        "patch clustering"
    );

    boxes.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let kept = suppress_overlaps(boxes, config.max_overlap);
    if let Some(sink) = sink {
        sink.candidates(&kept);
    }
    kept
}

/// Orientation and extent of one patch cluster
struct ClusterSpan {
    angle: f32,
    centers: Vec<Point>,
}

impl ClusterSpan {
    fn new(patches: &[Patch], ids: &[usize], size: usize) -> Self {
        let angles: Vec<f32> = ids.iter().map(|&i| patches[i].orientation).collect();
        let weights: Vec<f32> = ids
            .iter()
            .map(|&i| patches[i].coherence * patches[i].contrast as f32)
            .collect();
        let (angle, _) = axial_mean(&angles, &weights);
        let half = size as f32 / 2.0;
        let centers = ids
            .iter()
            .map(|&i| Point::new(patches[i].x as f32 + half, patches[i].y as f32 + half))
            .collect();
        Self { angle, centers }
    }

    /// Interval covered by the cluster's patches when projected onto `dir`
    fn project(&self, dir: (f32, f32), size: usize) -> (f32, f32) {
        let reach = size as f32 / 2.0 * (dir.0.abs() + dir.1.abs());
        self.centers.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), c| {
            let t = c.x * dir.0 + c.y * dir.1;
            (lo.min(t - reach), hi.max(t + reach))
        })
    }
}

/// True when `b` continues `a` along a's reading axis
fn continues(a: &ClusterSpan, b: &ClusterSpan, size: usize, max_diff: f32) -> bool {
    if axial_difference(a.angle, b.angle) > max_diff {
        return false;
    }
    let axis = (a.angle.cos(), a.angle.sin());
    let normal = (-axis.1, axis.0);

    let (av0, av1) = a.project(normal, size);
    let (bv0, bv1) = b.project(normal, size);
    let shared = av1.min(bv1) - av0.max(bv0);
    if shared < MERGE_MIN_SHARED * (av1 - av0).min(bv1 - bv0) {
        return false;
    }

    let (au0, au1) = a.project(axis, size);
    let (bu0, bu1) = b.project(axis, size);
    let gap = au0.max(bu0) - au1.min(bu1);
    gap <= MERGE_GAP_PATCHES * size as f32
}

/// Join clusters that lie on one line with small gaps between them
fn merge_collinear(
    patches: &[Patch],
    clusters: Vec<Vec<usize>>,
    size: usize,
    max_diff: f32,
) -> Vec<Vec<usize>> {
    if clusters.len() < 2 {
        return clusters;
    }
    let spans: Vec<ClusterSpan> = clusters
        .iter()
        .map(|ids| ClusterSpan::new(patches, ids, size))
        .collect();

    let mut uf = UnionFind::new(clusters.len());
    for i in 0..spans.len() {
        for j in i + 1..spans.len() {
            if continues(&spans[i], &spans[j], size, max_diff)
                && continues(&spans[j], &spans[i], size, max_diff)
            {
                uf.union(i as u32, j as u32);
            }
        }
    }

    let mut merged: Vec<Vec<usize>> = Vec::new();
    let mut slot = std::collections::HashMap::new();
    for (i, ids) in clusters.into_iter().enumerate() {
        let root = uf.find(i as u32);
        let at = *slot.entry(root).or_insert_with(|| {
            merged.push(Vec::new());
            merged.len() - 1
        });
        merged[at].extend(ids);
    }
    merged
}

/// Fit an axis-aligned-to-the-bars rectangle to a patch cluster
fn box_from_patches(
    patches: &[Patch],
    member_ids: &[usize],
    size: usize,
    min_patches: usize,
) -> Option<CandidateBox> {
    let members: Vec<&Patch> = member_ids.iter().map(|&i| &patches[i]).collect();
    let angles: Vec<f32> = members.iter().map(|p| p.orientation).collect();
    let weights: Vec<f32> = members
        .iter()
        .map(|p| p.coherence * p.contrast as f32)
        .collect();
    let (angle, agreement) = axial_mean(&angles, &weights);

    let s = size as f32;
    let n = members.len() as f32;
    let cx = members.iter().map(|p| p.x as f32 + s / 2.0).sum::<f32>() / n;
    let cy = members.iter().map(|p| p.y as f32 + s / 2.0).sum::<f32>() / n;
    let center = Point::new(cx, cy);

    // rotate patch corners into the (reading axis, bar axis) frame
    let mut min_u = f32::INFINITY;
    let mut max_u = f32::NEG_INFINITY;
    let mut min_v = f32::INFINITY;
    let mut max_v = f32::NEG_INFINITY;
    for p in &members {
        let (x, y) = (p.x as f32, p.y as f32);
        for corner in [
            Point::new(x, y),
            Point::new(x + s, y),
            Point::new(x + s, y + s),
            Point::new(x, y + s),
        ] {
            let r = corner.rotate_around(&center, -angle);
            min_u = min_u.min(r.x - cx);
            max_u = max_u.max(r.x - cx);
            min_v = min_v.min(r.y - cy);
            max_v = max_v.max(r.y - cy);
        }
    }
    if max_u - min_u < 1.0 || max_v - min_v < 1.0 {
        return None;
    }

    let corners = [
        Point::new(cx + min_u, cy + min_v),
        Point::new(cx + max_u, cy + min_v),
        Point::new(cx + max_u, cy + max_v),
        Point::new(cx + min_u, cy + max_v),
    ]
    .map(|p| p.rotate_around(&center, angle));

    let mean_coherence = members.iter().map(|p| p.coherence).sum::<f32>() / n;
    let size_factor = (n / (2.0 * min_patches as f32)).min(1.0);
    let confidence = (mean_coherence * agreement * size_factor).clamp(0.0, 1.0);

    let mut candidate = CandidateBox::new(corners, confidence, angle.rem_euclid(PI));
    candidate.patch_count = members.len();
    Some(candidate)
}

/// Greedy suppression: walk boxes best-first and drop any overlapping a kept box too much
pub fn suppress_overlaps(sorted: Vec<CandidateBox>, max_overlap: f32) -> Vec<CandidateBox> {
    let mut kept: Vec<CandidateBox> = Vec::with_capacity(sorted.len());
    for candidate in sorted {
        let clashes = kept
            .iter()
            .any(|k| overlap_fraction(&k.corners, &candidate.corners) > max_overlap);
        if !clashes {
            kept.push(candidate);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raster_with_bars(width: usize, height: usize, rect: (usize, usize, usize, usize)) -> GrayRaster {
        let (x0, y0, x1, y1) = rect;
        let mut data = vec![230u8; width * height];
        for y in y0..y1 {
            for x in x0..x1 {
                // irregular widths: 2,3,2,5 px cycle
                let phase = (x - x0) % 12;
                let dark = phase < 2 || (5..7).contains(&phase) || (9..10).contains(&phase);
                if dark {
                    data[y * width + x] = 20;
                }
            }
        }
        GrayRaster::new(width, height, data)
    }

    #[test]
    fn test_uniform_raster_has_no_candidates() {
        let raster = GrayRaster::new(320, 240, vec![128; 320 * 240]);
        assert!(locate(&raster, &LocatorConfig::default()).is_empty());
    }

    #[test]
    fn test_low_amplitude_noise_has_no_candidates() {
        let mut seed = 12345u32;
        let data: Vec<u8> = (0..320 * 240)
            .map(|_| {
                seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
                120 + ((seed >> 16) % 20) as u8
            })
            .collect();
        let raster = GrayRaster::new(320, 240, data);
        assert!(locate(&raster, &LocatorConfig::default()).is_empty());
    }

    #[test]
    fn test_bar_block_is_found() {
        let raster = raster_with_bars(320, 240, (80, 60, 240, 180));
        let boxes = locate(&raster, &LocatorConfig::default());
        assert!(!boxes.is_empty());
        let best = &boxes[0];
        assert!(best.is_simple());
        assert!(axial_difference(best.angle, 0.0) < 0.2);
        let c = best.center();
        assert!((c.x - 160.0).abs() < 24.0, "center {:?}", c);
        assert!((c.y - 120.0).abs() < 24.0, "center {:?}", c);
        for w in boxes.windows(2) {
            assert!(w[0].confidence >= w[1].confidence);
        }
    }

    fn raster_with_blocks(width: usize, height: usize, rects: &[(usize, usize, usize, usize)]) -> GrayRaster {
        let mut data = vec![230u8; width * height];
        for &rect in rects {
            let block = raster_with_bars(width, height, rect);
            for (d, &v) in data.iter_mut().zip(block.as_slice()) {
                *d = (*d).min(v);
            }
        }
        GrayRaster::new(width, height, data)
    }

    #[test]
    fn test_split_symbol_is_one_box() {
        // 16 px patches; a one-patch blank column splits the bars into two clusters
        let raster = raster_with_blocks(320, 240, &[(64, 64, 112, 176), (128, 64, 224, 176)]);
        let boxes = locate(&raster, &LocatorConfig::default());
        assert_eq!(boxes.len(), 1, "{:?}", boxes);
        assert!(boxes[0].length() > 140.0, "length {}", boxes[0].length());
        let c = boxes[0].center();
        assert!((c.x - 144.0).abs() < 24.0, "center {:?}", c);
    }

    #[test]
    fn test_distant_or_stacked_blocks_stay_apart() {
        let apart = raster_with_blocks(320, 240, &[(16, 64, 96, 176), (208, 64, 304, 176)]);
        assert_eq!(locate(&apart, &LocatorConfig::default()).len(), 2);

        let stacked = raster_with_blocks(320, 240, &[(64, 16, 256, 96), (64, 144, 256, 224)]);
        assert_eq!(locate(&stacked, &LocatorConfig::default()).len(), 2);
    }

    #[test]
    fn test_suppress_overlaps_keeps_stronger() {
        let a = CandidateBox {
            confidence: 0.9,
            ..CandidateBox::from_rect(0.0, 0.0, 100.0, 50.0)
        };
        let b = CandidateBox {
            confidence: 0.5,
            ..CandidateBox::from_rect(10.0, 5.0, 100.0, 50.0)
        };
        let c = CandidateBox {
            confidence: 0.4,
            ..CandidateBox::from_rect(200.0, 0.0, 300.0, 50.0)
        };
        let kept = suppress_overlaps(vec![a.clone(), b, c.clone()], 0.5);
        assert_eq!(kept, vec![a, c]);
    }

    #[test]
    fn test_suppress_keeps_adjacent_rotated_boxes() {
        // two parallel 45 degree shelf labels: their bounds overlap almost fully
        let rotated = |cx: f32, cy: f32, confidence: f32| {
            let center = Point::new(cx, cy);
            let flat = CandidateBox::from_rect(cx - 80.0, cy - 10.0, cx + 80.0, cy + 10.0);
            CandidateBox::new(
                flat.corners.map(|p| p.rotate_around(&center, PI / 4.0)),
                confidence,
                PI / 4.0,
            )
        };
        let upper = rotated(200.0, 200.0, 0.9);
        let lower = rotated(220.0, 180.0, 0.8);
        let kept = suppress_overlaps(vec![upper.clone(), lower.clone()], 0.5);
        assert_eq!(kept, vec![upper.clone(), lower]);

        let shifted = rotated(203.0, 203.0, 0.7);
        assert_eq!(suppress_overlaps(vec![upper.clone(), shifted], 0.5), vec![upper]);
    }
}
