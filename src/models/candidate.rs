use super::Point;
use crate::utils::geometry::{is_simple_quad, polygon_area};

/// Hypothesized barcode region: four corners (not axis-aligned) plus a confidence.
///
/// Corners run around the quadrilateral; `corners[0] -> corners[1]` lies along
/// the reading direction (perpendicular to the bars).
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateBox {
    /// Corner points in order
    pub corners: [Point; 4],
    /// Confidence in [0, 1]
    pub confidence: f32,
    /// Reading direction in radians, [0, pi)
    pub angle: f32,
    /// Number of patches that formed this candidate (0 when not from the locator)
    pub patch_count: usize,
}

impl CandidateBox {
    /// Create a candidate box
    pub fn new(corners: [Point; 4], confidence: f32, angle: f32) -> Self {
        Self {
            corners,
            confidence,
            angle,
            patch_count: 0,
        }
    }

    /// Axis-aligned rectangle as a candidate (used when locating is disabled)
    pub fn from_rect(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self::new(
            [
                Point::new(x0, y0),
                Point::new(x1, y0),
                Point::new(x1, y1),
                Point::new(x0, y1),
            ],
            1.0,
            0.0,
        )
    }

    /// Centroid of the four corners
    pub fn center(&self) -> Point {
        let sx: f32 = self.corners.iter().map(|p| p.x).sum();
        let sy: f32 = self.corners.iter().map(|p| p.y).sum();
        Point::new(sx / 4.0, sy / 4.0)
    }

    /// Unit vector along the reading direction
    pub fn axis(&self) -> (f32, f32) {
        let (sin, cos) = self.angle.sin_cos();
        (cos, sin)
    }

    /// Average length of the two edges parallel to the reading direction
    pub fn length(&self) -> f32 {
        (self.corners[0].distance(&self.corners[1]) + self.corners[3].distance(&self.corners[2]))
            / 2.0
    }

    /// Average length of the two edges parallel to the bars
    pub fn height(&self) -> f32 {
        (self.corners[1].distance(&self.corners[2]) + self.corners[0].distance(&self.corners[3]))
            / 2.0
    }

    /// Enclosed area
    pub fn area(&self) -> f32 {
        polygon_area(&self.corners)
    }

    /// Corners form a simple, non-degenerate quadrilateral
    pub fn is_simple(&self) -> bool {
        is_simple_quad(&self.corners)
    }

    /// Copy with every corner scaled (raster -> frame coordinates)
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            corners: self.corners.map(|p| p.scale(factor)),
            ..self.clone()
        }
    }
}
