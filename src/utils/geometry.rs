/// Geometry helpers for candidate boxes and scan directions
use crate::models::Point;

/// Signed shoelace area (positive for counter-clockwise in y-up coordinates)
pub fn signed_area(poly: &[Point]) -> f32 {
    let n = poly.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0f32;
    for i in 0..n {
        let a = &poly[i];
        let b = &poly[(i + 1) % n];
        sum += a.x * b.y - b.x * a.y;
    }
    sum * 0.5
}

/// Absolute polygon area
pub fn polygon_area(poly: &[Point]) -> f32 {
    signed_area(poly).abs()
}

fn orientation(a: &Point, b: &Point, c: &Point) -> f32 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Proper intersection test for segments p1-p2 and q1-q2 (shared endpoints do not count)
pub fn segments_cross(p1: &Point, p2: &Point, q1: &Point, q2: &Point) -> bool {
    let d1 = orientation(q1, q2, p1);
    let d2 = orientation(q1, q2, p2);
    let d3 = orientation(p1, p2, q1);
    let d4 = orientation(p1, p2, q2);
    ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
}

/// A quadrilateral is simple when its two pairs of opposite edges do not cross
/// and it has non-zero area.
pub fn is_simple_quad(q: &[Point; 4]) -> bool {
    if polygon_area(q) <= f32::EPSILON {
        return false;
    }
    !segments_cross(&q[0], &q[1], &q[2], &q[3]) && !segments_cross(&q[1], &q[2], &q[3], &q[0])
}

/// Point where segment a-b crosses the infinite line through p-q
fn line_intersection(a: &Point, b: &Point, p: &Point, q: &Point) -> Point {
    let d1 = orientation(p, q, a);
    let d2 = orientation(p, q, b);
    let denom = d1 - d2;
    if denom.abs() <= f32::EPSILON {
        return *a;
    }
    let t = d1 / denom;
    Point::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t)
}

/// Clip convex polygon `subject` against convex polygon `clip` (Sutherland-Hodgman).
///
/// Either winding order is accepted. Returns an empty vector when they do not overlap.
pub fn clip_convex(subject: &[Point], clip: &[Point]) -> Vec<Point> {
    let winding = signed_area(clip).signum();
    if winding == 0.0 || subject.len() < 3 {
        return Vec::new();
    }
    let inside = |p: &Point, q: &Point, x: &Point| orientation(p, q, x) * winding >= 0.0;

    let mut output: Vec<Point> = subject.to_vec();
    for i in 0..clip.len() {
        if output.is_empty() {
            break;
        }
        let p = &clip[i];
        let q = &clip[(i + 1) % clip.len()];
        let input = std::mem::take(&mut output);
        for j in 0..input.len() {
            let cur = &input[j];
            let prev = &input[(j + input.len() - 1) % input.len()];
            match (inside(p, q, prev), inside(p, q, cur)) {
                (true, true) => output.push(*cur),
                (true, false) => output.push(line_intersection(prev, cur, p, q)),
                (false, true) => {
                    output.push(line_intersection(prev, cur, p, q));
                    output.push(*cur);
                }
                (false, false) => {}
            }
        }
    }
    output
}

/// Intersection area of two convex quads divided by the smaller quad's area.
///
/// Returns 0.0 when either quad is degenerate.
pub fn overlap_fraction(a: &[Point], b: &[Point]) -> f32 {
    let smaller = polygon_area(a).min(polygon_area(b));
    if smaller <= f32::EPSILON {
        return 0.0;
    }
    (polygon_area(&clip_convex(a, b)) / smaller).min(1.0)
}

/// Mean of axial angles (period pi) weighted by `weights`, via the doubled-angle trick.
///
/// Returns (angle in [0, pi), coherence in [0, 1]).
pub fn axial_mean(angles: &[f32], weights: &[f32]) -> (f32, f32) {
    let mut sx = 0.0f32;
    let mut sy = 0.0f32;
    let mut total = 0.0f32;
    for (&a, &w) in angles.iter().zip(weights) {
        sx += w * (2.0 * a).cos();
        sy += w * (2.0 * a).sin();
        total += w;
    }
    if total <= 0.0 {
        return (0.0, 0.0);
    }
    let mut mean = 0.5 * sy.atan2(sx);
    if mean < 0.0 {
        mean += std::f32::consts::PI;
    }
    let coherence = (sx * sx + sy * sy).sqrt() / total;
    (mean, coherence)
}

/// Smallest difference between two axial angles (period pi), in [0, pi/2]
pub fn axial_difference(a: f32, b: f32) -> f32 {
    let pi = std::f32::consts::PI;
    let d = (a - b).rem_euclid(pi);
    d.min(pi - d)
}
