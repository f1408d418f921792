/// Zhang-Suen thinning of a binary mask
use crate::models::BitMatrix;

/// Neighbours P2..P9, clockwise from north
#[inline]
fn neighbours(m: &BitMatrix, x: usize, y: usize) -> [bool; 8] {
    let (x, y) = (x as isize, y as isize);
    [
        m.get_signed(x, y - 1),
        m.get_signed(x + 1, y - 1),
        m.get_signed(x + 1, y),
        m.get_signed(x + 1, y + 1),
        m.get_signed(x, y + 1),
        m.get_signed(x - 1, y + 1),
        m.get_signed(x - 1, y),
        m.get_signed(x - 1, y - 1),
    ]
}

/// Reduce every foreground stroke to a one-pixel-wide centre line.
///
/// Iterates until no pixel changes; each pass only removes pixels, so the
/// loop ends after at most `max(width, height)` passes.
pub fn skeletonize(mask: &BitMatrix) -> BitMatrix {
    let mut current = mask.clone();
    let width = current.width();
    let height = current.height();
    let mut to_clear: Vec<(usize, usize)> = Vec::new();

    loop {
        let mut changed = false;
        for step in 0..2 {
            to_clear.clear();
            for y in 0..height {
                for x in 0..width {
                    if !current.get(x, y) {
                        continue;
                    }
                    let n = neighbours(&current, x, y);
                    let count = n.iter().filter(|&&b| b).count();
                    if !(2..=6).contains(&count) {
                        continue;
                    }
                    let transitions = (0..8).filter(|&i| !n[i] && n[(i + 1) % 8]).count();
                    if transitions != 1 {
                        continue;
                    }
                    // n[0]=P2 n[2]=P4 n[4]=P6 n[6]=P8
                    let (a, b) = if step == 0 {
                        (n[0] && n[2] && n[4], n[2] && n[4] && n[6])
                    } else {
                        (n[0] && n[2] && n[6], n[0] && n[4] && n[6])
                    };
                    if !a && !b {
                        to_clear.push((x, y));
                    }
                }
            }
            for &(x, y) in &to_clear {
                current.set(x, y, false);
            }
            changed |= !to_clear.is_empty();
        }
        if !changed {
            break;
        }
    }

    current
}
