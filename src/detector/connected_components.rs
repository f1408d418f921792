/// Union-find labeling for skeleton strokes and patch clusters
use crate::models::BitMatrix;

/// Union-Find data structure
pub struct UnionFind {
    parent: Vec<u32>,
}

impl UnionFind {
    /// `n` singleton sets
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n as u32).collect(),
        }
    }

    /// Root of `x`, with path halving
    pub fn find(&mut self, mut x: u32) -> u32 {
        while self.parent[x as usize] != x {
            let grand = self.parent[self.parent[x as usize] as usize];
            self.parent[x as usize] = grand;
            x = grand;
        }
        x
    }

    /// Merge the sets containing `x` and `y`
    pub fn union(&mut self, x: u32, y: u32) {
        let root_x = self.find(x);
        let root_y = self.find(y);
        if root_x != root_y {
            self.parent[root_x as usize] = root_y;
        }
    }
}

/// Label 8-connected foreground regions of a mask.
///
/// Returns per-pixel labels (0 = background, 1..=n compact) and n.
pub fn label_components(mask: &BitMatrix) -> (Vec<u32>, usize) {
    let width = mask.width();
    let height = mask.height();
    let mut uf = UnionFind::new(width * height);
    let mut seen = vec![false; width * height];

    for y in 0..height {
        for x in 0..width {
            if !mask.get(x, y) {
                continue;
            }
            let idx = (y * width + x) as u32;
            seen[idx as usize] = true;
            // left, upper-left, up, upper-right
            let (xi, yi) = (x as isize, y as isize);
            for (dx, dy) in [(-1isize, 0isize), (-1, -1), (0, -1), (1, -1)] {
                if mask.get_signed(xi + dx, yi + dy) {
                    let n = ((yi + dy) as usize * width + (xi + dx) as usize) as u32;
                    uf.union(idx, n);
                }
            }
        }
    }

    let mut compact = std::collections::HashMap::new();
    let mut labels = vec![0u32; width * height];
    for i in 0..width * height {
        if !seen[i] {
            continue;
        }
        let root = uf.find(i as u32);
        let next = compact.len() as u32 + 1;
        labels[i] = *compact.entry(root).or_insert(next);
    }
    let count = compact.len();
    (labels, count)
}

/// Label cells of a grid, joining 8-neighbours for which `joins(a, b)` holds.
///
/// `active[i]` marks cells taking part. Returns per-cell labels (0 = inactive) and the label count.
pub fn label_grid(
    cols: usize,
    rows: usize,
    active: &[bool],
    mut joins: impl FnMut(usize, usize) -> bool,
) -> (Vec<u32>, usize) {
    let mut uf = UnionFind::new(cols * rows);
    for r in 0..rows {
        for c in 0..cols {
            let i = r * cols + c;
            if !active[i] {
                continue;
            }
            let (ci, ri) = (c as isize, r as isize);
            for (dc, dr) in [(-1isize, 0isize), (-1, -1), (0, -1), (1, -1)] {
                let (nc, nr) = (ci + dc, ri + dr);
                if nc < 0 || nr < 0 || nc >= cols as isize {
                    continue;
                }
                let j = nr as usize * cols + nc as usize;
                if active[j] && joins(i, j) {
                    uf.union(i as u32, j as u32);
                }
            }
        }
    }

    let mut compact = std::collections::HashMap::new();
    let mut labels = vec![0u32; cols * rows];
    for i in 0..cols * rows {
        if !active[i] {
            continue;
        }
        let root = uf.find(i as u32);
        let next = compact.len() as u32 + 1;
        labels[i] = *compact.entry(root).or_insert(next);
    }
    let count = compact.len();
    (labels, count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_components() {
        let mut matrix = BitMatrix::new(10, 10);
        matrix.set(2, 2, true);
        matrix.set(3, 3, true); // diagonal neighbour joins
        matrix.set(8, 8, true);

        let (labels, count) = label_components(&matrix);
        assert_eq!(count, 2);
        assert_eq!(labels[2 * 10 + 2], labels[3 * 10 + 3]);
        assert_ne!(labels[2 * 10 + 2], labels[8 * 10 + 8]);
        assert_eq!(labels[0], 0);
    }

    #[test]
    fn test_label_grid_respects_predicate() {
        // 3x1 grid, all active; only cells 0 and 1 join
        let active = [true, true, true];
        let (labels, count) = label_grid(3, 1, &active, |a, b| a.min(b) == 0);
        assert_eq!(count, 2);
        assert_eq!(labels[0], labels[1]);
        assert_ne!(labels[1], labels[2]);
    }
}
