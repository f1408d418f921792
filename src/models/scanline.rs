use super::Point;

/// Intensity profile sampled along a line segment.
///
/// Sample `i` sits at `start + (end - start) * i / (len - 1)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Scanline {
    /// First sample position
    pub start: Point,
    /// Last sample position
    pub end: Point,
    /// Interpolated intensities
    pub samples: Vec<u8>,
}

impl Scanline {
    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when nothing was sampled
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Raster position of sample `index`
    pub fn point_at(&self, index: usize) -> Point {
        if self.samples.len() < 2 {
            return self.start;
        }
        let t = index as f32 / (self.samples.len() - 1) as f32;
        Point::new(
            self.start.x + (self.end.x - self.start.x) * t,
            self.start.y + (self.end.y - self.start.y) * t,
        )
    }
}

/// Alternating bar/space run-lengths extracted from a scanline.
///
/// Run `i` covers samples `offset(i)..offset(i) + width(i)`. Whether run 0 is a
/// bar is recorded in `starts_with_bar`; runs alternate from there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarPattern {
    widths: Vec<u32>,
    offsets: Vec<usize>,
    starts_with_bar: bool,
}

impl BarPattern {
    /// Build from run widths; offsets are accumulated from zero
    pub fn from_widths(starts_with_bar: bool, widths: Vec<u32>) -> Self {
        let mut offsets = Vec::with_capacity(widths.len());
        let mut acc = 0usize;
        for &w in &widths {
            offsets.push(acc);
            acc += w as usize;
        }
        Self {
            widths,
            offsets,
            starts_with_bar,
        }
    }

    /// Run-length encode a thresholded profile (true = bar)
    pub fn from_binary(bits: &[bool]) -> Self {
        let Some(&first) = bits.first() else {
            return Self::from_widths(false, Vec::new());
        };
        let mut widths = Vec::new();
        let mut current = first;
        let mut len = 0u32;
        for &b in bits {
            if b == current {
                len += 1;
            } else {
                widths.push(len);
                current = b;
                len = 1;
            }
        }
        widths.push(len);
        Self::from_widths(first, widths)
    }

    /// Number of runs
    pub fn len(&self) -> usize {
        self.widths.len()
    }

    /// True when there are no runs
    pub fn is_empty(&self) -> bool {
        self.widths.is_empty()
    }

    /// All run widths
    pub fn widths(&self) -> &[u32] {
        &self.widths
    }

    /// Width of run `i`
    pub fn width(&self, i: usize) -> u32 {
        self.widths[i]
    }

    /// First sample index of run `i`
    pub fn offset(&self, i: usize) -> usize {
        self.offsets[i]
    }

    /// One past the last sample index of run `i`
    pub fn end(&self, i: usize) -> usize {
        self.offsets[i] + self.widths[i] as usize
    }

    /// Total samples covered
    pub fn total_len(&self) -> usize {
        self.widths.iter().map(|&w| w as usize).sum()
    }

    /// Whether run 0 is a bar
    pub fn starts_with_bar(&self) -> bool {
        self.starts_with_bar
    }

    /// Whether run `i` is a bar (dark)
    pub fn is_bar(&self, i: usize) -> bool {
        (i % 2 == 0) == self.starts_with_bar
    }

    /// Sum of widths over `start..start + count`
    pub fn sum(&self, start: usize, count: usize) -> u32 {
        self.widths[start..start + count].iter().sum()
    }

    /// The same runs read from the other end
    pub fn reversed(&self) -> Self {
        let mut widths = self.widths.clone();
        widths.reverse();
        let starts_with_bar = match self.widths.len() {
            0 => false,
            n => self.is_bar(n - 1),
        };
        Self::from_widths(starts_with_bar, widths)
    }
}
