//! Synthetic barcode frames.
//!
//! Encodes text with one of the built-in symbologies and renders the module
//! widths into a grayscale frame at any position, scale and angle. Used by
//! tests, benches and `barcodetool synth`.

use rayon::prelude::*;

use crate::decoder::{code39, code128, ean};
use crate::models::{Frame, Point};
use crate::utils::grayscale::PARALLEL_PIXEL_THRESHOLD;

/// Supersampling factor per axis
const SUBSAMPLES: usize = 2;

/// Symbologies the renderer can encode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbology {
    /// Code 128 (set chosen from the text)
    Code128,
    /// EAN-13 from 12 or 13 digits
    Ean13,
    /// EAN-8 from 7 or 8 digits
    Ean8,
    /// UPC-A from 11 or 12 digits
    UpcA,
    /// Code 39 without check character
    Code39,
    /// Code 39 with a mod-43 check character appended
    Code39Mod43,
}

impl Symbology {
    /// Parse a format identifier such as `code_128` or `ean_13`
    pub fn from_format(name: &str) -> Option<Self> {
        match name {
            "code_128" => Some(Symbology::Code128),
            "ean_13" | "ean" => Some(Symbology::Ean13),
            "ean_8" => Some(Symbology::Ean8),
            "upc_a" | "upc" => Some(Symbology::UpcA),
            "code_39" => Some(Symbology::Code39),
            "code_39_mod43" => Some(Symbology::Code39Mod43),
            _ => None,
        }
    }

    /// Format identifier reported by the matching decoder
    pub fn format(&self) -> &'static str {
        match self {
            Symbology::Code128 => "code_128",
            Symbology::Ean13 => "ean_13",
            Symbology::Ean8 => "ean_8",
            Symbology::UpcA => "upc_a",
            Symbology::Code39 => "code_39",
            Symbology::Code39Mod43 => "code_39_mod43",
        }
    }

    /// Module widths for `text`, bar first; `None` if not encodable
    pub fn encode(&self, text: &str) -> Option<Vec<u8>> {
        match self {
            Symbology::Code128 => code128::encode(text),
            Symbology::Ean13 => ean::encode_ean13(text),
            Symbology::Ean8 => ean::encode_ean8(text),
            Symbology::UpcA => ean::encode_upc_a(text),
            Symbology::Code39 => code39::encode(text, false),
            Symbology::Code39Mod43 => code39::encode(text, true),
        }
    }
}

/// Where and how a symbol is drawn
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    /// Frame width
    pub width: usize,
    /// Frame height
    pub height: usize,
    /// Symbol centre
    pub center: Point,
    /// Pixels per module
    pub unit: f32,
    /// Bar height in pixels
    pub bar_height: f32,
    /// Reading direction, radians clockwise from +x
    pub angle: f32,
    /// Background intensity
    pub background: u8,
    /// Bar intensity
    pub ink: u8,
}

impl Placement {
    /// Horizontal symbol centred in a `width` x `height` frame, bars half the frame tall
    pub fn centered(width: usize, height: usize, unit: u32) -> Self {
        Self {
            width,
            height,
            center: Point::new(width as f32 / 2.0, height as f32 / 2.0),
            unit: unit as f32,
            bar_height: height as f32 / 2.0,
            angle: 0.0,
            background: 235,
            ink: 20,
        }
    }

    /// Move the symbol centre
    pub fn at(mut self, center: Point) -> Self {
        self.center = center;
        self
    }

    /// Rotate the reading direction
    pub fn rotated_degrees(mut self, degrees: f32) -> Self {
        self.angle = degrees.to_radians();
        self
    }

    /// Change the bar height
    pub fn with_bar_height(mut self, bar_height: f32) -> Self {
        self.bar_height = bar_height;
        self
    }
}

/// Render module widths (bar first) into a grayscale frame
pub fn render_modules(modules: &[u8], placement: &Placement) -> Frame {
    let mut edges = Vec::with_capacity(modules.len() + 1);
    edges.push(0u32);
    for &m in modules {
        edges.push(edges[edges.len() - 1] + m as u32);
    }
    let total = edges[edges.len() - 1] as f32;
    let half_length = total * placement.unit / 2.0;
    let half_height = placement.bar_height / 2.0;
    let (sin, cos) = placement.angle.sin_cos();

    let is_ink = |px: f32, py: f32| -> bool {
        let dx = px - placement.center.x;
        let dy = py - placement.center.y;
        let u = dx * cos + dy * sin + half_length;
        let v = -dx * sin + dy * cos;
        if v.abs() > half_height || u < 0.0 || u >= 2.0 * half_length {
            return false;
        }
        let module = u / placement.unit;
        let run = edges.partition_point(|&e| e as f32 <= module) - 1;
        run % 2 == 0
    };

    let width = placement.width;
    let mut data = vec![placement.background; width * placement.height];
    if width == 0 {
        return Frame::gray(width, placement.height, data);
    }
    let step = 1.0 / SUBSAMPLES as f32;
    let (bg, ink) = (placement.background as f32, placement.ink as f32);
    let work = |(y, row): (usize, &mut [u8])| {
        for (x, out) in row.iter_mut().enumerate() {
            let mut hits = 0usize;
            for sy in 0..SUBSAMPLES {
                for sx in 0..SUBSAMPLES {
                    let px = x as f32 + (sx as f32 + 0.5) * step;
                    let py = y as f32 + (sy as f32 + 0.5) * step;
                    hits += is_ink(px, py) as usize;
                }
            }
            let coverage = hits as f32 / (SUBSAMPLES * SUBSAMPLES) as f32;
            *out = (bg + (ink - bg) * coverage).round() as u8;
        }
    };

    if width * placement.height >= PARALLEL_PIXEL_THRESHOLD {
        data.par_chunks_mut(width).enumerate().for_each(work);
    } else {
        data.chunks_mut(width).enumerate().for_each(work);
    }
    Frame::gray(width, placement.height, data)
}

/// Encode `text` and render it; `None` if the text is not encodable
pub fn render(symbology: Symbology, text: &str, placement: &Placement) -> Option<Frame> {
    Some(render_modules(&symbology.encode(text)?, placement))
}
