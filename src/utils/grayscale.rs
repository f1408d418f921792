//! Luminance conversion and 2x downsampling.
//!
//! Y = 0.299*R + 0.587*G + 0.114*B, computed as (76*R + 150*G + 29*B) >> 8.
//! All converters honour a row stride so padded camera buffers can be read
//! without a copy.

use rayon::prelude::*;

/// Coefficients for grayscale conversion: Y = (76*R + 150*G + 29*B) >> 8
const COEF_R: u32 = 76;
const COEF_G: u32 = 150;
const COEF_B: u32 = 29;

/// Frames at or above this many pixels are converted row-parallel
pub const PARALLEL_PIXEL_THRESHOLD: usize = 320 * 240;

#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((COEF_R * r as u32 + COEF_G * g as u32 + COEF_B * b as u32) >> 8).min(255) as u8
}

#[inline]
fn convert_row(src: &[u8], dst: &mut [u8], bytes_per_pixel: usize) {
    match bytes_per_pixel {
        1 => dst.copy_from_slice(&src[..dst.len()]),
        _ => {
            for (x, out) in dst.iter_mut().enumerate() {
                let i = x * bytes_per_pixel;
                *out = luma(src[i], src[i + 1], src[i + 2]);
            }
        }
    }
}

/// Convert an interleaved buffer (1, 3 or 4 bytes per pixel) to packed luminance.
///
/// The caller guarantees `src.len() >= stride * (height - 1) + width * bytes_per_pixel`.
pub fn to_luminance(
    src: &[u8],
    width: usize,
    height: usize,
    stride: usize,
    bytes_per_pixel: usize,
) -> Vec<u8> {
    let mut gray = vec![0u8; width * height];
    if width == 0 || height == 0 {
        return gray;
    }
    let row_bytes = width * bytes_per_pixel;
    let work = |(y, row): (usize, &mut [u8])| {
        let start = y * stride;
        convert_row(&src[start..start + row_bytes], row, bytes_per_pixel);
    };

    if width * height >= PARALLEL_PIXEL_THRESHOLD {
        gray.par_chunks_mut(width).enumerate().for_each(work);
    } else {
        gray.chunks_mut(width).enumerate().for_each(work);
    }
    gray
}

/// Convert tightly packed RGB to grayscale
pub fn rgb_to_grayscale(rgb: &[u8], width: usize, height: usize) -> Vec<u8> {
    to_luminance(rgb, width, height, width * 3, 3)
}

/// Convert tightly packed RGBA to grayscale (ignores alpha channel)
pub fn rgba_to_grayscale(rgba: &[u8], width: usize, height: usize) -> Vec<u8> {
    to_luminance(rgba, width, height, width * 4, 4)
}

/// Halve both dimensions by averaging each 2x2 block.
///
/// Odd trailing rows/columns are dropped. Returns (data, new_width, new_height).
pub fn half_sample(gray: &[u8], width: usize, height: usize) -> (Vec<u8>, usize, usize) {
    let out_w = width / 2;
    let out_h = height / 2;
    let mut out = vec![0u8; out_w * out_h];
    if out_w == 0 || out_h == 0 {
        return (out, out_w, out_h);
    }

    let work = |(y, row): (usize, &mut [u8])| {
        let top = &gray[(2 * y) * width..(2 * y) * width + width];
        let bottom = &gray[(2 * y + 1) * width..(2 * y + 1) * width + width];
        for (x, out) in row.iter_mut().enumerate() {
            let sum = top[2 * x] as u32
                + top[2 * x + 1] as u32
                + bottom[2 * x] as u32
                + bottom[2 * x + 1] as u32;
            *out = ((sum + 2) / 4) as u8;
        }
    };

    if out_w * out_h >= PARALLEL_PIXEL_THRESHOLD {
        out.par_chunks_mut(out_w).enumerate().for_each(work);
    } else {
        out.chunks_mut(out_w).enumerate().for_each(work);
    }
    (out, out_w, out_h)
}
