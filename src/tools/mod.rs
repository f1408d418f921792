use crate::config::ScannerConfig;
use crate::error::ScanError;
use crate::models::{Frame, ScanResult};
use crate::preprocess::validate_frame;
use crate::scanner::decode_single;
use crate::utils::grayscale::to_luminance;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Install a `tracing` subscriber that honours `RUST_LOG` (default `info`).
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn max_dim_from_env() -> Option<u32> {
    match env::var("BARCODE_MAX_DIM") {
        Ok(value) => match value.trim().parse::<u32>() {
            Ok(0) => None,
            Ok(v) => Some(v),
            Err(_) => None,
        },
        Err(_) => None,
    }
}

/// Load an image file as an RGB frame.
///
/// Images larger than `BARCODE_MAX_DIM` on their long side are shrunk first.
pub fn load_frame<P: AsRef<Path>>(path: P) -> Result<Frame, ScanError> {
    let img = image::open(path)?;
    let img = match max_dim_from_env() {
        Some(max_dim) if img.width().max(img.height()) > max_dim => {
            img.resize(max_dim, max_dim, image::imageops::FilterType::Triangle)
        }
        _ => img,
    };
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    Ok(Frame::rgb(width as usize, height as usize, rgb.into_raw()))
}

/// Load and decode one image file
pub fn decode_image_file<P: AsRef<Path>>(
    config: &ScannerConfig,
    path: P,
) -> Result<ScanResult, ScanError> {
    let frame = load_frame(path)?;
    decode_single(config, &frame)
}

/// Write a frame as an 8-bit grayscale PNG
pub fn save_gray_png<P: AsRef<Path>>(frame: &Frame, path: P) -> Result<(), ScanError> {
    validate_frame(frame)?;
    let luma = to_luminance(
        &frame.data,
        frame.width,
        frame.height,
        frame.stride,
        frame.format.bytes_per_pixel(),
    );
    let buffer = image::GrayImage::from_raw(frame.width as u32, frame.height as u32, luma)
        .ok_or_else(|| ScanError::InvalidFrame {
            reason: format!("{}x{} buffer too small", frame.width, frame.height),
        })?;
    buffer.save(path)?;
    Ok(())
}

/// Summary statistics for grayscale data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrayStats {
    /// Minimum grayscale value.
    pub min: u8,
    /// Maximum grayscale value.
    pub max: u8,
    /// Average grayscale value.
    pub avg: u8,
}

/// Compute min/max/avg for grayscale values.
pub fn grayscale_stats(gray: &[u8]) -> GrayStats {
    let mut min = u8::MAX;
    let mut max = u8::MIN;
    let mut sum: u64 = 0;
    for &v in gray {
        min = min.min(v);
        max = max.max(v);
        sum += v as u64;
    }
    let avg = if gray.is_empty() {
        0
    } else {
        (sum / gray.len() as u64) as u8
    };
    GrayStats { min, max, avg }
}

/// Image files under `root`, sorted, at most `limit` of them
pub fn image_paths<P: AsRef<Path>>(root: P, limit: Option<usize>) -> Vec<PathBuf> {
    let mut stack = vec![root.as_ref().to_path_buf()];
    let mut images = Vec::new();

    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => continue,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            if let Some(ext) = path.extension() {
                let ext = ext.to_string_lossy().to_lowercase();
                if matches!(ext.as_str(), "png" | "jpg" | "jpeg" | "gif" | "bmp") {
                    images.push(path);
                }
            }
        }
    }

    images.sort();
    if let Some(limit) = limit {
        images.truncate(limit);
    }
    images
}
