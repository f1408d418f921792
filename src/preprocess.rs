//! Frame normalization: luminance conversion and optional half-sampling.

use crate::error::ScanError;
use crate::models::{Frame, GrayRaster};
use crate::utils::grayscale::{half_sample, to_luminance};

/// Smallest side accepted after half-sampling; below this the full-resolution raster is kept
const MIN_HALF_SAMPLED_SIDE: usize = 32;

/// Check that a frame's buffer and stride describe a non-empty raster
pub fn validate_frame(frame: &Frame) -> Result<(), ScanError> {
    let invalid = |reason: String| Err(ScanError::InvalidFrame { reason });

    if frame.width == 0 || frame.height == 0 {
        return invalid(format!("zero area ({}x{})", frame.width, frame.height));
    }
    let row_bytes = frame.width * frame.format.bytes_per_pixel();
    if frame.stride < row_bytes {
        return invalid(format!(
            "stride {} shorter than row of {} bytes",
            frame.stride, row_bytes
        ));
    }
    let needed = frame.stride * (frame.height - 1) + row_bytes;
    if frame.data.len() < needed {
        return invalid(format!(
            "buffer holds {} bytes, {}x{} {:?} needs {}",
            frame.data.len(),
            frame.width,
            frame.height,
            frame.format,
            needed
        ));
    }
    Ok(())
}

/// A frame converted to luminance, plus the reduced raster the locator searches
#[derive(Debug, Clone)]
pub struct PreparedFrame {
    /// Full-resolution luminance, scale 1.0
    pub full: GrayRaster,
    half: Option<GrayRaster>,
}

impl PreparedFrame {
    /// Raster for locating: the half-sampled one when present, else the full one
    pub fn locator(&self) -> &GrayRaster {
        self.half.as_ref().unwrap_or(&self.full)
    }

    /// Factor mapping locator coordinates to frame coordinates
    pub fn locator_scale(&self) -> f32 {
        self.locator().scale()
    }
}

/// Convert a raw frame to full-resolution luminance and, with
/// `half_sample_enabled`, a 2x2-averaged copy for the locator.
///
/// Tiny frames are never half-sampled.
pub fn prepare_frame(frame: &Frame, half_sample_enabled: bool) -> Result<PreparedFrame, ScanError> {
    validate_frame(frame)?;

    let gray = to_luminance(
        &frame.data,
        frame.width,
        frame.height,
        frame.stride,
        frame.format.bytes_per_pixel(),
    );

    let can_half = frame.width / 2 >= MIN_HALF_SAMPLED_SIDE && frame.height / 2 >= MIN_HALF_SAMPLED_SIDE;
    let half = (half_sample_enabled && can_half).then(|| {
        let (data, w, h) = half_sample(&gray, frame.width, frame.height);
        GrayRaster::new(w, h, data).with_scale(2.0)
    });

    Ok(PreparedFrame {
        full: GrayRaster::new(frame.width, frame.height, gray),
        half,
    })
}

/// Convert a raw frame to the grayscale raster the locator searches.
///
/// With `half_sample` each 2x2 block is averaged; the returned raster's
/// [`GrayRaster::scale`] is then 2.0 so geometry can be mapped back to the
/// frame.
pub fn prepare(frame: &Frame, half_sample_enabled: bool) -> Result<GrayRaster, ScanError> {
    let prepared = prepare_frame(frame, half_sample_enabled)?;
    Ok(match prepared.half {
        Some(half) => half,
        None => prepared.full,
    })
}
