//! Utility functions for image processing
//!
//! - Grayscale conversion and half-sampling
//! - Adaptive thresholding of 1-D scanline profiles
//! - Geometry (quadrilaterals, polygon overlap, axial angle statistics)

/// Sliding-window thresholding of scanline samples
pub mod binarization;
/// Polygon and axial-angle helpers
pub mod geometry;
/// Luminance conversion and 2x2 downsampling
pub mod grayscale;
