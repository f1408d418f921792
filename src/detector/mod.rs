//! Barcode region detection
//!
//! - Patch analysis (contrast, gradient orientation histogram, skeleton strokes)
//! - Zhang-Suen skeletonization
//! - Union-find labeling of strokes and patch clusters
//! - Box fitting and overlap suppression

/// Union-find labeling over pixel masks and patch grids
pub mod connected_components;
/// Cluster bar-like patches into candidate boxes
pub mod locator;
/// Per-patch contrast/orientation/stroke analysis
pub mod patches;
/// Zhang-Suen thinning
pub mod skeleton;

pub use locator::{locate, locate_with_debug};
