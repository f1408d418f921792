/// Candidate regions from the locator
pub mod candidate;
/// Decoded codes and per-frame result records
pub mod code_result;
/// Input frames and luminance rasters
pub mod frame;
/// Packed binary masks
pub mod matrix;
/// 2-D points
pub mod point;
/// Scanline samples and bar/space run patterns
pub mod scanline;

pub use candidate::CandidateBox;
pub use code_result::{CodeResult, DecodedCode, Direction, ScanResult};
pub use frame::{Frame, GrayRaster, PixelFormat};
pub use matrix::BitMatrix;
pub use point::Point;
pub use scanline::{BarPattern, Scanline};
