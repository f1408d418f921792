/// Pixel layout of an incoming frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 1 byte per pixel luminance
    Gray,
    /// 3 bytes per pixel, R G B
    Rgb,
    /// 4 bytes per pixel, R G B A (alpha ignored)
    Rgba,
}

impl PixelFormat {
    /// Bytes occupied by one pixel
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Gray => 1,
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }
}

/// One raw frame handed over by the frame source.
///
/// The frame is owned by the pipeline invocation that receives it and is
/// dropped once the derived [`GrayRaster`] exists.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Width in pixels
    pub width: usize,
    /// Height in pixels
    pub height: usize,
    /// Bytes per row (>= width * bytes_per_pixel)
    pub stride: usize,
    /// Pixel layout
    pub format: PixelFormat,
    /// Raw bytes, `stride * height` long
    pub data: Vec<u8>,
}

impl Frame {
    /// Tightly packed frame of the given format
    pub fn new(width: usize, height: usize, format: PixelFormat, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            stride: width * format.bytes_per_pixel(),
            format,
            data,
        }
    }

    /// Grayscale frame
    pub fn gray(width: usize, height: usize, data: Vec<u8>) -> Self {
        Self::new(width, height, PixelFormat::Gray, data)
    }

    /// RGB frame
    pub fn rgb(width: usize, height: usize, data: Vec<u8>) -> Self {
        Self::new(width, height, PixelFormat::Rgb, data)
    }

    /// RGBA frame
    pub fn rgba(width: usize, height: usize, data: Vec<u8>) -> Self {
        Self::new(width, height, PixelFormat::Rgba, data)
    }

    /// Override the row stride (padded rows)
    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }
}

/// Normalized single-channel raster consumed by the locator and sampler
#[derive(Debug, Clone)]
pub struct GrayRaster {
    width: usize,
    height: usize,
    data: Vec<u8>,
    /// Multiply raster coordinates by this to get frame coordinates
    scale: f32,
}

impl GrayRaster {
    /// Wrap a packed luminance buffer (`data.len() == width * height`)
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self {
            width,
            height,
            data,
            scale: 1.0,
        }
    }

    pub(crate) fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Width in pixels
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> usize {
        self.height
    }

    /// Factor mapping raster coordinates back to frame coordinates (2.0 when half-sampled)
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Packed pixel data
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Pixel at (x, y); clamps to the border
    pub fn get(&self, x: usize, y: usize) -> u8 {
        let x = x.min(self.width.saturating_sub(1));
        let y = y.min(self.height.saturating_sub(1));
        self.data[y * self.width + x]
    }

    /// One row of pixels
    pub fn row(&self, y: usize) -> &[u8] {
        &self.data[y * self.width..(y + 1) * self.width]
    }

    /// Bilinear interpolation at a sub-pixel position, clamped to the border
    pub fn sample_bilinear(&self, x: f32, y: f32) -> f32 {
        let max_x = (self.width - 1) as f32;
        let max_y = (self.height - 1) as f32;
        let x = x.clamp(0.0, max_x);
        let y = y.clamp(0.0, max_y);
        let x0 = x.floor() as usize;
        let y0 = y.floor() as usize;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let fx = x - x0 as f32;
        let fy = y - y0 as f32;

        let p00 = self.data[y0 * self.width + x0] as f32;
        let p10 = self.data[y0 * self.width + x1] as f32;
        let p01 = self.data[y1 * self.width + x0] as f32;
        let p11 = self.data[y1 * self.width + x1] as f32;

        let top = p00 + (p10 - p00) * fx;
        let bottom = p01 + (p11 - p01) * fx;
        top + (bottom - top) * fy
    }

    /// Check whether a point lies inside the raster
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= 0.0 && y >= 0.0 && x <= (self.width - 1) as f32 && y <= (self.height - 1) as f32
    }
}
