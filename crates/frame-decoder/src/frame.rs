//! Decoded frame buffer handed to the texture upload

use crate::FrameGeometry;

/// Alpha written to every decoded pixel
pub const ALPHA: u8 = 255;

/// Shown until the first frame arrives (opaque magenta)
pub const PLACEHOLDER_PIXEL: [u8; 4] = [255, 0, 255, ALPHA];

/// Persistent RGBA frame, 4 bytes per pixel, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    /// RGBA pixel data (width * height * 4)
    data: Vec<u8>,
    /// Frame width
    width: u32,
    /// Frame height
    height: u32,
}

impl DecodedFrame {
    /// Create a frame filled with the placeholder colour
    pub fn new(geometry: FrameGeometry) -> Self {
        Self {
            data: PLACEHOLDER_PIXEL.repeat(geometry.pixel_count()),
            width: geometry.width,
            height: geometry.height,
        }
    }

    /// Raw RGBA bytes, exactly `width * height * 4` long
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        let mut pixel = [0u8; 4];
        pixel.copy_from_slice(&self.data[idx..idx + 4]);
        Some(pixel)
    }

    /// Overwrite every pixel from packed RGB.
    ///
    /// Callers must have checked `rgb.len() == width * height * 3`.
    pub(crate) fn write_rgb(&mut self, rgb: &[u8]) {
        debug_assert_eq!(rgb.len() * 4, self.data.len() * 3);
        for (dst, src) in self.data.chunks_exact_mut(4).zip(rgb.chunks_exact(3)) {
            dst[..3].copy_from_slice(src);
            dst[3] = ALPHA;
        }
    }
}
