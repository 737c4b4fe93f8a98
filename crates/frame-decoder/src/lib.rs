//! Rover Camera Frame Decoder
//!
//! Moves compressed JPEG frames from the network task to the render loop
//! through a triple buffer and decodes them lazily on the render side.
//! Supports:
//! - Zero-copy receive into pre-sized compressed slots
//! - Decode only when a new frame was published
//! - Last good frame kept on corrupt or mismatched input

mod decoder;
mod frame;
mod jpeg;
mod slot;

pub use decoder::{FrameDecoder, FrameWriter};
pub use frame::{DecodedFrame, ALPHA, PLACEHOLDER_PIXEL};
pub use jpeg::encode_rgb;
pub use slot::CompressedImageSlot;

use image::ColorType;
use thiserror::Error;
use wire_protocol::MAX_FRAME_BYTES;

/// Frame decode error types
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Corrupt JPEG stream: {0}")]
    Jpeg(#[from] image::ImageError),

    #[error("Frame is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}")]
    GeometryMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("Expected 8-bit RGB, got {0:?}")]
    UnsupportedColor(ColorType),
}

/// Camera stream dimensions, fixed and known to both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
}

impl Default for FrameGeometry {
    fn default() -> Self {
        Self {
            width: 1385,
            height: 1080,
        }
    }
}

impl FrameGeometry {
    /// Create a geometry
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of pixels in a frame
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Compressed slot capacity: raw RGB size, clamped to what one datagram
    /// can carry
    pub fn slot_capacity(&self) -> usize {
        (self.pixel_count() * 3).min(MAX_FRAME_BYTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_frames_use_raw_size() {
        assert_eq!(FrameGeometry::new(100, 100).slot_capacity(), 30_000);
    }

    #[test]
    fn test_large_frames_clamped_to_datagram() {
        assert_eq!(FrameGeometry::default().slot_capacity(), MAX_FRAME_BYTES);
    }
}
