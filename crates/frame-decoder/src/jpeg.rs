//! JPEG encode/decode against the fixed frame geometry

use std::io::Cursor;

use image::codecs::jpeg::{JpegDecoder, JpegEncoder};
use image::{ColorType, DynamicImage, ImageDecoder, RgbImage};

use crate::frame::DecodedFrame;
use crate::DecodeError;

/// Decode `bytes` into `target`.
///
/// The header is checked against the target geometry and colour layout
/// before any scan data is decoded. `target` is only written once the
/// stream has decoded completely; on error it is left untouched.
pub(crate) fn decode_into(bytes: &[u8], target: &mut DecodedFrame) -> Result<(), DecodeError> {
    let decoder = JpegDecoder::new(Cursor::new(bytes))?;

    let (width, height) = decoder.dimensions();
    if width != target.width() || height != target.height() {
        return Err(DecodeError::GeometryMismatch {
            expected_width: target.width(),
            expected_height: target.height(),
            actual_width: width,
            actual_height: height,
        });
    }
    if decoder.color_type() != ColorType::Rgb8 {
        return Err(DecodeError::UnsupportedColor(decoder.color_type()));
    }

    let rgb = match DynamicImage::from_decoder(decoder)? {
        DynamicImage::ImageRgb8(rgb) => rgb,
        other => return Err(DecodeError::UnsupportedColor(other.color())),
    };

    target.write_rgb(rgb.as_raw());
    Ok(())
}

/// Compress an RGB image the way the rover camera does
pub fn encode_rgb(image: &RgbImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality).encode_image(image)?;
    Ok(out)
}
