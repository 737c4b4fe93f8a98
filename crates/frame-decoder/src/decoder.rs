//! Producer/consumer halves of the frame pipeline

use std::time::{Duration, Instant};

use swap_buffer::{Consumer, Producer, SwapBuffer};
use tracing::{debug, warn};

use crate::frame::DecodedFrame;
use crate::jpeg::decode_into;
use crate::slot::CompressedImageSlot;
use crate::FrameGeometry;

/// Network-side half: receives compressed bytes straight into the back slot
#[derive(Debug)]
pub struct FrameWriter {
    slots: Producer<CompressedImageSlot>,
    capacity: usize,
}

impl FrameWriter {
    /// Backing storage of the back slot, pre-sized to the slot capacity.
    ///
    /// The transport writes a frame body directly into it, then reports the
    /// byte count through [`end_receive`](Self::end_receive). Abandoning a
    /// receive (no `end_receive`) leaves the slot unpublished.
    pub fn begin_receive(&mut self) -> &mut [u8] {
        self.slots.producer_slot().buffer_mut()
    }

    /// Record how many bytes the transport wrote and publish the slot
    pub fn end_receive(&mut self, bytes_written: usize, frame_index: i32) {
        self.slots
            .producer_slot()
            .mark_filled(bytes_written, frame_index);
        self.slots.publish();
    }

    /// Largest compressed frame a slot holds
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Render-side half: owns the persistent decoded frame
#[derive(Debug)]
pub struct FrameDecoder {
    slots: Consumer<CompressedImageSlot>,
    frame: DecodedFrame,
    frames_decoded: u64,
    decode_failures: u64,
    last_frame_index: Option<i32>,
    last_decoded_at: Option<Instant>,
}

impl FrameDecoder {
    /// Create the pipeline for a fixed frame geometry.
    ///
    /// Returns the writer half (hand it to the receive loop) and the decoder
    /// half (keep it on the render thread). All buffers are allocated here.
    #[allow(clippy::new_ret_no_self)]
    pub fn new(geometry: FrameGeometry) -> (FrameWriter, FrameDecoder) {
        let capacity = geometry.slot_capacity();
        let (producer, consumer) = SwapBuffer::split([
            CompressedImageSlot::new(capacity),
            CompressedImageSlot::new(capacity),
            CompressedImageSlot::new(capacity),
        ]);

        let writer = FrameWriter {
            slots: producer,
            capacity,
        };
        let decoder = FrameDecoder {
            slots: consumer,
            frame: DecodedFrame::new(geometry),
            frames_decoded: 0,
            decode_failures: 0,
            last_frame_index: None,
            last_decoded_at: None,
        };
        (writer, decoder)
    }

    /// Latest decoded pixels.
    ///
    /// Picks up the newest published slot and decodes it if it holds unread
    /// bytes; otherwise returns the previous frame without doing any work.
    /// A failed decode is logged and the previous frame is returned intact.
    pub fn latest_pixels(&mut self) -> &DecodedFrame {
        self.slots.acquire();
        let slot = self.slots.consumer_slot();
        if slot.is_empty() {
            return &self.frame;
        }

        let frame_index = slot.frame_index();
        match decode_into(slot.bytes(), &mut self.frame) {
            Ok(()) => {
                self.frames_decoded += 1;
                self.last_frame_index = Some(frame_index);
                self.last_decoded_at = Some(Instant::now());
                debug!("Decoded frame {} ({} bytes)", frame_index, slot.len());
            }
            Err(e) => {
                self.decode_failures += 1;
                metrics::counter!("rover_decode_failures_total").increment(1);
                warn!("Dropping frame {}: {}", frame_index, e);
            }
        }
        slot.clear();

        &self.frame
    }

    /// Whether no frame has been decoded within `threshold` of `now`
    /// (always true before the first frame)
    pub fn is_stale(&self, now: Instant, threshold: Duration) -> bool {
        match self.last_decoded_at {
            Some(at) => now.saturating_duration_since(at) > threshold,
            None => true,
        }
    }

    /// Frames successfully decoded so far
    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    /// Frames discarded as corrupt or mismatched
    pub fn decode_failures(&self) -> u64 {
        self.decode_failures
    }

    /// Sender index of the frame currently displayed
    pub fn last_frame_index(&self) -> Option<i32> {
        self.last_frame_index
    }

    /// Frame dimensions
    pub fn geometry(&self) -> FrameGeometry {
        FrameGeometry::new(self.frame.width(), self.frame.height())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{encode_rgb, PLACEHOLDER_PIXEL};
    use image::{GrayImage, Luma, Rgb, RgbImage};

    fn solid_jpeg(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
        encode_rgb(&RgbImage::from_pixel(width, height, Rgb(color)), 90).unwrap()
    }

    fn submit(writer: &mut FrameWriter, jpeg: &[u8], frame_index: i32) {
        writer.begin_receive()[..jpeg.len()].copy_from_slice(jpeg);
        writer.end_receive(jpeg.len(), frame_index);
    }

    fn assert_close(actual: [u8; 4], expected: [u8; 3]) {
        for c in 0..3 {
            let diff = (actual[c] as i16 - expected[c] as i16).abs();
            assert!(diff <= 6, "channel {} off by {}: {:?} vs {:?}", c, diff, actual, expected);
        }
        assert_eq!(actual[3], 255);
    }

    #[test]
    fn test_placeholder_before_first_frame() {
        let (_writer, mut decoder) = FrameDecoder::new(FrameGeometry::new(16, 16));
        let frame = decoder.latest_pixels();
        assert_eq!(frame.get_pixel(0, 0), Some(PLACEHOLDER_PIXEL));
        assert_eq!(decoder.frames_decoded(), 0);
    }

    #[test]
    fn test_decodes_published_frame() {
        let (mut writer, mut decoder) = FrameDecoder::new(FrameGeometry::new(100, 100));
        submit(&mut writer, &solid_jpeg(100, 100, [30, 160, 220]), 42);

        let frame = decoder.latest_pixels();
        assert_eq!(frame.width(), 100);
        assert_eq!(frame.height(), 100);
        assert_eq!(frame.as_bytes().len(), 100 * 100 * 4);
        assert_close(frame.get_pixel(50, 50).unwrap(), [30, 160, 220]);
        assert_eq!(decoder.last_frame_index(), Some(42));
    }

    #[test]
    fn test_repeated_pull_is_identical_and_free() {
        let (mut writer, mut decoder) = FrameDecoder::new(FrameGeometry::new(32, 32));
        submit(&mut writer, &solid_jpeg(32, 32, [200, 10, 10]), 1);

        let first = decoder.latest_pixels().clone();
        let second = decoder.latest_pixels().clone();
        assert_eq!(first, second);
        assert_eq!(decoder.frames_decoded(), 1);
    }

    #[test]
    fn test_corrupt_frame_keeps_previous() {
        let (mut writer, mut decoder) = FrameDecoder::new(FrameGeometry::new(32, 32));
        submit(&mut writer, &solid_jpeg(32, 32, [0, 255, 0]), 1);
        let good = decoder.latest_pixels().clone();

        submit(&mut writer, &[0xFF, 0xD8, 0x12, 0x34, 0x56], 2);
        let after = decoder.latest_pixels().clone();

        assert_eq!(good, after);
        assert_eq!(decoder.decode_failures(), 1);
        assert_eq!(decoder.last_frame_index(), Some(1));
    }

    #[test]
    fn test_wrong_size_frame_rejected() {
        let (mut writer, mut decoder) = FrameDecoder::new(FrameGeometry::new(32, 32));
        submit(&mut writer, &solid_jpeg(16, 16, [0, 0, 255]), 1);

        let frame = decoder.latest_pixels();
        assert_eq!(frame.get_pixel(0, 0), Some(PLACEHOLDER_PIXEL));
        assert_eq!(decoder.decode_failures(), 1);
    }

    #[test]
    fn test_grayscale_frame_rejected() {
        let (mut writer, mut decoder) = FrameDecoder::new(FrameGeometry::new(32, 32));
        let mut jpeg = Vec::new();
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, 90)
            .encode_image(&GrayImage::from_pixel(32, 32, Luma([128])))
            .unwrap();
        submit(&mut writer, &jpeg, 1);

        let frame = decoder.latest_pixels();
        assert_eq!(frame.get_pixel(8, 8), Some(PLACEHOLDER_PIXEL));
        assert_eq!(decoder.decode_failures(), 1);
    }

    #[test]
    fn test_only_newest_frame_decoded() {
        let (mut writer, mut decoder) = FrameDecoder::new(FrameGeometry::new(32, 32));
        submit(&mut writer, &solid_jpeg(32, 32, [255, 0, 0]), 1);
        submit(&mut writer, &solid_jpeg(32, 32, [0, 0, 255]), 2);

        let pixel = decoder.latest_pixels().get_pixel(4, 4).unwrap();
        assert_close(pixel, [0, 0, 255]);
        assert_eq!(decoder.frames_decoded(), 1);
        assert_eq!(decoder.last_frame_index(), Some(2));
    }

    #[test]
    fn test_staleness() {
        let (mut writer, mut decoder) = FrameDecoder::new(FrameGeometry::new(32, 32));
        let threshold = Duration::from_secs(3);
        assert!(decoder.is_stale(Instant::now(), threshold));

        submit(&mut writer, &solid_jpeg(32, 32, [1, 2, 3]), 1);
        decoder.latest_pixels();
        let now = Instant::now();
        assert!(!decoder.is_stale(now, threshold));
        assert!(decoder.is_stale(now + Duration::from_secs(4), threshold));
    }

    #[test]
    fn test_frames_cross_threads() {
        let (mut writer, mut decoder) = FrameDecoder::new(FrameGeometry::new(32, 32));
        let jpeg = solid_jpeg(32, 32, [90, 90, 90]);

        std::thread::spawn(move || {
            for index in 0..10 {
                submit(&mut writer, &jpeg, index);
            }
        })
        .join()
        .unwrap();

        decoder.latest_pixels();
        assert_eq!(decoder.last_frame_index(), Some(9));
    }
}
