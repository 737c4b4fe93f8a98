//! Datagram Encoders
//!
//! Used by the rover side (and the simulator) to build datagrams the router
//! accepts.

use crate::error::ProtocolError;
use crate::header::PacketHeader;
use crate::sensor::SensorId;
use crate::{HEADER_LEN, MAX_FRAME_BYTES, PREFIX_LEN};

/// Build a video frame datagram
pub fn encode_frame(timestamp: i64, frame_index: i32, jpeg: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    if jpeg.is_empty() {
        return Err(ProtocolError::EmptyFrame);
    }
    if jpeg.len() > MAX_FRAME_BYTES {
        return Err(ProtocolError::Oversized {
            capacity: MAX_FRAME_BYTES,
        });
    }

    let mut datagram = Vec::with_capacity(HEADER_LEN + PREFIX_LEN + jpeg.len());
    datagram.extend_from_slice(&PacketHeader::frame(timestamp).encode());
    datagram.extend_from_slice(&frame_index.to_le_bytes());
    datagram.extend_from_slice(jpeg);
    Ok(datagram)
}

/// Build a sensor reading datagram
pub fn encode_sensor(timestamp: i64, sensor: SensorId, reading: f32) -> Vec<u8> {
    let mut datagram = Vec::with_capacity(HEADER_LEN + PREFIX_LEN);
    datagram.extend_from_slice(&PacketHeader::sensor(sensor, timestamp).encode());
    datagram.extend_from_slice(&reading.to_le_bytes());
    datagram
}
