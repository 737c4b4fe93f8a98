//! Packet Header

use crate::error::ProtocolError;
use crate::sensor::SensorId;
use crate::{FRAME_TYPE, HEADER_LEN};

/// Fixed header preceding every datagram's payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// 0 = video frame, 1..=N = sensor channel index + 1
    pub type_tag: u64,
    /// Sender-side timestamp, informational only
    pub timestamp: i64,
}

/// What follows the header, decided by its type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// Frame index + JPEG bytes
    Frame,
    /// One `f32` reading for this channel
    Sensor(SensorId),
}

impl PacketHeader {
    /// Header for a video frame datagram
    pub fn frame(timestamp: i64) -> Self {
        Self {
            type_tag: FRAME_TYPE,
            timestamp,
        }
    }

    /// Header for a sensor reading datagram
    pub fn sensor(sensor: SensorId, timestamp: i64) -> Self {
        Self {
            type_tag: sensor.type_tag(),
            timestamp,
        }
    }

    /// Parse the wire representation
    pub fn decode(bytes: &[u8; HEADER_LEN]) -> Self {
        let (type_bytes, ts_bytes) = bytes.split_at(8);
        let mut type_tag = [0u8; 8];
        let mut timestamp = [0u8; 8];
        type_tag.copy_from_slice(type_bytes);
        timestamp.copy_from_slice(ts_bytes);
        Self {
            type_tag: u64::from_le_bytes(type_tag),
            timestamp: i64::from_le_bytes(timestamp),
        }
    }

    /// Wire representation
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[..8].copy_from_slice(&self.type_tag.to_le_bytes());
        out[8..].copy_from_slice(&self.timestamp.to_le_bytes());
        out
    }

    /// Classify the payload that follows this header
    pub fn kind(&self) -> Result<PayloadKind, ProtocolError> {
        if self.type_tag == FRAME_TYPE {
            Ok(PayloadKind::Frame)
        } else {
            SensorId::try_from(self.type_tag).map(PayloadKind::Sensor)
        }
    }
}
