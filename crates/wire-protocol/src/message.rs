//! Decoded Datagram Messages

use crate::error::ProtocolError;
use crate::header::{PacketHeader, PayloadKind};
use crate::sensor::SensorId;
use crate::{HEADER_LEN, PREFIX_LEN};

/// A datagram after header dispatch
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Message {
    Frame(FrameMessage),
    Sensor(SensorMessage),
}

/// Video frame metadata; the JPEG body stays wherever it was received
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameMessage {
    pub timestamp: i64,
    /// Sender's frame counter, wraps; diagnostics only
    pub frame_index: i32,
    /// Number of compressed bytes following the prefix
    pub payload_len: usize,
}

/// One sensor reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorMessage {
    pub timestamp: i64,
    pub sensor: SensorId,
    pub reading: f32,
}

impl Message {
    /// Decode a datagram that was scattered into header, prefix and body
    /// buffers by a single receive of `received` bytes.
    ///
    /// Only the header and prefix are inspected; the body length is derived
    /// from `received`.
    pub fn from_segments(
        header: &[u8; HEADER_LEN],
        prefix: &[u8; PREFIX_LEN],
        received: usize,
    ) -> Result<Self, ProtocolError> {
        if received < HEADER_LEN {
            return Err(ProtocolError::Truncated {
                needed: HEADER_LEN,
                received,
            });
        }
        let header = PacketHeader::decode(header);
        let kind = header.kind()?;

        let needed = HEADER_LEN + PREFIX_LEN;
        if received < needed {
            return Err(ProtocolError::Truncated { needed, received });
        }

        match kind {
            PayloadKind::Frame => {
                let payload_len = received - needed;
                if payload_len == 0 {
                    return Err(ProtocolError::EmptyFrame);
                }
                Ok(Message::Frame(FrameMessage {
                    timestamp: header.timestamp,
                    frame_index: i32::from_le_bytes(*prefix),
                    payload_len,
                }))
            }
            PayloadKind::Sensor(sensor) => {
                if received != needed {
                    return Err(ProtocolError::UnexpectedLength {
                        expected: needed,
                        received,
                    });
                }
                Ok(Message::Sensor(SensorMessage {
                    timestamp: header.timestamp,
                    sensor,
                    reading: f32::from_le_bytes(*prefix),
                }))
            }
        }
    }

    /// Decode a contiguous datagram, returning the message and the frame
    /// body (empty for sensor readings)
    pub fn decode(datagram: &[u8]) -> Result<(Self, &[u8]), ProtocolError> {
        let mut header = [0u8; HEADER_LEN];
        let mut prefix = [0u8; PREFIX_LEN];

        let header_len = datagram.len().min(HEADER_LEN);
        header[..header_len].copy_from_slice(&datagram[..header_len]);
        let prefix_end = datagram.len().min(HEADER_LEN + PREFIX_LEN);
        prefix[..prefix_end - header_len].copy_from_slice(&datagram[header_len..prefix_end]);

        let message = Self::from_segments(&header, &prefix, datagram.len())?;
        Ok((message, &datagram[prefix_end..]))
    }
}
