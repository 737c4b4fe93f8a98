//! Rover Telemetry Wire Protocol
//!
//! Every message is a single UDP datagram: a fixed 16-byte header followed by
//! a type-specific payload. Type `0` carries a JPEG video frame, types
//! `1..=N` carry one reading for sensor channel `type - 1`. All integers are
//! little-endian. There is no fragmentation, versioning or negotiation: both
//! ends agree on [`SensorId`] numbering out of band.

mod encode;
mod error;
mod header;
mod message;
mod sensor;

pub use encode::{encode_frame, encode_sensor};
pub use error::ProtocolError;
pub use header::{PacketHeader, PayloadKind};
pub use message::{FrameMessage, Message, SensorMessage};
pub use sensor::SensorId;

/// Size of [`PacketHeader`] on the wire
pub const HEADER_LEN: usize = 16;

/// Size of the fixed payload prefix: frame index (i32) or reading (f32)
pub const PREFIX_LEN: usize = 4;

/// Largest UDP payload over IPv4 (65535 - 8 byte UDP header - 20 byte IP header)
pub const MAX_DATAGRAM_PAYLOAD: usize = 65_507;

/// Largest compressed frame that fits a single datagram
pub const MAX_FRAME_BYTES: usize = MAX_DATAGRAM_PAYLOAD - HEADER_LEN - PREFIX_LEN;

/// Header type tag for video frames
pub const FRAME_TYPE: u64 = 0;

/// Default port the control center receives video and telemetry on
pub const VIDEO_UDP_PORT: u16 = 1512;

/// Default port the rover accepts motor commands on
pub const MOTOR_TCP_PORT: u16 = 1333;
