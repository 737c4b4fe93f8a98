//! Protocol Error Types

use thiserror::Error;

/// Reasons a datagram is rejected before reaching a consumer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Header type is neither a frame nor a known sensor channel
    #[error("Unknown packet type {type_tag} (expected 0..={max})")]
    UnknownType { type_tag: u64, max: u64 },

    /// Datagram shorter than its type requires
    #[error("Truncated datagram: need {needed} bytes, got {received}")]
    Truncated { needed: usize, received: usize },

    /// Datagram larger than the receive buffers (kernel truncated it)
    #[error("Datagram exceeds {capacity} byte receive capacity")]
    Oversized { capacity: usize },

    /// Frame datagram with an empty image body
    #[error("Frame datagram carries no image data")]
    EmptyFrame,

    /// Sensor datagram with trailing bytes
    #[error("Sensor datagram must be {expected} bytes, got {received}")]
    UnexpectedLength { expected: usize, received: usize },
}

impl ProtocolError {
    /// Short stable label for metrics
    pub fn reason(&self) -> &'static str {
        match self {
            ProtocolError::UnknownType { .. } => "unknown_type",
            ProtocolError::Truncated { .. } => "truncated",
            ProtocolError::Oversized { .. } => "oversized",
            ProtocolError::EmptyFrame => "empty_frame",
            ProtocolError::UnexpectedLength { .. } => "unexpected_length",
        }
    }
}
