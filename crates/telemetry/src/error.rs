//! Telemetry Error Types

use thiserror::Error;

/// Errors when recording or reading sensor history
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TelemetryError {
    /// Channel index outside the configured table
    #[error("Unknown sensor channel {channel} (have {count})")]
    UnknownChannel { channel: usize, count: usize },

    /// NaN or infinite reading
    #[error("Non-finite reading {value} on channel {channel}")]
    NonFiniteReading { channel: usize, value: f32 },
}
