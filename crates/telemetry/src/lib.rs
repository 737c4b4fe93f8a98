//! Sensor Telemetry History
//!
//! Keeps a fixed-length time series per sensor channel for the telemetry
//! panel. Readings arrive from the network task at roughly 1Hz per channel
//! and are read by the render loop, so each channel sits behind its own
//! mutex rather than a lock-free structure.

mod error;
mod history;

pub use error::TelemetryError;
pub use history::{ChannelSnapshot, SensorHistory};

/// Readings kept per channel unless configured otherwise
pub const DEFAULT_HISTORY_LEN: usize = ring_buffer::DEFAULT_CAPACITY;
