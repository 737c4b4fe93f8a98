//! Fixed-Capacity Ring Buffer
//!
//! Provides the circular storage behind each telemetry channel: a
//! pre-allocated buffer that overwrites its oldest entry once full and is
//! never resized.

mod buffer;

pub use buffer::RingBuffer;

/// Default history length (2 minutes at 1Hz)
pub const DEFAULT_CAPACITY: usize = 120;
