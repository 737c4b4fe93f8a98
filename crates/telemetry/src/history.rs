//! Sensor History Table

use std::sync::{Mutex, MutexGuard, PoisonError};

use ring_buffer::{RingBuffer, DEFAULT_CAPACITY};
use tracing::debug;
use wire_protocol::SensorId;

use crate::error::TelemetryError;

/// Point-in-time copy of one channel for the telemetry panel
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSnapshot {
    /// Display name
    pub name: &'static str,
    /// Readings, oldest first
    pub readings: Vec<f32>,
    /// Smallest reading ever recorded
    pub min: Option<f32>,
    /// Largest reading ever recorded
    pub max: Option<f32>,
    /// Readings recorded since startup, including overwritten ones
    pub total_readings: u64,
}

impl ChannelSnapshot {
    /// Most recent reading
    pub fn latest(&self) -> Option<f32> {
        self.readings.last().copied()
    }
}

#[derive(Debug)]
struct ChannelState {
    readings: RingBuffer<f32>,
    /// `None` until the first reading; widened monotonically afterwards
    min: Option<f32>,
    max: Option<f32>,
}

#[derive(Debug)]
struct SensorChannel {
    name: &'static str,
    state: Mutex<ChannelState>,
}

impl SensorChannel {
    fn new(name: &'static str, capacity: usize) -> Self {
        Self {
            name,
            state: Mutex::new(ChannelState {
                readings: RingBuffer::new(capacity),
                min: None,
                max: None,
            }),
        }
    }

    /// Lock the channel. A panic while holding the lock cannot leave the
    /// state half-updated in a way readers care about, so poisoning is
    /// ignored.
    fn lock(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fixed table of sensor channels, created once at startup
#[derive(Debug)]
pub struct SensorHistory {
    channels: Box<[SensorChannel]>,
    capacity: usize,
}

impl SensorHistory {
    /// Create a table with one channel per name, each holding `capacity`
    /// readings
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(names: &[&'static str], capacity: usize) -> Self {
        let channels = names
            .iter()
            .map(|&name| SensorChannel::new(name, capacity))
            .collect();
        Self { channels, capacity }
    }

    /// Table for the rover's sensors with the given history length
    pub fn for_rover(capacity: usize) -> Self {
        Self::new(&SensorId::names(), capacity)
    }

    /// Append a reading to a channel, overwriting its oldest entry once full
    pub fn append(&self, channel: usize, value: f32) -> Result<(), TelemetryError> {
        let ch = self.channel(channel)?;
        if !value.is_finite() {
            return Err(TelemetryError::NonFiniteReading { channel, value });
        }

        let mut state = ch.lock();
        state.readings.push(value);
        state.min = Some(state.min.map_or(value, |m| m.min(value)));
        state.max = Some(state.max.map_or(value, |m| m.max(value)));
        debug!("{} <- {}", ch.name, value);
        Ok(())
    }

    /// Recent readings of a channel, oldest first
    pub fn snapshot(&self, channel: usize) -> Result<Vec<f32>, TelemetryError> {
        Ok(self.channel(channel)?.lock().readings.to_vec())
    }

    /// Readings, extrema and counters of a channel under one lock
    pub fn channel_snapshot(&self, channel: usize) -> Result<ChannelSnapshot, TelemetryError> {
        let ch = self.channel(channel)?;
        let state = ch.lock();
        Ok(ChannelSnapshot {
            name: ch.name,
            readings: state.readings.to_vec(),
            min: state.min,
            max: state.max,
            total_readings: state.readings.total_written(),
        })
    }

    /// Number of channels
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Display name of a channel
    pub fn channel_name(&self, channel: usize) -> Result<&'static str, TelemetryError> {
        Ok(self.channel(channel)?.name)
    }

    /// Smallest reading ever recorded on a channel (`None` before the first)
    pub fn min_value(&self, channel: usize) -> Result<Option<f32>, TelemetryError> {
        Ok(self.channel(channel)?.lock().min)
    }

    /// Largest reading ever recorded on a channel (`None` before the first)
    pub fn max_value(&self, channel: usize) -> Result<Option<f32>, TelemetryError> {
        Ok(self.channel(channel)?.lock().max)
    }

    /// Most recent reading on a channel
    pub fn latest(&self, channel: usize) -> Result<Option<f32>, TelemetryError> {
        Ok(self.channel(channel)?.lock().readings.latest())
    }

    /// Readings kept per channel
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn channel(&self, channel: usize) -> Result<&SensorChannel, TelemetryError> {
        self.channels
            .get(channel)
            .ok_or(TelemetryError::UnknownChannel {
                channel,
                count: self.channels.len(),
            })
    }
}

impl Default for SensorHistory {
    fn default() -> Self {
        Self::for_rover(DEFAULT_CAPACITY)
    }
}
