//! Sensor Channel Definitions

use crate::error::ProtocolError;
use std::fmt;

/// Physical sensors on the rover, in wire order.
///
/// The wire tag of a reading is `index + 1`; tag `0` is reserved for video
/// frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum SensorId {
    /// Water temperature (°C)
    WaterTemperature = 0,
    /// Water turbidity (NTU)
    WaterTurbidity = 1,
    /// Airborne dust density (µg/m³)
    Dust = 2,
    /// Atmospheric pressure (hPa)
    AtmosphericPressure = 3,
    /// Air temperature (°C)
    AtmosphericTemperature = 4,
    /// Relative humidity (%)
    AtmosphericHumidity = 5,
}

impl SensorId {
    /// All channels, ordered by index
    pub const ALL: [SensorId; 6] = [
        SensorId::WaterTemperature,
        SensorId::WaterTurbidity,
        SensorId::Dust,
        SensorId::AtmosphericPressure,
        SensorId::AtmosphericTemperature,
        SensorId::AtmosphericHumidity,
    ];

    /// Number of sensor channels
    pub const COUNT: usize = Self::ALL.len();

    /// Contiguous 0-based channel index
    pub fn index(self) -> usize {
        self as usize
    }

    /// Header type tag carrying this sensor's readings
    pub fn type_tag(self) -> u64 {
        self as u64 + 1
    }

    /// Look up a channel by index
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Display name for the telemetry panel
    pub fn name(self) -> &'static str {
        match self {
            SensorId::WaterTemperature => "Water temp",
            SensorId::WaterTurbidity => "Turbidity",
            SensorId::Dust => "Dust",
            SensorId::AtmosphericPressure => "Pressure",
            SensorId::AtmosphericTemperature => "Air temp",
            SensorId::AtmosphericHumidity => "Humidity",
        }
    }

    /// Channel names, ordered by index
    pub fn names() -> [&'static str; Self::COUNT] {
        Self::ALL.map(SensorId::name)
    }
}

impl TryFrom<u64> for SensorId {
    type Error = ProtocolError;

    /// Map a header type tag (`1..=COUNT`) to its channel
    fn try_from(type_tag: u64) -> Result<Self, Self::Error> {
        type_tag
            .checked_sub(1)
            .and_then(|idx| usize::try_from(idx).ok())
            .and_then(Self::from_index)
            .ok_or(ProtocolError::UnknownType {
                type_tag,
                max: Self::COUNT as u64,
            })
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_are_index_plus_one() {
        for (idx, sensor) in SensorId::ALL.iter().enumerate() {
            assert_eq!(sensor.index(), idx);
            assert_eq!(sensor.type_tag(), idx as u64 + 1);
            assert_eq!(SensorId::try_from(sensor.type_tag()), Ok(*sensor));
        }
    }

    #[test]
    fn test_frame_tag_is_not_a_sensor() {
        assert!(matches!(
            SensorId::try_from(0),
            Err(ProtocolError::UnknownType { type_tag: 0, .. })
        ));
    }

    #[test]
    fn test_out_of_range_tag() {
        assert!(SensorId::try_from(7).is_err());
        assert!(SensorId::try_from(u64::MAX).is_err());
        assert_eq!(SensorId::from_index(SensorId::COUNT), None);
    }
}
