//! Motor command encoding

/// Encoded size of a [`MotorCommand`]
pub const COMMAND_LEN: usize = 16;

/// Differential-drive speeds, each in `[0, 1]`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotorCommand {
    pub left_speed: f64,
    pub right_speed: f64,
}

impl MotorCommand {
    /// Full stop
    pub const STOP: Self = Self {
        left_speed: 0.0,
        right_speed: 0.0,
    };

    /// Build a command, clamping both speeds into range
    pub fn new(left_speed: f64, right_speed: f64) -> Self {
        Self {
            left_speed: clamp_speed(left_speed),
            right_speed: clamp_speed(right_speed),
        }
    }

    /// Command from a stick's vertical axes, where pushing up is negative.
    /// Reverse is not supported; pulling back stops the wheel.
    pub fn from_stick_axes(left_y: f64, right_y: f64) -> Self {
        Self::new(-left_y, -right_y)
    }

    /// Wire form: left then right, little-endian f64
    pub fn encode(&self) -> [u8; COMMAND_LEN] {
        let mut buf = [0u8; COMMAND_LEN];
        buf[..8].copy_from_slice(&self.left_speed.to_le_bytes());
        buf[8..].copy_from_slice(&self.right_speed.to_le_bytes());
        buf
    }

    /// Parse the wire form
    pub fn decode(bytes: &[u8; COMMAND_LEN]) -> Self {
        let mut left = [0u8; 8];
        let mut right = [0u8; 8];
        left.copy_from_slice(&bytes[..8]);
        right.copy_from_slice(&bytes[8..]);
        Self {
            left_speed: f64::from_le_bytes(left),
            right_speed: f64::from_le_bytes(right),
        }
    }
}

fn clamp_speed(speed: f64) -> f64 {
    if speed.is_nan() {
        0.0
    } else {
        speed.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speeds_clamped() {
        let cmd = MotorCommand::new(1.7, -0.3);
        assert_eq!(cmd, MotorCommand::new(1.0, 0.0));
        assert_eq!(MotorCommand::new(f64::NAN, 0.5).left_speed, 0.0);
    }

    #[test]
    fn test_stick_axes_inverted() {
        let cmd = MotorCommand::from_stick_axes(-0.8, 0.4);
        assert_eq!(cmd.left_speed, 0.8);
        assert_eq!(cmd.right_speed, 0.0);
    }

    #[test]
    fn test_wire_layout() {
        let bytes = MotorCommand::new(0.25, 1.0).encode();
        assert_eq!(&bytes[..8], &0.25f64.to_le_bytes());
        assert_eq!(&bytes[8..], &1.0f64.to_le_bytes());
        assert_eq!(MotorCommand::decode(&bytes), MotorCommand::new(0.25, 1.0));
    }
}
