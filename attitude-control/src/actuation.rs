//! Mapping from bounded control outputs to raw actuator commands.

use nalgebra::Vector4;

/// Four-channel actuator command in physical units, ready for the motor
/// driver. Channel order is `[roll, pitch, yaw, thrust]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuationCommand(pub Vector4<f64>);

impl ActuationCommand {
    /// All channels zero.
    pub fn zero() -> Self {
        Self(Vector4::zeros())
    }

    /// Channels as an array.
    pub fn as_array(&self) -> [f64; 4] {
        [self.0[0], self.0[1], self.0[2], self.0[3]]
    }
}

/// Per-channel clamp ranges and calibration offsets.
///
/// Each channel is clamped to `[min, max]` *before* the offset is added, so
/// the authority limits stay meaningful in command-space rather than
/// actuator-space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuationMapper {
    /// Lower clamp bound per channel.
    pub min: Vector4<f64>,
    /// Upper clamp bound per channel.
    pub max: Vector4<f64>,
    /// Calibration offset added after clamping.
    pub offset: Vector4<f64>,
}

impl Default for ActuationMapper {
    fn default() -> Self {
        Self {
            min: Vector4::new(-0.2, -0.2, -0.1, 0.0),
            max: Vector4::new(0.2, 0.2, 0.1, 2.0),
            offset: Vector4::zeros(),
        }
    }
}

impl ActuationMapper {
    /// Clamp each control channel to its range, then apply the offset.
    pub fn map(&self, du: Vector4<f64>) -> ActuationCommand {
        let mut out = Vector4::zeros();
        for i in 0..4 {
            out[i] = du[i].clamp(self.min[i], self.max[i]) + self.offset[i];
        }
        ActuationCommand(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_is_applied_before_offset() {
        let mapper = ActuationMapper {
            min: Vector4::new(-0.2, -0.2, -0.1, 0.0),
            max: Vector4::new(0.2, 0.2, 0.1, 2.0),
            offset: Vector4::new(5.0, 5.0, 5.0, 5.0),
        };
        // Input far below min: result is min + offset, not clamp(du + offset).
        let cmd = mapper.map(Vector4::new(-10.2, 0.0, 0.0, 0.0));
        assert_eq!(cmd.0[0], -0.2 + 5.0);
    }

    #[test]
    fn in_range_values_only_get_offset() {
        let mapper = ActuationMapper {
            offset: Vector4::new(0.01, -0.02, 0.0, 0.1),
            ..Default::default()
        };
        let cmd = mapper.map(Vector4::new(0.1, -0.1, 0.05, 0.5));
        let expected = [0.11, -0.12, 0.05, 0.6];
        for (got, want) in cmd.as_array().iter().zip(expected) {
            approx::assert_relative_eq!(*got, want, epsilon = 1e-12);
        }
    }

    #[test]
    fn thrust_channel_clamps_to_its_own_range() {
        let mapper = ActuationMapper::default();
        let cmd = mapper.map(Vector4::new(0.0, 0.0, 0.0, -1.0));
        assert_eq!(cmd.0[3], 0.0);
        let cmd = mapper.map(Vector4::new(0.0, 0.0, 0.0, 3.0));
        assert_eq!(cmd.0[3], 2.0);
    }
}
