//! Per-tick telemetry record.
//!
//! One record is emitted per control tick. Field order and count are part of
//! the contract with downstream log consumers and must not change.

use nalgebra::{Vector3, Vector4};

/// Number of fields in a telemetry record.
pub const FIELD_COUNT: usize = 25;

/// Field names in emission order, used for the CSV header.
pub const FIELD_NAMES: [&str; FIELD_COUNT] = [
    "time", "ax", "ay", "az", "gx", "gy", "gz", "mx", "my", "mz", "enc0", "enc1", "enc2",
    "enc0dot", "enc1dot", "enc2dot", "ur", "up", "uw", "uz", "d0", "d1", "d2", "d3", "d4",
];

/// One control tick's worth of telemetry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryRecord {
    /// Wall-clock timestamp in seconds.
    pub time: f64,
    /// Corrected accelerometer reading in g.
    pub accel: Vector3<f64>,
    /// Bias-corrected gyro reading in rad/s.
    pub gyro: Vector3<f64>,
    /// Magnetometer reading in µT.
    pub mag: Vector3<f64>,
    /// Corrected encoder angles in radians.
    pub enc_angle: Vector3<f64>,
    /// Filtered encoder rates in rad/s.
    pub enc_rate: Vector3<f64>,
    /// Control outputs `[roll, pitch, yaw, thrust]`.
    pub du: Vector4<f64>,
    /// Free-form info scalars.
    pub info: [f64; 5],
}

impl TelemetryRecord {
    /// Flatten to the 25-field wire order.
    pub fn as_array(&self) -> [f64; FIELD_COUNT] {
        [
            self.time,
            self.accel.x,
            self.accel.y,
            self.accel.z,
            self.gyro.x,
            self.gyro.y,
            self.gyro.z,
            self.mag.x,
            self.mag.y,
            self.mag.z,
            self.enc_angle.x,
            self.enc_angle.y,
            self.enc_angle.z,
            self.enc_rate.x,
            self.enc_rate.y,
            self.enc_rate.z,
            self.du[0],
            self.du[1],
            self.du[2],
            self.du[3],
            self.info[0],
            self.info[1],
            self.info[2],
            self.info[3],
            self.info[4],
        ]
    }
}

impl Default for TelemetryRecord {
    fn default() -> Self {
        Self {
            time: 0.0,
            accel: Vector3::zeros(),
            gyro: Vector3::zeros(),
            mag: Vector3::zeros(),
            enc_angle: Vector3::zeros(),
            enc_rate: Vector3::zeros(),
            du: Vector4::zeros(),
            info: [0.0; 5],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names_match_count() {
        assert_eq!(FIELD_NAMES.len(), FIELD_COUNT);
        assert_eq!(TelemetryRecord::default().as_array().len(), FIELD_COUNT);
    }

    #[test]
    fn array_preserves_wire_order() {
        let rec = TelemetryRecord {
            time: 1.0,
            accel: Vector3::new(2.0, 3.0, 4.0),
            gyro: Vector3::new(5.0, 6.0, 7.0),
            mag: Vector3::new(8.0, 9.0, 10.0),
            enc_angle: Vector3::new(11.0, 12.0, 13.0),
            enc_rate: Vector3::new(14.0, 15.0, 16.0),
            du: Vector4::new(17.0, 18.0, 19.0, 20.0),
            info: [21.0, 22.0, 23.0, 24.0, 25.0],
        };
        let expected: Vec<f64> = (1..=25).map(f64::from).collect();
        assert_eq!(rec.as_array().to_vec(), expected);
    }
}
