//! IMU sample correction, gyro bias calibration, and initial-orientation
//! capture.
//!
//! Raw samples arrive in the device frame with accelerometer readings in
//! m/s². Correction remaps them into the body frame, normalizes the
//! accelerometer to g-units, and subtracts the gyro bias measured during the
//! startup calibration phase. The remap is a fixed 90°-rotation-with-
//! reflection specific to how the HAT is mounted; the downstream encoder
//! bias-angle computation depends on it, so it is part of the contract.

use std::f64::consts::PI;

use nalgebra::Vector3;

/// Standard gravity used to normalize accelerometer readings to g-units.
pub const GRAVITY: f64 = 9.80665;

/// Per-sample scale applied to gyro readings during bias accumulation.
///
/// The calibration averages deg/s readings scaled by this factor; combined
/// with the rad-to-deg conversion it is nearly an identity on rad/s
/// (180/π × 0.0175 ≈ 1.0027), and the product is kept exact for
/// compatibility with recorded data.
pub const GYRO_BIAS_SCALE: f64 = 0.0175;

/// Number of stationary samples averaged for calibration.
pub const CALIBRATION_SAMPLES: usize = 500;

/// Delay between calibration samples in seconds.
pub const CALIBRATION_SAMPLE_PERIOD: f64 = 0.005;

/// One calibrated IMU sample.
///
/// Accelerometer in g (after correction), gyroscope in rad/s, magnetometer
/// in µT. Immutable once produced for a given tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImuSample {
    /// Accelerometer reading.
    pub accel: Vector3<f64>,
    /// Gyroscope reading.
    pub gyro: Vector3<f64>,
    /// Magnetometer reading.
    pub mag: Vector3<f64>,
}

impl ImuSample {
    /// Create a sample from the three vectors.
    pub fn new(accel: Vector3<f64>, gyro: Vector3<f64>, mag: Vector3<f64>) -> Self {
        Self { accel, gyro, mag }
    }

    /// All-zero sample.
    pub fn zero() -> Self {
        Self {
            accel: Vector3::zeros(),
            gyro: Vector3::zeros(),
            mag: Vector3::zeros(),
        }
    }
}

impl Default for ImuSample {
    fn default() -> Self {
        Self::zero()
    }
}

/// Remap a vector from the device frame to the body frame.
///
/// `new_x = -old_y`, `new_y = -old_x`, `new_z = old_z`. Applied identically
/// to accelerometer, gyroscope, and magnetometer. Applying the remap twice
/// returns the original vector (the transform is its own inverse).
pub fn remap_axes(v: Vector3<f64>) -> Vector3<f64> {
    Vector3::new(-v.y, -v.x, v.z)
}

/// Gyroscope bias, subtracted from every corrected reading.
///
/// Computed once at startup from stationary samples; recomputation mid-run
/// is not supported (restart required).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GyroBias(pub Vector3<f64>);

/// Roll/pitch bias angles derived from the initial gravity vector.
///
/// Yaw is always zero: it is not observable from gravity alone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiasAngles {
    /// Roll bias in radians.
    pub roll: f64,
    /// Pitch bias in radians.
    pub pitch: f64,
    /// Yaw bias, always 0.
    pub yaw: f64,
}

impl BiasAngles {
    /// Bias angles as a vector `(roll, pitch, yaw)`.
    pub fn as_vector(&self) -> Vector3<f64> {
        Vector3::new(self.roll, self.pitch, self.yaw)
    }
}

/// Applies frame remap, unit normalization, and gyro bias correction to raw
/// IMU samples.
#[derive(Debug, Clone, Default)]
pub struct OrientationEstimator {
    bias: Vector3<f64>,
}

impl OrientationEstimator {
    /// Estimator with zero gyro bias. Calibrate before the first control
    /// cycle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current gyro bias.
    pub fn bias(&self) -> GyroBias {
        GyroBias(self.bias)
    }

    /// Correct one raw device-frame sample: remap axes, normalize the
    /// accelerometer to g-units, subtract the gyro bias.
    pub fn update(&self, raw: ImuSample) -> ImuSample {
        ImuSample {
            accel: remap_axes(raw.accel) / GRAVITY,
            gyro: remap_axes(raw.gyro) - self.bias,
            mag: remap_axes(raw.mag),
        }
    }

    /// Calibrate the gyro bias from stationary raw samples.
    ///
    /// Each sample is corrected with the current (initially zero) bias, the
    /// gyro reading converted to deg/s and scaled by [`GYRO_BIAS_SCALE`],
    /// and the three axes averaged independently. The result is stored and
    /// subtracted from every subsequent reading.
    ///
    /// The caller supplies the samples and is responsible for the
    /// inter-sample delay ([`CALIBRATION_SAMPLE_PERIOD`] on hardware).
    pub fn calibrate_gyro(&mut self, raw: impl IntoIterator<Item = ImuSample>) -> GyroBias {
        let mut sum = Vector3::zeros();
        let mut count = 0usize;
        for sample in raw {
            let corrected = self.update(sample);
            sum += corrected.gyro * (180.0 / PI) * GYRO_BIAS_SCALE;
            count += 1;
        }
        if count > 0 {
            self.bias = sum / count as f64;
        }
        log::info!(
            "gyro bias calibrated from {} samples: [{:+.5}, {:+.5}, {:+.5}]",
            count,
            self.bias.x,
            self.bias.y,
            self.bias.z
        );
        GyroBias(self.bias)
    }

    /// Capture the initial orientation from stationary raw accelerometer
    /// samples and derive the encoder bias angles.
    ///
    /// The remapped, g-normalized accelerometer readings are averaged to a
    /// static gravity reference; roll and pitch follow from `atan2` with the
    /// quadrant rule: if `atan2(y, z) > 0` then `roll = π − atan2(y, z)`,
    /// else `roll = π + atan2(y, z)`; `pitch = −atan2(−x, √(y² + z²))`.
    pub fn capture_initial_orientation(
        &self,
        raw: impl IntoIterator<Item = ImuSample>,
    ) -> BiasAngles {
        let mut avg = Vector3::zeros();
        let mut count = 0usize;
        for sample in raw {
            avg += self.update(sample).accel;
            count += 1;
        }
        if count > 0 {
            avg /= count as f64;
        }

        let flat = avg.y.atan2(avg.z);
        let roll = if flat > 0.0 { PI - flat } else { PI + flat };
        let pitch = -(-avg.x).atan2((avg.y * avg.y + avg.z * avg.z).sqrt());
        log::info!("initial orientation: roll bias {roll:+.5}, pitch bias {pitch:+.5}");

        BiasAngles {
            roll,
            pitch,
            yaw: 0.0,
        }
    }
}
