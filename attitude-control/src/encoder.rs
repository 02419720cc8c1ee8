//! Encoder angle correction and filtered differentiation.
//!
//! Raw shaft encoder counts are converted to radians, offset by the bias
//! angle captured at startup, and sign-corrected per axis. Velocity comes
//! from a critically-damped single-pole observer rather than finite
//! differences, which attenuates quantization noise at the cost of a small
//! lag.

use nalgebra::Vector3;

/// Encoder counts per full revolution.
pub const COUNTS_PER_REV: f64 = 40000.0;

/// Default observer pole frequency in rad/s.
pub const DEFAULT_POLE: f64 = 50.0;

/// Default observer integration step in seconds.
///
/// The filter assumes a constant nominal sub-sample rate; this is
/// deliberately decoupled from the measured wall-clock delta.
pub const DEFAULT_SUB_PERIOD: f64 = 0.01;

/// Convert a raw signed count to an uncorrected angle in radians.
pub fn counts_to_radians(counts: i64) -> f64 {
    counts as f64 * (2.0 * std::f64::consts::PI) / COUNTS_PER_REV
}

/// Per-axis direction sign and bias angle for the three encoders.
///
/// Corrected angle = `(raw_angle − bias) × direction`. The bias is derived
/// once from the initial IMU orientation; the direction signs come from
/// configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncoderCalibration {
    /// Direction multiplier per axis, ±1.
    pub direction: Vector3<f64>,
    /// Bias angle per axis in radians.
    pub bias: Vector3<f64>,
}

impl Default for EncoderCalibration {
    fn default() -> Self {
        Self {
            direction: Vector3::new(1.0, 1.0, 1.0),
            bias: Vector3::zeros(),
        }
    }
}

impl EncoderCalibration {
    /// Convert raw counts to corrected body angles in radians.
    pub fn correct(&self, counts: [i64; 3]) -> Vector3<f64> {
        let mut angle = Vector3::zeros();
        for i in 0..3 {
            angle[i] = (counts_to_radians(counts[i]) - self.bias[i]) * self.direction[i];
        }
        angle
    }
}

/// Single-pole observer producing a filtered velocity estimate per axis.
///
/// State per axis is `(x, xdot)` with pole frequency `p`:
///
/// ```text
/// y    = -p²·x + p·u
/// xdot = -p·x + u
/// x   += xdot·Δt
/// ```
///
/// This is an approximate derivative-plus-low-pass, not an exact
/// differentiator. `Δt` is the fixed configured sub-sample period, never the
/// measured delta. For constant input the output decays to zero (the pole is
/// stable for p > 0).
#[derive(Debug, Clone)]
pub struct EncoderDifferentiator {
    x: Vector3<f64>,
    xdot: Vector3<f64>,
    pole: f64,
    dt: f64,
}

impl EncoderDifferentiator {
    /// Observer with the default pole and sub-sample period.
    pub fn new() -> Self {
        Self::with_pole(DEFAULT_POLE, DEFAULT_SUB_PERIOD)
    }

    /// Observer with an explicit pole frequency (rad/s) and integration
    /// step (s).
    pub fn with_pole(pole: f64, dt: f64) -> Self {
        Self {
            x: Vector3::zeros(),
            xdot: Vector3::zeros(),
            pole,
            dt,
        }
    }

    /// Internal observer rate state.
    pub fn state_rate(&self) -> Vector3<f64> {
        self.xdot
    }

    /// Advance the observer by one sub-sample step with the given position
    /// input and return the filtered velocity.
    pub fn update(&mut self, position: Vector3<f64>) -> Vector3<f64> {
        let p = self.pole;
        let y = -p * p * self.x + p * position;
        self.xdot = -p * self.x + position;
        self.x += self.xdot * self.dt;
        y
    }
}

impl Default for EncoderDifferentiator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn counts_convert_to_radians() {
        assert_relative_eq!(counts_to_radians(40000), 2.0 * PI, epsilon = 1e-12);
        assert_relative_eq!(counts_to_radians(-20000), -PI, epsilon = 1e-12);
        assert_eq!(counts_to_radians(0), 0.0);
    }

    #[test]
    fn correction_applies_bias_then_direction() {
        let cal = EncoderCalibration {
            direction: Vector3::new(-1.0, 1.0, 1.0),
            bias: Vector3::new(0.5, 0.0, 0.0),
        };
        let angle = cal.correct([10000, 0, 0]);
        // 10000 counts = π/2 rad; (π/2 − 0.5) × −1.
        assert_relative_eq!(angle.x, -(PI / 2.0 - 0.5), epsilon = 1e-12);
        assert_eq!(angle.y, 0.0);
        assert_eq!(angle.z, 0.0);
    }

    #[test]
    fn constant_input_converges_to_zero_output() {
        let mut diff = EncoderDifferentiator::new();
        let u = Vector3::new(1.0, -0.5, 2.0);
        let mut y = Vector3::zeros();
        for _ in 0..200 {
            y = diff.update(u);
        }
        for i in 0..3 {
            assert_relative_eq!(y[i], 0.0, epsilon = 1e-9);
        }
        // The internal rate state also settles.
        for i in 0..3 {
            assert_relative_eq!(diff.state_rate()[i], 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn first_step_output_is_scaled_input() {
        let mut diff = EncoderDifferentiator::new();
        // With zero state, y = p·u on the first update.
        let y = diff.update(Vector3::new(0.1, 0.0, 0.0));
        assert_relative_eq!(y.x, DEFAULT_POLE * 0.1, epsilon = 1e-12);
    }

    #[test]
    fn ramp_input_tracks_slope() {
        // Position advancing 0.02 rad per 0.01 s step is a 2 rad/s ramp.
        let mut diff = EncoderDifferentiator::new();
        let mut y = Vector3::zeros();
        for k in 0..500 {
            let pos = Vector3::new(0.02 * k as f64, 0.0, 0.0);
            y = diff.update(pos);
        }
        assert_relative_eq!(y.x, 2.0, epsilon = 0.1);
    }
}
