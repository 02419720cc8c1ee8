//! Saturating three-axis attitude control law.
//!
//! Channel order throughout is `[roll, pitch, yaw, thrust]`. The first three
//! channels come from the control law; thrust is a pass-through supplied by
//! the caller.

use nalgebra::{Vector3, Vector4};

/// Per-axis control gains, loaded once at startup and read-only afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainSet {
    /// Proportional gain per axis.
    pub kp: Vector3<f64>,
    /// Integral gain per axis.
    pub ki: Vector3<f64>,
    /// Derivative (rate) gain per axis.
    pub kd: Vector3<f64>,
}

impl Default for GainSet {
    fn default() -> Self {
        Self {
            kp: Vector3::new(0.4, 0.4, 0.8),
            ki: Vector3::new(1.0, 1.0, 2.0),
            kd: Vector3::new(1.0, 1.0, 2.0),
        }
    }
}

/// Command slew limits and per-axis output authority.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlLimits {
    /// Maximum allowed distance between the commanded and measured angle
    /// before error computation, per axis in radians. Keeps step commands
    /// from winding up the integrator.
    pub slew: Vector3<f64>,
    /// Output saturation bound per axis; outputs are clamped to ±authority.
    pub authority: Vector3<f64>,
}

impl Default for ControlLimits {
    fn default() -> Self {
        Self {
            slew: Vector3::new(0.1, 0.1, 0.5),
            authority: Vector3::new(0.2, 0.2, 0.1),
        }
    }
}

/// Three-axis attitude controller with integral state.
///
/// Owns its integral accumulator exclusively; it is initialized to zero at
/// construction and never externally reset. Each call to [`compute`] uses
/// the pre-update integral in the control law and accumulates the tracking
/// error afterwards, so the update order is reproducible.
///
/// [`compute`]: AttitudeController::compute
#[derive(Debug, Clone)]
pub struct AttitudeController {
    gains: GainSet,
    limits: ControlLimits,
    integral: Vector3<f64>,
    last_output: Vector4<f64>,
}

impl AttitudeController {
    /// Controller with the given gains and limits, zero integral state.
    pub fn new(gains: GainSet, limits: ControlLimits) -> Self {
        Self {
            gains,
            limits,
            integral: Vector3::zeros(),
            last_output: Vector4::zeros(),
        }
    }

    /// Current integral accumulator.
    pub fn integral(&self) -> Vector3<f64> {
        self.integral
    }

    /// Output of the most recent successful compute, zero before the first.
    pub fn last_output(&self) -> Vector4<f64> {
        self.last_output
    }

    /// Compute the bounded control output for one tick.
    ///
    /// Per axis: the commanded angle is clamped to the measured angle ± the
    /// slew limit, the raw output is
    /// `-angle·kp - rate·kd + integral·ki` using the pre-update integral,
    /// the output is clamped to ±authority, and only then is the tracking
    /// error integrated. The fourth channel is the supplied thrust,
    /// untouched.
    ///
    /// If `dt` is non-positive or non-finite, or any input component is
    /// non-finite, the previous output is returned and the integral is left
    /// unchanged — one bad sample must not corrupt the accumulator.
    pub fn compute(
        &mut self,
        desired: Vector3<f64>,
        angle: Vector3<f64>,
        rate: Vector3<f64>,
        thrust: f64,
        dt: f64,
    ) -> Vector4<f64> {
        let inputs_valid = dt.is_finite()
            && dt > 0.0
            && thrust.is_finite()
            && desired.iter().all(|v| v.is_finite())
            && angle.iter().all(|v| v.is_finite())
            && rate.iter().all(|v| v.is_finite());
        if !inputs_valid {
            log::warn!("invalid control input (dt = {dt}), holding previous output");
            return self.last_output;
        }

        let mut du = Vector4::zeros();
        for i in 0..3 {
            let cmd = desired[i].clamp(
                angle[i] - self.limits.slew[i],
                angle[i] + self.limits.slew[i],
            );
            let error = cmd - angle[i];

            let raw = -angle[i] * self.gains.kp[i] - rate[i] * self.gains.kd[i]
                + self.integral[i] * self.gains.ki[i];
            du[i] = raw.clamp(-self.limits.authority[i], self.limits.authority[i]);

            // Integrate after the output so this tick used the old value.
            self.integral[i] += error * dt;
        }
        du[3] = thrust;

        self.last_output = du;
        du
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn controller() -> AttitudeController {
        AttitudeController::new(GainSet::default(), ControlLimits::default())
    }

    #[test]
    fn zero_state_stays_quiescent() {
        let mut c = controller();
        for _ in 0..100 {
            let du = c.compute(
                Vector3::zeros(),
                Vector3::zeros(),
                Vector3::zeros(),
                0.0,
                0.005,
            );
            assert_eq!(du, Vector4::zeros());
        }
        assert_eq!(c.integral(), Vector3::zeros());
    }

    #[test]
    fn nonpositive_dt_holds_output_and_integral() {
        let mut c = controller();
        let desired = Vector3::new(0.05, 0.0, 0.0);
        let good = c.compute(desired, Vector3::zeros(), Vector3::zeros(), 0.5, 0.005);
        let integral = c.integral();

        for bad_dt in [0.0, -0.005, f64::NAN, f64::INFINITY] {
            let held = c.compute(desired, Vector3::zeros(), Vector3::zeros(), 0.5, bad_dt);
            assert_eq!(held, good);
            assert_eq!(c.integral(), integral);
        }
    }

    #[test]
    fn nonfinite_measurement_holds_output() {
        let mut c = controller();
        let good = c.compute(
            Vector3::zeros(),
            Vector3::new(0.01, 0.0, 0.0),
            Vector3::zeros(),
            0.5,
            0.005,
        );
        let held = c.compute(
            Vector3::zeros(),
            Vector3::new(f64::NAN, 0.0, 0.0),
            Vector3::zeros(),
            0.5,
            0.005,
        );
        assert_eq!(held, good);
    }

    #[test]
    fn output_respects_authority_limits() {
        let mut c = controller();
        let limits = ControlLimits::default();
        // Large step command and disturbed state for many ticks; the output
        // must never exceed ±authority on any axis.
        for k in 0..500 {
            let angle = Vector3::new(0.3 * (k as f64 * 0.01).sin(), -0.4, 1.0);
            let rate = Vector3::new(2.0, -3.0, 0.5);
            let du = c.compute(Vector3::new(1.0, -1.0, 2.0), angle, rate, 0.5, 0.005);
            for i in 0..3 {
                assert!(du[i].abs() <= limits.authority[i] + 1e-12);
            }
        }
    }

    #[test]
    fn command_is_slew_limited_before_error() {
        let mut c = controller();
        // Step of 1 rad with a 0.1 rad slew limit: the integrated error per
        // tick is 0.1·dt, not 1·dt.
        c.compute(
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::zeros(),
            Vector3::zeros(),
            0.0,
            0.01,
        );
        assert_relative_eq!(c.integral().x, 0.1 * 0.01, epsilon = 1e-12);
    }

    #[test]
    fn integral_updates_after_output() {
        let mut c = controller();
        let desired = Vector3::new(0.05, 0.0, 0.0);
        // First tick: integral is still zero when the output is formed, and
        // angle and rate are zero, so the output must be exactly zero.
        let first = c.compute(desired, Vector3::zeros(), Vector3::zeros(), 0.0, 0.01);
        assert_eq!(first.x, 0.0);
        // Second tick: the previous error is now in the accumulator.
        let second = c.compute(desired, Vector3::zeros(), Vector3::zeros(), 0.0, 0.01);
        let expected = 0.05 * 0.01 * GainSet::default().ki.x;
        assert_relative_eq!(second.x, expected, epsilon = 1e-12);
    }

    #[test]
    fn thrust_passes_through_unclamped() {
        let mut c = controller();
        let du = c.compute(Vector3::zeros(), Vector3::zeros(), Vector3::zeros(), 0.7, 0.005);
        assert_eq!(du[3], 0.7);
    }
}
