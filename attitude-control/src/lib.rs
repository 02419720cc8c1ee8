//! Attitude control kernel for the quadrotor testbed.
//!
//! This crate contains the periodic control-loop core: the sampling clock,
//! IMU correction and gyro calibration, encoder angle correction and
//! filtered differentiation, the saturating three-axis attitude control law,
//! and the mapping from bounded control outputs to actuator commands.
//!
//! Everything here is synchronous and allocation-free per tick. Pacing,
//! threading, and I/O live in the `flight-software` runtime; hardware access
//! goes through the `hat-drivers` traits.

pub mod actuation;
pub mod clock;
pub mod controller;
pub mod encoder;
pub mod imu;
pub mod params;
pub mod telemetry;

pub use actuation::{ActuationCommand, ActuationMapper};
pub use clock::{SampleClock, Tick, DEFAULT_OVERRUN_FACTOR};
pub use controller::{AttitudeController, ControlLimits, GainSet};
pub use encoder::{EncoderCalibration, EncoderDifferentiator, COUNTS_PER_REV};
pub use imu::{remap_axes, BiasAngles, GyroBias, ImuSample, OrientationEstimator, GRAVITY};
pub use params::{ParamError, ParamTable};
pub use telemetry::{TelemetryRecord, FIELD_COUNT, FIELD_NAMES};
