//! Driver traits for the testbed sensor HAT.
//!
//! The control runtime talks to hardware exclusively through these traits:
//! an IMU producing raw device-frame samples, three shaft encoders producing
//! signed position counts, and a four-channel actuator. Real drivers wrap
//! the vendor SDKs; the [`mock`] module provides deterministic
//! implementations for tests and the simulated runtime.

pub mod mock;

use attitude_control::{ActuationCommand, ImuSample};
use thiserror::Error;

/// Driver failures.
///
/// A probe failure at startup is fatal to the owning task: the process must
/// not proceed to control without a sensor. Read and write failures mid-run
/// terminate the task, which signals shutdown to its peers.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("sensor probe failed: {0}")]
    ProbeFailed(String),
    #[error("sensor read failed: {0}")]
    Read(String),
    #[error("actuator write failed: {0}")]
    Write(String),
}

/// Inertial measurement unit producing raw device-frame samples.
///
/// Samples are in physical units (m/s², rad/s, µT) but *not* remapped,
/// normalized, or bias-corrected; that happens in the estimator.
pub trait ImuDriver {
    /// Verify the sensor is present and responding.
    fn probe(&mut self) -> Result<(), DriverError>;

    /// Read one raw sample.
    fn read(&mut self) -> Result<ImuSample, DriverError>;
}

/// Three-axis shaft encoder bank.
pub trait EncoderDriver {
    /// Read the current signed position counts for all three axes.
    fn read_counts(&mut self) -> Result<[i64; 3], DriverError>;
}

/// Four-channel actuator output.
pub trait ActuatorDriver {
    /// Apply a mapped command to the actuators.
    fn apply(&mut self, cmd: &ActuationCommand) -> Result<(), DriverError>;

    /// Force all channels to the safe idle output. Called on shutdown and
    /// must succeed before the process exits.
    fn zero(&mut self) -> Result<(), DriverError>;
}
