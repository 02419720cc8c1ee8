//! Deterministic mock drivers for tests and the simulated runtime.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use attitude_control::{ActuationCommand, ImuSample, GRAVITY};
use nalgebra::Vector3;

use crate::{ActuatorDriver, DriverError, EncoderDriver, ImuDriver};

/// Mock IMU that replays a queued sample sequence, then repeats a fallback
/// sample forever.
#[derive(Debug, Clone)]
pub struct MockImu {
    queue: VecDeque<ImuSample>,
    fallback: ImuSample,
    fail_probe: bool,
}

impl MockImu {
    /// IMU that always returns `fallback`.
    pub fn constant(fallback: ImuSample) -> Self {
        Self {
            queue: VecDeque::new(),
            fallback,
            fail_probe: false,
        }
    }

    /// Stationary IMU: gravity straight down the device z-axis, no rotation.
    pub fn stationary() -> Self {
        Self::constant(ImuSample::new(
            Vector3::new(0.0, 0.0, GRAVITY),
            Vector3::zeros(),
            Vector3::zeros(),
        ))
    }

    /// IMU whose probe fails, for startup-failure tests.
    pub fn unavailable() -> Self {
        let mut imu = Self::stationary();
        imu.fail_probe = true;
        imu
    }

    /// Queue samples to be returned before the fallback.
    pub fn push_samples(&mut self, samples: impl IntoIterator<Item = ImuSample>) {
        self.queue.extend(samples);
    }
}

impl ImuDriver for MockImu {
    fn probe(&mut self) -> Result<(), DriverError> {
        if self.fail_probe {
            Err(DriverError::ProbeFailed("mock IMU configured absent".into()))
        } else {
            Ok(())
        }
    }

    fn read(&mut self) -> Result<ImuSample, DriverError> {
        Ok(self.queue.pop_front().unwrap_or(self.fallback))
    }
}

/// Mock encoder bank returning a settable count triple.
///
/// Cloning shares the underlying counts, so a test can move one handle into
/// a task thread and adjust the counts from another.
#[derive(Debug, Clone, Default)]
pub struct MockEncoders {
    counts: Arc<Mutex<[i64; 3]>>,
}

impl MockEncoders {
    /// Encoders reporting fixed counts until changed.
    pub fn with_counts(counts: [i64; 3]) -> Self {
        Self {
            counts: Arc::new(Mutex::new(counts)),
        }
    }

    /// Update the reported counts.
    pub fn set_counts(&self, counts: [i64; 3]) {
        *self.counts.lock().unwrap() = counts;
    }
}

impl EncoderDriver for MockEncoders {
    fn read_counts(&mut self) -> Result<[i64; 3], DriverError> {
        Ok(*self.counts.lock().unwrap())
    }
}

/// Actuator that records every applied command for later assertions.
///
/// Cloning shares the log, so a test can keep a handle while the task owns
/// the driver.
#[derive(Debug, Clone, Default)]
pub struct RecordingActuator {
    log: Arc<Mutex<Vec<ActuationCommand>>>,
    zeroed: Arc<Mutex<bool>>,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all commands applied so far.
    pub fn applied(&self) -> Vec<ActuationCommand> {
        self.log.lock().unwrap().clone()
    }

    /// True once `zero()` has been called.
    pub fn was_zeroed(&self) -> bool {
        *self.zeroed.lock().unwrap()
    }
}

impl ActuatorDriver for RecordingActuator {
    fn apply(&mut self, cmd: &ActuationCommand) -> Result<(), DriverError> {
        self.log.lock().unwrap().push(*cmd);
        Ok(())
    }

    fn zero(&mut self) -> Result<(), DriverError> {
        self.log.lock().unwrap().push(ActuationCommand::zero());
        *self.zeroed.lock().unwrap() = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_imu_replays_queue_then_fallback() {
        let mut imu = MockImu::stationary();
        let special = ImuSample::new(
            Vector3::new(1.0, 2.0, 3.0),
            Vector3::zeros(),
            Vector3::zeros(),
        );
        imu.push_samples([special]);
        assert_eq!(imu.read().unwrap(), special);
        assert_eq!(imu.read().unwrap().accel, Vector3::new(0.0, 0.0, GRAVITY));
    }

    #[test]
    fn unavailable_imu_fails_probe() {
        let mut imu = MockImu::unavailable();
        assert!(matches!(imu.probe(), Err(DriverError::ProbeFailed(_))));
    }

    #[test]
    fn encoder_counts_are_shared_across_clones() {
        let enc = MockEncoders::with_counts([1, 2, 3]);
        let mut handle = enc.clone();
        enc.set_counts([4, 5, 6]);
        assert_eq!(handle.read_counts().unwrap(), [4, 5, 6]);
    }

    #[test]
    fn recording_actuator_logs_commands_and_zeroing() {
        let actuator = RecordingActuator::new();
        let mut driver = actuator.clone();
        driver
            .apply(&ActuationCommand(nalgebra::Vector4::new(0.1, 0.0, 0.0, 0.5)))
            .unwrap();
        driver.zero().unwrap();
        let applied = actuator.applied();
        assert_eq!(applied.len(), 2);
        assert_eq!(applied[1], ActuationCommand::zero());
        assert!(actuator.was_zeroed());
    }
}
