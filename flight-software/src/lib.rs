//! Periodic task runtime for the testbed flight controller.
//!
//! Three free-running threads, each owning its estimator/controller state
//! exclusively: a sensor task (IMU correction plus encoder differentiation),
//! a control task (attitude law, actuation mapping, telemetry emission), and
//! a telemetry task draining records to a CSV sink. Cross-task communication
//! goes through single-writer latest-value cells and one bounded telemetry
//! channel; the only blocking call per loop iteration is the pacing sleep.

pub mod latest;
pub mod shutdown;
pub mod sink;
pub mod tasks;

pub use latest::Latest;
pub use shutdown::{Readiness, ShutdownToken};
pub use sink::CsvSink;
pub use tasks::{
    collect_samples, control_task, sensor_task, telemetry_task, AttitudeEstimate, ControlTaskConfig,
    SensorTaskConfig,
};
