//! Periodic sensor, control, and telemetry tasks.
//!
//! Each task is a plain function run on its own thread. State (estimator,
//! differentiator, controller) is owned by exactly one task; the tasks share
//! only latest-value cells, the telemetry channel, the readiness gates, and
//! the shutdown token. A task returning `Err` is a closed failure domain:
//! the caller logs it and requests shutdown for its peers.

use std::io;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use nalgebra::{Vector3, Vector4};

use attitude_control::{
    ActuationMapper, AttitudeController, EncoderCalibration, EncoderDifferentiator, ImuSample,
    OrientationEstimator, SampleClock, TelemetryRecord, Tick, DEFAULT_OVERRUN_FACTOR,
};
use hat_drivers::{ActuatorDriver, DriverError, EncoderDriver, ImuDriver};

use crate::latest::Latest;
use crate::shutdown::{Readiness, ShutdownToken};
use crate::sink::CsvSink;

/// Interval between task-rate log lines in seconds.
const RATE_LOG_INTERVAL: f64 = 5.0;

/// Most recent attitude estimate, published by the sensor task once per
/// sample tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttitudeEstimate {
    /// Corrected IMU sample.
    pub imu: ImuSample,
    /// Corrected encoder angles in radians.
    pub enc_angle: Vector3<f64>,
    /// Filtered encoder rates in rad/s.
    pub enc_rate: Vector3<f64>,
}

impl Default for AttitudeEstimate {
    fn default() -> Self {
        Self {
            imu: ImuSample::zero(),
            enc_angle: Vector3::zeros(),
            enc_rate: Vector3::zeros(),
        }
    }
}

/// Sensor task rates.
#[derive(Debug, Clone, Copy)]
pub struct SensorTaskConfig {
    /// IMU sampling frequency in Hz.
    pub sample_hz: f64,
    /// Encoder sub-sample period in seconds; also the differentiator's
    /// fixed integration step.
    pub sub_period: f64,
}

impl Default for SensorTaskConfig {
    fn default() -> Self {
        Self {
            sample_hz: 400.0,
            sub_period: 0.01,
        }
    }
}

/// Control task rates and thrust setting.
#[derive(Debug, Clone, Copy)]
pub struct ControlTaskConfig {
    /// Control loop frequency in Hz.
    pub control_hz: f64,
    /// Overrun tolerance as a multiple of the target period.
    pub overrun_factor: f64,
    /// Thrust pass-through for the fourth output channel.
    pub thrust: f64,
}

impl Default for ControlTaskConfig {
    fn default() -> Self {
        Self {
            control_hz: 200.0,
            overrun_factor: DEFAULT_OVERRUN_FACTOR,
            thrust: 0.5,
        }
    }
}

/// Read `count` raw samples from the IMU, sleeping `period` between reads.
///
/// Used by the startup calibration phase; pass `Duration::ZERO` for mock
/// drivers where pacing is meaningless.
pub fn collect_samples<I: ImuDriver>(
    imu: &mut I,
    count: usize,
    period: Duration,
) -> Result<Vec<ImuSample>, DriverError> {
    let mut samples = Vec::with_capacity(count);
    for _ in 0..count {
        samples.push(imu.read()?);
        if !period.is_zero() {
            std::thread::sleep(period);
        }
    }
    Ok(samples)
}

/// Sensor task: IMU correction at the sample rate, encoder read and
/// filtered differentiation every sub-period, estimate published every tick.
///
/// Signals `ready` after the first estimate is published so the control
/// task never runs against an empty cell. On shutdown the task keeps its
/// sensors alive until `actuator_safed` fires: the control task raises it
/// once the actuator has been driven to the safe state, so the actuator is
/// never left live against a torn-down sensor pipeline.
#[allow(clippy::too_many_arguments)]
pub fn sensor_task<I, E>(
    mut imu: I,
    mut encoders: E,
    estimator: OrientationEstimator,
    calibration: EncoderCalibration,
    mut differentiator: EncoderDifferentiator,
    config: SensorTaskConfig,
    estimate: Latest<AttitudeEstimate>,
    ready: Readiness,
    actuator_safed: Readiness,
    shutdown: ShutdownToken,
) -> Result<(), DriverError>
where
    I: ImuDriver,
    E: EncoderDriver,
{
    log::info!("sensor task started at {} Hz", config.sample_hz);
    let mut clock = SampleClock::new(config.sample_hz);
    let mut current = AttitudeEstimate::default();
    let mut sub_elapsed = 0.0;
    let mut log_elapsed = 0.0;
    let mut signalled = false;

    while !shutdown.is_requested() {
        clock.wait_for_next_tick();
        let dt = clock.tick().dt();

        current.imu = estimator.update(imu.read()?);

        sub_elapsed += dt;
        if sub_elapsed > config.sub_period {
            sub_elapsed = 0.0;
            let counts = encoders.read_counts()?;
            current.enc_angle = calibration.correct(counts);
            current.enc_rate = differentiator.update(current.enc_angle);
        }

        estimate.publish(current);
        if !signalled {
            signalled = true;
            ready.signal();
        }

        log_elapsed += dt;
        if log_elapsed > RATE_LOG_INTERVAL {
            log_elapsed = 0.0;
            log::info!("sensor task running at {:.0} Hz", 1.0 / dt.max(1e-9));
        }
    }

    // A very short run can shut down before the first estimate; the control
    // task may still be blocked on the gate, so raise it (latched, harmless
    // if already raised) before waiting for it to safe the actuator.
    ready.signal();
    actuator_safed.wait();
    log::info!("sensor task exiting");
    Ok(())
}

/// Control task: attitude law, actuation mapping, telemetry emission.
///
/// Waits on `ready` before the first tick. On a sampling overrun the control
/// update is skipped and all outputs are forced to zero for that tick; the
/// zero command still goes through the mapper so trim offsets keep the
/// motors at idle rather than off-scale. Zeroes the actuator before exiting
/// on shutdown, and attempts to zero it even when a write fails mid-run.
/// `actuator_safed` is raised after the final zeroing attempt on every exit
/// path; the sensor task blocks on it so its sensors outlive the actuator.
#[allow(clippy::too_many_arguments)]
pub fn control_task<A>(
    mut actuator: A,
    mut controller: AttitudeController,
    mapper: ActuationMapper,
    config: ControlTaskConfig,
    estimate: Latest<AttitudeEstimate>,
    command: Latest<Vector3<f64>>,
    output: Latest<Vector4<f64>>,
    telemetry: Sender<TelemetryRecord>,
    ready: Readiness,
    actuator_safed: Readiness,
    shutdown: ShutdownToken,
) -> Result<(), DriverError>
where
    A: ActuatorDriver,
{
    ready.wait();
    log::info!("control task started at {} Hz", config.control_hz);

    let mut clock = SampleClock::with_overrun_factor(config.control_hz, config.overrun_factor);
    let mut du = Vector4::zeros();
    let mut log_elapsed = 0.0;
    let mut dropped_records = 0u64;
    let mut telemetry_lost = false;

    while !shutdown.is_requested() {
        clock.wait_for_next_tick();
        let tick = clock.tick();
        let est = estimate.get().unwrap_or_default();

        match tick {
            Tick::Overrun(dt) => {
                log::warn!("control tick overran: dt = {dt:.4} s, zeroing outputs");
                du = Vector4::zeros();
            }
            Tick::Nominal(dt) => {
                let desired = command.get().unwrap_or_else(Vector3::zeros);
                du = controller.compute(desired, est.enc_angle, est.imu.gyro, config.thrust, dt);
            }
        }

        let cmd = mapper.map(du);
        if let Err(err) = actuator.apply(&cmd) {
            let _ = actuator.zero();
            actuator_safed.signal();
            return Err(err);
        }
        output.publish(du);

        let record = TelemetryRecord {
            time: unix_time(),
            accel: est.imu.accel,
            gyro: est.imu.gyro,
            mag: est.imu.mag,
            enc_angle: est.enc_angle,
            enc_rate: est.enc_rate,
            du,
            info: [0.0; 5],
        };
        // Telemetry is lossy: control never blocks on the sink.
        match telemetry.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                dropped_records += 1;
                if dropped_records % 1000 == 1 {
                    log::warn!("telemetry channel full, {dropped_records} records dropped");
                }
            }
            Err(TrySendError::Disconnected(_)) => {
                if !telemetry_lost {
                    telemetry_lost = true;
                    log::error!("telemetry task gone, records lost for the rest of the run");
                }
            }
        }

        log_elapsed += tick.dt();
        if log_elapsed > RATE_LOG_INTERVAL {
            log_elapsed = 0.0;
            log::info!("control task running at {:.0} Hz", 1.0 / tick.dt().max(1e-9));
        }
    }

    // Safe state before any sensor task is allowed to wind down. The gate
    // is raised even when zeroing fails so a waiting sensor task is not
    // stranded; the error still propagates to the supervisor.
    let zeroed = actuator.zero();
    actuator_safed.signal();
    zeroed?;
    output.publish(Vector4::zeros());
    log::info!("control task exiting, outputs zeroed");
    Ok(())
}

/// Telemetry task: drain the record channel into the CSV sink.
///
/// Uses a short receive timeout so the shutdown flag is observed promptly
/// even when no records arrive; drains any backlog before flushing.
pub fn telemetry_task(
    records: Receiver<TelemetryRecord>,
    mut sink: CsvSink,
    shutdown: ShutdownToken,
) -> io::Result<()> {
    log::info!("telemetry task started");
    loop {
        match records.recv_timeout(Duration::from_millis(100)) {
            Ok(record) => sink.write_record(&record)?,
            Err(RecvTimeoutError::Timeout) => {
                if shutdown.is_requested() {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
        if shutdown.is_requested() && records.is_empty() {
            break;
        }
    }
    while let Ok(record) = records.try_recv() {
        sink.write_record(&record)?;
    }
    sink.flush()?;
    log::info!("telemetry task exiting, sink flushed");
    Ok(())
}

fn unix_time() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
