//! Testbed flight control entry point.
//!
//! Runs the startup calibration phase (gyro bias, initial orientation),
//! then spawns the sensor, control, and telemetry tasks and joins them on
//! shutdown. Currently wired to the mock HAT drivers; swapping in real
//! drivers is a matter of constructing different `hat-drivers` types here.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use nalgebra::Vector3;

use attitude_control::{
    ActuationMapper, AttitudeController, ControlLimits, EncoderCalibration,
    EncoderDifferentiator, GainSet, OrientationEstimator, ParamTable, TelemetryRecord,
    DEFAULT_OVERRUN_FACTOR,
};
use flight_software::{
    collect_samples, control_task, sensor_task, telemetry_task, ControlTaskConfig, CsvSink, Latest,
    Readiness, SensorTaskConfig, ShutdownToken,
};
use hat_drivers::mock::{MockEncoders, MockImu, RecordingActuator};
use hat_drivers::ImuDriver;

/// Quadrotor testbed attitude control runtime.
#[derive(Parser, Debug)]
#[command(name = "testbed")]
#[command(about = "Fixed-rate attitude control loop for the quadrotor testbed")]
#[command(version)]
struct Args {
    /// Parameter file (flat JSON object). Missing keys use documented defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for the telemetry CSV file.
    #[arg(long, default_value = ".")]
    log_dir: PathBuf,

    /// Run duration in seconds.
    #[arg(long, default_value = "5.0")]
    duration: f64,

    /// Delay between calibration samples in seconds (0 for mock drivers).
    #[arg(long, default_value = "0.0")]
    calibration_period: f64,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let params = match &args.config {
        Some(path) => ParamTable::from_file(path)
            .with_context(|| format!("loading parameters from {}", path.display()))?,
        None => {
            log::warn!("no parameter file given, using defaults throughout");
            ParamTable::empty()
        }
    };

    let gains = GainSet::from_params(&params);
    let limits = ControlLimits::from_params(&params);
    let mapper = ActuationMapper::from_params(&params);
    let sensor_config = SensorTaskConfig {
        sample_hz: params.scalar("clock/sensor_hz", 400.0),
        sub_period: params.scalar("filter/period", 0.01),
    };
    let control_config = ControlTaskConfig {
        control_hz: params.scalar("clock/control_hz", 200.0),
        overrun_factor: params.scalar("clock/overrun_factor", DEFAULT_OVERRUN_FACTOR),
        thrust: params.scalar("command/thrust", 0.5),
    };
    let pole = params.scalar("filter/pole", 50.0);
    let direction = params.vec3("encoders/direction", Vector3::new(1.0, 1.0, 1.0));

    // Drivers. Sensor availability is a startup failure: no control without
    // a working IMU.
    let mut imu = MockImu::stationary();
    imu.probe().context("IMU probe failed, refusing to start")?;
    let encoders = MockEncoders::default();
    let actuator = RecordingActuator::new();

    // Calibration phase: must finish before the first control cycle.
    let calibration_period = Duration::from_secs_f64(args.calibration_period);
    let mut estimator = OrientationEstimator::new();
    let samples = collect_samples(
        &mut imu,
        attitude_control::imu::CALIBRATION_SAMPLES,
        calibration_period,
    )
    .context("gyro calibration read failed")?;
    estimator.calibrate_gyro(samples);
    let samples = collect_samples(
        &mut imu,
        attitude_control::imu::CALIBRATION_SAMPLES,
        calibration_period,
    )
    .context("initial orientation read failed")?;
    let bias_angles = estimator.capture_initial_orientation(samples);
    let calibration = EncoderCalibration {
        direction,
        bias: bias_angles.as_vector(),
    };

    let sink = CsvSink::create(&args.log_dir).context("creating telemetry sink")?;

    // Shared signals. `safed` latches once the control task has driven the
    // actuator to the safe state; the sensor task blocks on it at shutdown
    // so its sensors outlive the actuator.
    let shutdown = ShutdownToken::new();
    let ready = Readiness::new();
    let safed = Readiness::new();
    let estimate = Latest::new();
    let command: Latest<Vector3<f64>> = Latest::new();
    let output = Latest::new();
    let (telemetry_tx, telemetry_rx) = crossbeam_channel::bounded::<TelemetryRecord>(1024);

    // A failing task can only communicate shutdown through the shared flag;
    // the wrappers raise it so the surviving tasks finalize promptly.
    let sensor = {
        let (estimate, ready, safed) = (estimate.clone(), ready.clone(), safed.clone());
        let peer_ready = ready.clone();
        let (task_shutdown, peer_shutdown) = (shutdown.clone(), shutdown.clone());
        let differentiator = EncoderDifferentiator::with_pole(pole, sensor_config.sub_period);
        std::thread::spawn(move || {
            let result = sensor_task(
                imu,
                encoders,
                estimator,
                calibration,
                differentiator,
                sensor_config,
                estimate,
                ready,
                safed,
                task_shutdown,
            );
            if let Err(err) = &result {
                log::error!("sensor task failed: {err}");
                peer_shutdown.request();
                // Unblock a control task still waiting for the first
                // estimate; it will observe the shutdown flag and exit.
                peer_ready.signal();
            }
            result
        })
    };
    let control = {
        let (estimate, ready, safed) = (estimate.clone(), ready.clone(), safed.clone());
        let (task_shutdown, peer_shutdown) = (shutdown.clone(), shutdown.clone());
        let (command, output) = (command.clone(), output.clone());
        let controller = AttitudeController::new(gains, limits);
        let driver = actuator.clone();
        std::thread::spawn(move || {
            let result = control_task(
                driver,
                controller,
                mapper,
                control_config,
                estimate,
                command,
                output,
                telemetry_tx,
                ready,
                safed,
                task_shutdown,
            );
            if let Err(err) = &result {
                log::error!("control task failed: {err}");
                peer_shutdown.request();
            }
            result
        })
    };
    let telemetry = {
        let shutdown = shutdown.clone();
        std::thread::spawn(move || telemetry_task(telemetry_rx, sink, shutdown))
    };

    log::info!("running for {:.1} s", args.duration);
    std::thread::sleep(Duration::from_secs_f64(args.duration));
    shutdown.request();

    // The sensor task blocks on the safing gate, so join order here is just
    // error-reporting order; the actuator is zeroed regardless.
    control
        .join()
        .expect("control task panicked")
        .context("control task failed")?;
    sensor
        .join()
        .expect("sensor task panicked")
        .context("sensor task failed")?;
    telemetry
        .join()
        .expect("telemetry task panicked")
        .context("telemetry task failed")?;

    log::info!("shutdown complete");
    Ok(())
}
