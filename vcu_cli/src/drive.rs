//! Session assembly: config mapping, simulated hardware, and the run loop.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use eyre::WrapErr;
use vcu_config::Config;
use vcu_core::rx::CanRxPump;
use vcu_core::runner::DriveSession;
use vcu_hardware::{SimulatedBms, SimulatedDriver};
use vcu_traits::MonotonicClock;

/// Outcome summary printed after a session ends.
#[derive(Debug)]
pub struct SessionStats {
    pub car_status: vcu_core::CarStatus,
    pub overruns: u64,
    pub tx_errors: u64,
}

/// Load the TOML config and fold in any calibration CSV overrides.
pub fn load_config(
    path: &Path,
    throttle_map: Option<&Path>,
    brake_map: Option<&Path>,
) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let mut cfg = vcu_config::load_toml(&text)
        .map_err(|e| eyre::eyre!("parse config {}: {}", path.display(), e))?;

    if let Some(p) = throttle_map {
        cfg.throttle_table =
            vcu_config::load_calibration_csv(p).wrap_err("load throttle map CSV")?;
    }
    if let Some(p) = brake_map {
        cfg.brake_table = vcu_config::load_calibration_csv(p).wrap_err("load brake map CSV")?;
    }

    cfg.validate()?;
    Ok(cfg)
}

/// Build a session wired to the simulated car: scripted driver, scripted
/// battery pack, loopback telemetry.
pub fn build_sim_session(cfg: &Config) -> eyre::Result<DriveSession> {
    let bms = SimulatedBms::new();
    let rx = CanRxPump::spawn(bms.clone(), 1_000, MonotonicClock::new());
    // Telemetry goes out one end of a virtual wire; the far end is left for
    // an attached decoder and simply buffers.
    let (telemetry_bus, _decoder_end) = vcu_hardware::loopback_pair();

    // Hold the button and brake long enough to cover start plus buzzer.
    let arming_ms = cfg.car.starting_ms + cfg.car.bussing_ms + 500;
    let driver = SimulatedDriver::new(arming_ms / cfg.scheduler.tick_ms.max(1));

    DriveSession::new(
        cfg,
        Box::new(driver),
        Box::new(bms),
        Box::new(telemetry_bus),
        Some(rx),
    )
}

/// Run the session until Ctrl-C or the optional duration elapses.
pub fn run_drive(cfg: &Config, duration_ms: Option<u64>) -> eyre::Result<SessionStats> {
    let mut session = build_sim_session(cfg)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            tracing::info!("shutdown requested");
            shutdown.store(true, Ordering::Relaxed);
        })
        .wrap_err("install Ctrl-C handler")?;
    }
    if let Some(ms) = duration_ms {
        let shutdown = shutdown.clone();
        std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(ms));
            shutdown.store(true, Ordering::Relaxed);
        });
    }

    session.run(&MonotonicClock::new(), &shutdown)?;

    Ok(SessionStats {
        car_status: session.snapshot().car_status,
        overruns: session.overruns(),
        tx_errors: session.tx_errors(),
    })
}

/// Assemble the simulated stack and step it a few ticks.
pub fn self_check(cfg: &Config) -> eyre::Result<()> {
    let mut session = build_sim_session(cfg)?;
    session.run_for_ticks(10)?;
    Ok(())
}

/// The frozen CAN identifier map, for decoder tooling.
pub fn contract_json() -> serde_json::Value {
    use vcu_traits::frame;
    serde_json::json!({
        "motor_command": frame::MOTOR_COMMAND,
        "throttle_in": frame::THROTTLE_IN_MSG,
        "throttle_out": frame::THROTTLE_OUT_MSG,
        "throttle_fault": frame::THROTTLE_FAULT_MSG,
        "car": frame::CAR_MSG,
        "car_change": frame::STA_CAR_CHANGE_MSG,
        "brake": frame::BRAKE_MSG,
        "bms": frame::BMS_MSG,
        "hall": frame::HALL_SENSOR_MSG,
        "adc": frame::ADC_MSG,
        "digital": frame::DIGITAL_MSG,
        "state": frame::STATE_MSG,
        "bms_command_ext": frame::BMS_COMMAND,
        "bms_info_ext": frame::BMS_INFO,
    })
}
