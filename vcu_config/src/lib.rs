#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and calibration parsing for the vehicle control unit.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Pedal maps load from CSV (`raw,torque`) with strict headers and a
//!   monotonicity check on the raw column; a broken map must never reach
//!   the interpolator.
use serde::Deserialize;
use serde::de::Deserializer;

/// Calibration CSV schema.
///
/// Expected headers:
/// raw,torque
///
/// Example:
/// raw,torque
/// 60,0
/// 900,32500
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct CalibrationRow {
    pub raw: i32,
    pub torque: i32,
}

/// Scheduler tick and task periods, all in milliseconds of wall time.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SchedulerCfg {
    /// Period of one scheduler tick.
    pub tick_ms: u64,
    /// Motor command transmit period.
    pub motor_tx_ms: u64,
    /// Telemetry frame transmit period.
    pub telemetry_ms: u64,
    /// BMS handshake/poll period.
    pub bms_poll_ms: u64,
}

impl Default for SchedulerCfg {
    fn default() -> Self {
        Self {
            tick_ms: 1,
            motor_tx_ms: 10,
            telemetry_ms: 10,
            bms_poll_ms: 100,
        }
    }
}

/// Smoothing applied to the raw pedal/brake ADC streams. The concrete
/// window sizes and ratios are compile-time constants in the core; this
/// only selects which instantiation runs.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PedalFilter {
    #[default]
    Average,
    Exponential,
    None,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PedalCfg {
    /// Disagreement threshold between the two APPS channels, in tenths of a
    /// percent of full scale. 100 = 10 %, the rulebook figure.
    pub diff_threshold_tenths: u16,
    /// How long a disagreement may persist before the latching trip, ms.
    pub diff_trip_ms: u64,
    /// Consecutive compliant ticks required to clear the latched trip.
    pub latch_clear_ticks: u32,
    /// ADC count below which an APPS channel reads as shorted to ground.
    pub apps_low: u16,
    /// ADC count above which an APPS channel reads as shorted to rail.
    pub apps_high: u16,
    pub brake_low: u16,
    pub brake_high: u16,
    /// Enable regenerative braking torque from the brake map.
    pub regen_enabled: bool,
    /// Flip the sign of the torque command (motor mounted reversed).
    pub flip_motor_dir: bool,
    /// Throttle% + brake% (tenths) above which both pedals count as pressed.
    pub screenshot_threshold_tenths: u16,
    pub filter: PedalFilter,
}

impl Default for PedalCfg {
    fn default() -> Self {
        Self {
            diff_threshold_tenths: 100,
            diff_trip_ms: 100,
            latch_clear_ticks: 2,
            apps_low: 30,
            apps_high: 950,
            brake_low: 30,
            brake_high: 950,
            regen_enabled: false,
            flip_motor_dir: false,
            screenshot_threshold_tenths: 800,
            filter: PedalFilter::Average,
        }
    }
}

/// Startup-sequence timing for the car state machine.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CarCfg {
    /// Hold time of start button + full brake before the buzzer phase, ms.
    pub starting_ms: u64,
    /// Buzzer phase duration, ms.
    pub bussing_ms: u64,
    /// ADC count above which the brake counts as pressed (brake light).
    pub brake_threshold: u16,
}

impl Default for CarCfg {
    fn default() -> Self {
        Self {
            starting_ms: 2000,
            bussing_ms: 2000,
            brake_threshold: 130,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BmsCfg {
    /// False builds a car without a battery subsystem (status `Unused`).
    pub enabled: bool,
    /// Silence window after which the link state decays one step, ms.
    pub timeout_ms: u64,
}

impl Default for BmsCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 500,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TelemetryCfg {
    /// Send the state frame every N telemetry cycles.
    pub state_every: u32,
    /// Within a cycle group, ADC frames every Nth slot, digital otherwise.
    pub adc_digital_ratio: u32,
}

impl Default for TelemetryCfg {
    fn default() -> Self {
        Self {
            state_every: 10,
            adc_digital_ratio: 2,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub scheduler: SchedulerCfg,
    pub pedal: PedalCfg,
    pub car: CarCfg,
    pub bms: BmsCfg,
    pub telemetry: TelemetryCfg,
    pub logging: Logging,
    /// Optional inline throttle map; the core's default curve otherwise.
    /// Accepts either an array of tables `[{ raw = 60, torque = 0 }, ...]`
    /// or an array of pairs `[[60, 0], ...]`.
    #[serde(default, deserialize_with = "de_table_points")]
    pub throttle_table: Vec<CalibrationRow>,
    /// Optional inline brake (regen) map, same formats as `throttle_table`.
    #[serde(default, deserialize_with = "de_table_points")]
    pub brake_table: Vec<CalibrationRow>,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PointToml {
    Pair((i32, i32)),
    Table { raw: i32, torque: i32 },
}

fn de_table_points<'de, D>(deserializer: D) -> Result<Vec<CalibrationRow>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<Vec<PointToml>> = Option::deserialize(deserializer)?;
    let mut out = Vec::new();
    if let Some(items) = opt {
        for p in items {
            match p {
                PointToml::Pair((raw, torque)) => out.push(CalibrationRow { raw, torque }),
                PointToml::Table { raw, torque } => out.push(CalibrationRow { raw, torque }),
            }
        }
    }
    Ok(out)
}

/// Reject rows whose raw column is not strictly increasing. The interpolator
/// re-checks this, but a CSV edited by hand should fail with a row number.
fn check_monotonic(rows: &[CalibrationRow]) -> eyre::Result<()> {
    if rows.len() < 2 {
        eyre::bail!("calibration requires at least two rows, got {}", rows.len());
    }
    for i in 1..rows.len() {
        if rows[i].raw <= rows[i - 1].raw {
            eyre::bail!(
                "calibration raw values must be strictly increasing (rows {} and {})",
                i - 1,
                i
            );
        }
    }
    Ok(())
}

pub fn load_calibration_csv(path: &std::path::Path) -> eyre::Result<Vec<CalibrationRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open calibration CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["raw", "torque"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "calibration CSV must have headers 'raw,torque', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<CalibrationRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }

    check_monotonic(&rows)?;
    Ok(rows)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Scheduler
        if self.scheduler.tick_ms == 0 {
            eyre::bail!("scheduler.tick_ms must be >= 1");
        }
        if self.scheduler.tick_ms > 1000 {
            eyre::bail!("scheduler.tick_ms is unreasonably large (>1s)");
        }
        for (name, period) in [
            ("scheduler.motor_tx_ms", self.scheduler.motor_tx_ms),
            ("scheduler.telemetry_ms", self.scheduler.telemetry_ms),
            ("scheduler.bms_poll_ms", self.scheduler.bms_poll_ms),
        ] {
            if period == 0 {
                eyre::bail!("{name} must be >= 1");
            }
            if period < self.scheduler.tick_ms {
                eyre::bail!("{name} must be >= scheduler.tick_ms");
            }
        }

        // Pedal
        if self.pedal.diff_threshold_tenths == 0 || self.pedal.diff_threshold_tenths > 1000 {
            eyre::bail!("pedal.diff_threshold_tenths must be in 1..=1000");
        }
        if self.pedal.diff_trip_ms == 0 {
            eyre::bail!("pedal.diff_trip_ms must be >= 1");
        }
        if self.pedal.diff_trip_ms < self.scheduler.tick_ms {
            eyre::bail!("pedal.diff_trip_ms must be >= scheduler.tick_ms");
        }
        if self.pedal.latch_clear_ticks == 0 {
            eyre::bail!("pedal.latch_clear_ticks must be >= 1");
        }
        if self.pedal.apps_low >= self.pedal.apps_high {
            eyre::bail!("pedal.apps_low must be < pedal.apps_high");
        }
        if self.pedal.brake_low >= self.pedal.brake_high {
            eyre::bail!("pedal.brake_low must be < pedal.brake_high");
        }

        // Car
        if self.car.starting_ms == 0 {
            eyre::bail!("car.starting_ms must be >= 1");
        }
        if self.car.bussing_ms == 0 {
            eyre::bail!("car.bussing_ms must be >= 1");
        }

        // BMS
        if self.bms.enabled && self.bms.timeout_ms == 0 {
            eyre::bail!("bms.timeout_ms must be >= 1 when the BMS link is enabled");
        }

        // Telemetry
        if self.telemetry.state_every == 0 {
            eyre::bail!("telemetry.state_every must be >= 1");
        }
        if self.telemetry.adc_digital_ratio == 0 {
            eyre::bail!("telemetry.adc_digital_ratio must be >= 1");
        }

        // Inline maps (empty means "use built-in curve")
        if !self.throttle_table.is_empty() {
            check_monotonic(&self.throttle_table)?;
        }
        if !self.brake_table.is_empty() {
            check_monotonic(&self.brake_table)?;
        }

        Ok(())
    }
}
