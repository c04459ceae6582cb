//! Built-in pedal maps and electrical limits of the reference pedal box.
//!
//! Values were measured on the actual car; a config file can override the
//! maps but the ADC plausibility window stays fixed to the sensor wiring.

use crate::error::ConfigError;
use crate::interp::{LinearInterp, TablePoint};

/// Lowest ADC count a healthy APPS channel can produce. Below this the
/// sensor wire is shorted to ground or disconnected.
pub const APPS_MIN: u16 = 30;
/// Highest ADC count a healthy APPS channel can produce.
pub const APPS_MAX: u16 = 950;
/// Brake transducer plausibility window, same wiring as the APPS channels.
pub const BRAKE_MIN: u16 = 30;
pub const BRAKE_MAX: u16 = 950;

/// The 3.3 V APPS channel reads 33/50 of the 5 V channel for the same pedal
/// travel; multiply by this ratio before comparing the two.
pub const APPS_RATIO_NUM: i32 = 50;
pub const APPS_RATIO_DEN: i32 = 33;

/// Hard ceiling on the torque command sent to the inverter, in inverter
/// counts. Slightly below i16::MAX so the controller's own limiter never
/// sees a saturated value.
pub const MAX_TORQUE_OUT: i32 = 32_430;

/// Default accelerator map: ADC counts to inverter torque counts.
pub const THROTTLE_TABLE: [TablePoint; 5] = [
    TablePoint::new(60, 0),
    TablePoint::new(200, 2_000),
    TablePoint::new(450, 10_000),
    TablePoint::new(700, 25_000),
    TablePoint::new(900, 32_500),
];

/// Default regenerative braking map: brake ADC counts to negative torque.
pub const BRAKE_TABLE: [TablePoint; 5] = [
    TablePoint::new(60, 0),
    TablePoint::new(250, -15_000),
    TablePoint::new(500, -26_000),
    TablePoint::new(750, -31_000),
    TablePoint::new(900, -32_500),
];

/// Rescale a 3.3 V APPS reading onto the 5 V channel's scale.
#[inline]
pub fn rescale_apps_3v3(raw: u16) -> i32 {
    i32::from(raw) * APPS_RATIO_NUM / APPS_RATIO_DEN
}

pub fn default_throttle_map() -> LinearInterp {
    // The built-in tables satisfy the interpolator's invariants.
    LinearInterp::from_points_unchecked(THROTTLE_TABLE.to_vec())
}

pub fn default_brake_map() -> LinearInterp {
    LinearInterp::from_points_unchecked(BRAKE_TABLE.to_vec())
}

/// Build a map from config rows, falling back to the built-in table when the
/// config carries none.
pub fn map_from_rows(
    rows: &[vcu_config::CalibrationRow],
    default: fn() -> LinearInterp,
) -> Result<LinearInterp, ConfigError> {
    if rows.is_empty() {
        return Ok(default());
    }
    LinearInterp::new(
        rows.iter()
            .map(|r| TablePoint::new(r.raw, r.torque))
            .collect(),
    )
}
