//! Accelerator/brake plausibility supervision and torque mapping.
//!
//! Two redundant accelerator position sensors (5 V and 3.3 V channels) are
//! compared every control tick. A disagreement above 10 % of full travel
//! that persists for the configured window trips a latching fault that cuts
//! torque until the pedals read consistent again. Electrical range checks
//! on all three analog channels pre-empt the disagreement report.

use crate::curves::{self, MAX_TORQUE_OUT};
use crate::error::ConfigError;
use crate::filter::{AverageFilter, ExponentialFilter, Filter};
use crate::interp::LinearInterp;
use crate::util::ticks_for_ms;
use vcu_config::{PedalCfg, PedalFilter};

/// Fault code broadcast on the throttle fault message. Values are a frozen
/// wire contract with the telemetry decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PedalFault {
    #[default]
    None,
    /// First tick the two channels disagreed.
    DiffStart,
    /// Disagreement ongoing, trip window not yet elapsed.
    DiffContinuing,
    /// Disagreement outlasted the trip window; torque is latched off.
    DiffExceeded,
    /// Latch released after the channels read consistent again.
    DiffResolved,
    ThrottleLow,
    ThrottleHigh,
    BrakeLow,
    BrakeHigh,
}

impl PedalFault {
    pub fn wire_code(self) -> u8 {
        match self {
            Self::None => 0x00,
            Self::DiffStart => 0x10,
            Self::DiffContinuing => 0x11,
            Self::DiffExceeded => 0x12,
            Self::DiffResolved => 0x19,
            Self::ThrottleLow => 0x20,
            Self::ThrottleHigh => 0x29,
            Self::BrakeLow => 0x30,
            Self::BrakeHigh => 0x39,
        }
    }

    /// True for every code that must keep the torque command at zero.
    pub fn blocks_torque(self) -> bool {
        !matches!(self, Self::None | Self::DiffResolved)
    }
}

/// Fault byte of the state telemetry frame, one bit per condition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaultBits {
    pub fault_active: bool,
    pub fault_exceeded: bool,
    pub apps_5v_low: bool,
    pub apps_5v_high: bool,
    pub apps_3v3_low: bool,
    pub apps_3v3_high: bool,
    pub brake_low: bool,
    pub brake_high: bool,
}

impl FaultBits {
    pub fn to_byte(self) -> u8 {
        let mut b = 0u8;
        if self.fault_active {
            b |= 0x01;
        }
        if self.fault_exceeded {
            b |= 0x02;
        }
        if self.apps_5v_low {
            b |= 0x04;
        }
        if self.apps_5v_high {
            b |= 0x08;
        }
        if self.apps_3v3_low {
            b |= 0x10;
        }
        if self.apps_3v3_high {
            b |= 0x20;
        }
        if self.brake_low {
            b |= 0x40;
        }
        if self.brake_high {
            b |= 0x80;
        }
        b
    }

    /// Decode a fault byte, for the off-car side of the contract.
    pub fn from_byte(b: u8) -> Self {
        Self {
            fault_active: b & 0x01 != 0,
            fault_exceeded: b & 0x02 != 0,
            apps_5v_low: b & 0x04 != 0,
            apps_5v_high: b & 0x08 != 0,
            apps_3v3_low: b & 0x10 != 0,
            apps_3v3_high: b & 0x20 != 0,
            brake_low: b & 0x40 != 0,
            brake_high: b & 0x80 != 0,
        }
    }
}

/// Result of one pedal evaluation tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct PedalStatus {
    pub fault: PedalFault,
    pub bits: FaultBits,
    /// Accelerator travel in tenths of a percent of full scale.
    pub throttle_tenths: u16,
    /// Brake travel in tenths of a percent of full scale.
    pub brake_tenths: u16,
    /// Torque command in inverter counts; zero whenever any fault is active.
    pub torque: i16,
    /// Both pedals pressed hard at once.
    pub screenshot: bool,
}

/// Per-channel smoothing selected by config. Window sizes and ratios match
/// the acquisition hardware and are not tunable at runtime.
#[derive(Debug, Clone)]
enum SignalFilter {
    Average(AverageFilter<8>),
    Exponential(ExponentialFilter<31, 1>),
    Raw,
}

impl SignalFilter {
    fn new(kind: PedalFilter) -> Self {
        match kind {
            PedalFilter::Average => Self::Average(AverageFilter::new()),
            PedalFilter::Exponential => Self::Exponential(ExponentialFilter::new()),
            PedalFilter::None => Self::Raw,
        }
    }

    fn feed(&mut self, sample: u16) -> i32 {
        match self {
            Self::Average(f) => {
                f.add_sample(i32::from(sample));
                f.filtered()
            }
            Self::Exponential(f) => {
                f.add_sample(i32::from(sample));
                f.filtered()
            }
            Self::Raw => i32::from(sample),
        }
    }
}

/// The pedal plausibility machine.
#[derive(Debug)]
pub struct Pedal {
    throttle_map: LinearInterp,
    brake_map: LinearInterp,
    cfg: PedalCfg,
    trip_ticks: u64,

    apps_5v_filter: SignalFilter,
    apps_3v3_filter: SignalFilter,
    brake_filter: SignalFilter,

    /// Tick the current disagreement started, None when channels agree.
    diff_since: Option<u64>,
    latched: bool,
    good_streak: u32,
}

impl Pedal {
    pub fn new(cfg: &PedalCfg, tick_ms: u64) -> Result<Self, ConfigError> {
        Self::with_maps(
            cfg,
            tick_ms,
            curves::default_throttle_map(),
            curves::default_brake_map(),
        )
    }

    pub fn with_maps(
        cfg: &PedalCfg,
        tick_ms: u64,
        throttle_map: LinearInterp,
        brake_map: LinearInterp,
    ) -> Result<Self, ConfigError> {
        if cfg.diff_threshold_tenths == 0 || cfg.diff_threshold_tenths > 1000 {
            return Err(ConfigError::InvalidConfig(
                "diff threshold must be in 1..=1000 tenths",
            ));
        }
        if cfg.apps_low >= cfg.apps_high || cfg.brake_low >= cfg.brake_high {
            return Err(ConfigError::InvalidConfig(
                "plausibility window bounds are inverted",
            ));
        }
        Ok(Self {
            throttle_map,
            brake_map,
            trip_ticks: ticks_for_ms(cfg.diff_trip_ms, tick_ms),
            apps_5v_filter: SignalFilter::new(cfg.filter),
            apps_3v3_filter: SignalFilter::new(cfg.filter),
            brake_filter: SignalFilter::new(cfg.filter),
            cfg: cfg.clone(),
            diff_since: None,
            latched: false,
            good_streak: 0,
        })
    }

    /// True while the disagreement latch holds torque at zero.
    pub fn latched(&self) -> bool {
        self.latched
    }

    /// Evaluate one tick of raw ADC input. `tick` is the scheduler counter.
    pub fn evaluate(&mut self, apps_5v: u16, apps_3v3: u16, brake: u16, tick: u64) -> PedalStatus {
        let apps_a = self.apps_5v_filter.feed(apps_5v);
        let apps_b_scaled = curves::rescale_apps_3v3(apps_3v3);
        let apps_b = self.apps_3v3_filter.feed(apps_b_scaled.clamp(0, u16::MAX as i32) as u16);
        let brake_f = self.brake_filter.feed(brake);

        let mut bits = FaultBits {
            apps_5v_low: apps_a < i32::from(self.cfg.apps_low),
            apps_5v_high: apps_a > i32::from(self.cfg.apps_high),
            apps_3v3_low: apps_b < i32::from(self.cfg.apps_low),
            apps_3v3_high: apps_b > i32::from(self.cfg.apps_high),
            brake_low: brake_f < i32::from(self.cfg.brake_low),
            brake_high: brake_f > i32::from(self.cfg.brake_high),
            ..FaultBits::default()
        };

        let throttle_tenths = travel_tenths(apps_a, self.cfg.apps_low, self.cfg.apps_high);
        let throttle_b_tenths = travel_tenths(apps_b, self.cfg.apps_low, self.cfg.apps_high);
        let brake_tenths = travel_tenths(brake_f, self.cfg.brake_low, self.cfg.brake_high);

        let diff = throttle_tenths.abs_diff(throttle_b_tenths);
        let diff_fault = self.step_diff(diff, tick);

        bits.fault_active = self.diff_since.is_some() || self.latched;
        bits.fault_exceeded = self.latched;

        let fault = self.pick_fault(&bits, diff_fault);

        let torque = if fault.blocks_torque() {
            0
        } else {
            self.torque_counts(apps_a, brake_f, throttle_tenths)
        };

        let screenshot = u32::from(throttle_tenths) + u32::from(brake_tenths)
            >= u32::from(self.cfg.screenshot_threshold_tenths);

        PedalStatus {
            fault,
            bits,
            throttle_tenths,
            brake_tenths,
            torque,
            screenshot,
        }
    }

    /// Advance the disagreement window and latch.
    fn step_diff(&mut self, diff_tenths: u16, tick: u64) -> PedalFault {
        let over = diff_tenths > self.cfg.diff_threshold_tenths;

        if self.latched {
            if over {
                self.good_streak = 0;
            } else {
                self.good_streak += 1;
                if self.good_streak >= self.cfg.latch_clear_ticks {
                    self.latched = false;
                    self.diff_since = None;
                    self.good_streak = 0;
                    return PedalFault::DiffResolved;
                }
            }
            return PedalFault::DiffExceeded;
        }

        if !over {
            // Recovery before the trip still reports the resolution once.
            if self.diff_since.take().is_some() {
                return PedalFault::DiffResolved;
            }
            return PedalFault::None;
        }

        self.good_streak = 0;
        match self.diff_since {
            None => {
                self.diff_since = Some(tick);
                PedalFault::DiffStart
            }
            // The starting tick counts toward the window.
            Some(since) if tick.saturating_sub(since) + 1 >= self.trip_ticks => {
                self.latched = true;
                tracing::warn!(diff_tenths, "pedal disagreement exceeded trip window");
                PedalFault::DiffExceeded
            }
            Some(_) => PedalFault::DiffContinuing,
        }
    }

    /// Range faults outrank the disagreement report on the wire.
    fn pick_fault(&self, bits: &FaultBits, diff_fault: PedalFault) -> PedalFault {
        if bits.apps_5v_low || bits.apps_3v3_low {
            PedalFault::ThrottleLow
        } else if bits.apps_5v_high || bits.apps_3v3_high {
            PedalFault::ThrottleHigh
        } else if bits.brake_low {
            PedalFault::BrakeLow
        } else if bits.brake_high {
            PedalFault::BrakeHigh
        } else {
            diff_fault
        }
    }

    fn torque_counts(&self, apps: i32, brake: i32, throttle_tenths: u16) -> i16 {
        let mut torque = self
            .throttle_map
            .interp(apps)
            .clamp(0, MAX_TORQUE_OUT);

        // Regen only while the accelerator is released; both maps never
        // command torque at once.
        if self.cfg.regen_enabled && throttle_tenths == 0 && brake >= self.brake_map.start() {
            torque = self.brake_map.interp(brake).clamp(-MAX_TORQUE_OUT, 0);
        }

        if self.cfg.flip_motor_dir {
            torque = -torque;
        }
        torque as i16
    }
}

/// Travel as tenths of a percent of the active window, clamped.
fn travel_tenths(raw: i32, low: u16, high: u16) -> u16 {
    let low = i32::from(low);
    let high = i32::from(high);
    let clamped = raw.clamp(low, high);
    let span = i64::from(high - low);
    ((i64::from(clamped - low) * 1000 / span) as u16).min(1000)
}
