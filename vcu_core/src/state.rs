//! Ready-to-drive sequencing.
//!
//! The car arms in stages: the driver holds the start button with the brake
//! pressed while the pack is live, the buzzer sounds for the mandated
//! window, then torque is enabled. Losing high voltage, a force stop or an
//! accelerator press before the sequence completes all drop the machine
//! back to idle.

use crate::util::ticks_for_ms;
use vcu_config::CarCfg;

/// Drive-enable stage, two bits on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CarStatus {
    #[default]
    Init,
    /// Button and brake held, hold timer running.
    Starting,
    /// Ready-to-drive buzzer sounding.
    Bussing,
    Drive,
}

impl CarStatus {
    pub fn wire_code(self) -> u8 {
        match self {
            Self::Init => 0,
            Self::Starting => 1,
            Self::Bussing => 2,
            Self::Drive => 3,
        }
    }

    /// Decode the two stage bits of the state frame.
    pub fn from_wire(code: u8) -> Self {
        match code & 0x03 {
            1 => Self::Starting,
            2 => Self::Bussing,
            3 => Self::Drive,
            _ => Self::Init,
        }
    }
}

/// Inputs sampled each tick that drive the sequencing machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct CarInputs {
    pub start_button: bool,
    /// Raw brake ADC count, compared against the configured threshold.
    pub brake_raw: u16,
    pub hv_ready: bool,
    /// Latched pedal fault demanding zero torque.
    pub force_stop: bool,
    /// Accelerator past its deadzone (positive torque demand).
    pub throttle_pressed: bool,
}

#[derive(Debug)]
pub struct CarState {
    status: CarStatus,
    /// Tick the current stage was entered.
    entered_at: u64,
    starting_ticks: u64,
    bussing_ticks: u64,
    brake_threshold: u16,
    force_stop: bool,
    brake_pressed: bool,
    /// No update has run yet; telemetry reports the state as unknown.
    unknown: bool,
    changed: Option<(CarStatus, CarStatus)>,
}

impl CarState {
    pub fn new(cfg: &CarCfg, tick_ms: u64) -> Self {
        Self {
            status: CarStatus::Init,
            entered_at: 0,
            starting_ticks: ticks_for_ms(cfg.starting_ms, tick_ms),
            bussing_ticks: ticks_for_ms(cfg.bussing_ms, tick_ms),
            brake_threshold: cfg.brake_threshold,
            force_stop: false,
            brake_pressed: false,
            unknown: true,
            changed: None,
        }
    }

    pub fn status(&self) -> CarStatus {
        self.status
    }

    pub fn is_unknown(&self) -> bool {
        self.unknown
    }

    pub fn force_stop(&self) -> bool {
        self.force_stop
    }

    /// Brake light output.
    pub fn brake_pressed(&self) -> bool {
        self.brake_pressed
    }

    /// Ready-to-drive buzzer output.
    pub fn buzzer_on(&self) -> bool {
        self.status == CarStatus::Bussing
    }

    /// Torque may flow only in drive with no latched fault.
    pub fn drive_enabled(&self) -> bool {
        self.status == CarStatus::Drive && !self.force_stop
    }

    /// Stage transition since the last call, oldest wins if several occurred.
    pub fn take_changed(&mut self) -> Option<(CarStatus, CarStatus)> {
        self.changed.take()
    }

    /// Advance the machine one scheduler tick.
    pub fn update(&mut self, inputs: &CarInputs, tick: u64) {
        self.unknown = false;
        self.force_stop = inputs.force_stop;
        self.brake_pressed = inputs.brake_raw >= self.brake_threshold;

        // A latched fault drops straight back to idle; the driver re-arms
        // once it clears.
        if inputs.force_stop {
            self.enter(CarStatus::Init, tick);
            return;
        }

        // HV loss aborts the sequence from any stage.
        if !inputs.hv_ready && self.status != CarStatus::Init {
            self.enter(CarStatus::Init, tick);
            return;
        }

        // Pressing the accelerator before the sequence completes aborts it.
        if inputs.throttle_pressed && self.status != CarStatus::Drive {
            self.enter(CarStatus::Init, tick);
            return;
        }

        match self.status {
            CarStatus::Init => {
                if inputs.hv_ready && inputs.start_button && self.brake_pressed {
                    self.enter(CarStatus::Starting, tick);
                }
            }
            CarStatus::Starting => {
                // Releasing either control restarts the hold.
                if !inputs.start_button || !self.brake_pressed {
                    self.enter(CarStatus::Init, tick);
                } else if tick.saturating_sub(self.entered_at) >= self.starting_ticks {
                    self.enter(CarStatus::Bussing, tick);
                }
            }
            CarStatus::Bussing => {
                if tick.saturating_sub(self.entered_at) >= self.bussing_ticks {
                    self.enter(CarStatus::Drive, tick);
                }
            }
            CarStatus::Drive => {}
        }
    }

    fn enter(&mut self, next: CarStatus, tick: u64) {
        if next == self.status {
            return;
        }
        tracing::info!(from = ?self.status, to = ?next, tick, "car stage change");
        let prev = self.status;
        self.status = next;
        self.entered_at = tick;
        if self.changed.is_none() {
            self.changed = Some((prev, next));
        } else if let Some((first, _)) = self.changed {
            self.changed = Some((first, next));
        }
    }
}
