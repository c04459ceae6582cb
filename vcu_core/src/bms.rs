//! Battery management system link supervision.
//!
//! The BMS answers periodic poll frames on an extended identifier. Its
//! reported operating mode drives the high-voltage readiness the car state
//! machine gates on, and a silence timeout walks the link state back down
//! one step at a time instead of dropping straight to lost.

use crate::util::ticks_for_ms;
use vcu_config::BmsCfg;
use vcu_traits::CanFrame;
use vcu_traits::frame::{BMS_INFO_EXT, BMS_SEND_CMD};

/// Link state of the battery management system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BmsStatus {
    /// Nothing heard since power-on or the link decayed all the way down.
    #[default]
    NoMsg,
    /// BMS alive, pack contactors open (standby).
    Waiting,
    /// Precharge in progress.
    Starting,
    /// Contactors closed, pack on the bus.
    Started,
    /// Car built without a battery subsystem.
    Unused,
}

impl BmsStatus {
    pub fn wire_code(self) -> u8 {
        match self {
            Self::NoMsg => 0,
            Self::Waiting => 1,
            Self::Starting => 2,
            Self::Started => 3,
            Self::Unused => 4,
        }
    }

    /// One step toward lost. `Unused` never decays.
    fn decay(self) -> Self {
        match self {
            Self::Started => Self::Starting,
            Self::Starting => Self::Waiting,
            Self::Waiting | Self::NoMsg => Self::NoMsg,
            Self::Unused => Self::Unused,
        }
    }
}

/// Operating-mode nibble carried in byte 6 of the BMS info payload.
const MODE_STANDBY: u8 = 0x30;
const MODE_PRECHARGE: u8 = 0x40;
const MODE_RUN: u8 = 0x50;

#[derive(Debug)]
pub struct BmsTracker {
    status: BmsStatus,
    /// Raw pack data bytes forwarded verbatim into the state telemetry frame.
    data: [u8; 6],
    last_msg_tick: u64,
    heard_once: bool,
    /// A frame arrived on the info identifier with an unexpected payload id.
    wrong_id: bool,
    timeout_ticks: u64,
}

impl BmsTracker {
    pub fn new(cfg: &BmsCfg, tick_ms: u64) -> Self {
        let status = if cfg.enabled {
            BmsStatus::NoMsg
        } else {
            BmsStatus::Unused
        };
        Self {
            status,
            data: [0; 6],
            last_msg_tick: 0,
            heard_once: false,
            wrong_id: false,
            timeout_ticks: ticks_for_ms(cfg.timeout_ms, tick_ms),
        }
    }

    pub fn status(&self) -> BmsStatus {
        self.status
    }

    /// Pack data bytes from the last valid info frame.
    pub fn data(&self) -> [u8; 6] {
        self.data
    }

    pub fn wrong_id(&self) -> bool {
        self.wrong_id
    }

    /// True once the pack reports contactors closed. A car built without a
    /// battery subsystem has no HV gate and always reads ready.
    pub fn hv_ready(&self) -> bool {
        matches!(self.status, BmsStatus::Started | BmsStatus::Unused)
    }

    /// Feed a received frame. Returns true when the frame was consumed.
    pub fn on_frame(&mut self, frame: &CanFrame, tick: u64) -> bool {
        if self.status == BmsStatus::Unused || frame.id != BMS_INFO_EXT {
            return false;
        }
        let payload = frame.payload();
        if payload.len() < 7 {
            // Truncated info frame: treat like a wrong responder, keep the
            // last known pack data and do not refresh the watchdog.
            self.wrong_id = true;
            tracing::warn!(dlc = frame.dlc, "short BMS info frame");
            return true;
        }

        let mode = payload[6] & 0xF0;
        let status = match mode {
            MODE_STANDBY => BmsStatus::Waiting,
            MODE_PRECHARGE => BmsStatus::Starting,
            MODE_RUN => BmsStatus::Started,
            other => {
                // Unknown responder: keep the last known pack data and link
                // state, and do not refresh the watchdog.
                tracing::warn!(mode = other, "unknown BMS operating mode");
                self.wrong_id = true;
                return true;
            }
        };

        self.wrong_id = false;
        self.data.copy_from_slice(&payload[..6]);
        self.last_msg_tick = tick;
        self.heard_once = true;
        self.status = status;
        true
    }

    /// Advance the silence watchdog one scheduler tick.
    pub fn tick(&mut self, tick: u64) {
        if self.status == BmsStatus::Unused || !self.heard_once {
            return;
        }
        if tick.saturating_sub(self.last_msg_tick) >= self.timeout_ticks {
            let prev = self.status;
            self.status = self.status.decay();
            if self.status != prev {
                tracing::warn!(?prev, now = ?self.status, "BMS link decayed");
                // Restart the window so each further step takes a full timeout.
                self.last_msg_tick = tick;
            }
        }
    }

    /// Poll frame asking the BMS for a pack info report.
    pub fn poll_frame(&self) -> Option<CanFrame> {
        if self.status == BmsStatus::Unused {
            return None;
        }
        Some(CanFrame::new(BMS_SEND_CMD, &[0x01, 0x01]))
    }
}
