//! Bench and simulation backends for the control core.
//!
//! Nothing here talks to a real transceiver: the crate provides a virtual
//! CAN wire, a scripted driver and a scripted battery pack so the whole
//! stack can run on a development host exactly as it runs on the car.

pub mod error;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use vcu_traits::frame::{BMS_INFO_EXT, BMS_SEND_CMD};
use vcu_traits::{CanBus, CanFrame, InputSample, Inputs};

/// One endpoint of a virtual CAN wire. Frames transmitted on one endpoint
/// appear on the other's receive side, in order.
pub struct LoopbackBus {
    rx: Arc<Mutex<VecDeque<CanFrame>>>,
    tx: Arc<Mutex<VecDeque<CanFrame>>>,
}

/// Build both ends of a virtual wire.
pub fn loopback_pair() -> (LoopbackBus, LoopbackBus) {
    let a = Arc::new(Mutex::new(VecDeque::new()));
    let b = Arc::new(Mutex::new(VecDeque::new()));
    (
        LoopbackBus {
            rx: a.clone(),
            tx: b.clone(),
        },
        LoopbackBus { rx: b, tx: a },
    )
}

impl CanBus for LoopbackBus {
    fn receive(&mut self) -> Result<Option<CanFrame>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.rx.lock().ok().and_then(|mut q| q.pop_front()))
    }

    fn transmit(
        &mut self,
        frame: &CanFrame,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.tx
            .lock()
            .map_err(|_| {
                Box::new(error::HwError::Bus("loopback poisoned".into()))
                    as Box<dyn std::error::Error + Send + Sync>
            })?
            .push_back(*frame);
        Ok(())
    }
}

/// Scripted battery pack: answers every info poll, walking its operating
/// mode from standby through precharge to run so a simulated car can arm.
///
/// Clones share state; give one clone to the transmit path and one to the
/// receive pump.
#[derive(Clone, Default)]
pub struct SimulatedBms {
    inner: Arc<Mutex<BmsSim>>,
}

struct BmsSim {
    polls_seen: u32,
    pending: VecDeque<CanFrame>,
    /// Pack voltage in decivolts, drained slowly while running.
    voltage_dv: u16,
    soc_pct: u8,
}

impl Default for BmsSim {
    fn default() -> Self {
        Self {
            polls_seen: 0,
            pending: VecDeque::new(),
            voltage_dv: 4000, // 400.0 V
            soc_pct: 95,
        }
    }
}

impl SimulatedBms {
    pub fn new() -> Self {
        Self::default()
    }

    fn info_frame(sim: &BmsSim) -> CanFrame {
        let mode: u8 = match sim.polls_seen {
            0..=1 => 0x30, // standby
            2..=3 => 0x40, // precharge
            _ => 0x50,     // run
        };
        let v = sim.voltage_dv.to_le_bytes();
        let mut payload = [0u8; 8];
        payload[0] = v[0];
        payload[1] = v[1];
        payload[4] = sim.soc_pct;
        payload[6] = mode;
        CanFrame::new(BMS_INFO_EXT, &payload)
    }
}

impl CanBus for SimulatedBms {
    fn receive(&mut self) -> Result<Option<CanFrame>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.inner.lock().ok().and_then(|mut g| g.pending.pop_front()))
    }

    fn transmit(
        &mut self,
        frame: &CanFrame,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if frame.id != BMS_SEND_CMD {
            // Motor commands and other traffic terminate here.
            return Ok(());
        }
        if let Ok(mut g) = self.inner.lock() {
            g.polls_seen += 1;
            if g.polls_seen > 4 && g.voltage_dv > 3200 {
                g.voltage_dv -= 1;
            }
            let reply = Self::info_frame(&g);
            tracing::trace!(mode = reply.data[6], polls = g.polls_seen, "bms poll answered");
            g.pending.push_back(reply);
        }
        Ok(())
    }
}

/// Scripted driver: holds start button and brake until the car has had time
/// to arm, then sweeps the accelerator up and down. Both APPS channels stay
/// consistent, so a simulated session never faults.
pub struct SimulatedDriver {
    sample_idx: u64,
    /// Samples spent holding button + brake before driving off.
    arming_samples: u64,
}

impl SimulatedDriver {
    pub fn new(arming_samples: u64) -> Self {
        Self {
            sample_idx: 0,
            arming_samples,
        }
    }

    /// Accelerator travel percent for the driving phase, a 0-95-0 triangle.
    fn throttle_pct(&self) -> u32 {
        let t = (self.sample_idx - self.arming_samples) % 200;
        let pct = if t < 100 { t } else { 200 - t };
        (pct as u32 * 95) / 100
    }
}

impl Inputs for SimulatedDriver {
    fn sample(&mut self) -> Result<InputSample, Box<dyn std::error::Error + Send + Sync>> {
        let s = if self.sample_idx < self.arming_samples {
            InputSample {
                apps_5v: 60,
                apps_3v3: 40,
                brake: 400,
                hall: 0,
                start_button: true,
            }
        } else {
            let pct = self.throttle_pct();
            let apps_5v = (30 + (950 - 30) * pct / 100) as u16;
            let apps_3v3 = (u32::from(apps_5v) * 33 / 50) as u16;
            InputSample {
                apps_5v,
                apps_3v3,
                brake: 60,
                hall: (pct * 3) as u16,
                start_button: false,
            }
        };
        self.sample_idx += 1;
        Ok(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_carries_frames_both_ways() {
        let (mut a, mut b) = loopback_pair();
        a.transmit(&CanFrame::new(0x100, &[1])).unwrap();
        b.transmit(&CanFrame::new(0x200, &[2])).unwrap();
        assert_eq!(b.receive().unwrap().unwrap().id, 0x100);
        assert_eq!(a.receive().unwrap().unwrap().id, 0x200);
        assert!(a.receive().unwrap().is_none());
    }

    #[test]
    fn simulated_bms_walks_to_run_mode() {
        let mut bms = SimulatedBms::new();
        let poll = CanFrame::new(BMS_SEND_CMD, &[0x01, 0x01]);
        let mut modes = Vec::new();
        for _ in 0..6 {
            bms.transmit(&poll).unwrap();
            let reply = bms.receive().unwrap().unwrap();
            assert_eq!(reply.id, BMS_INFO_EXT);
            modes.push(reply.payload()[6]);
        }
        assert_eq!(modes, vec![0x30, 0x30, 0x40, 0x40, 0x50, 0x50]);
    }

    #[test]
    fn simulated_bms_ignores_other_traffic() {
        let mut bms = SimulatedBms::new();
        bms.transmit(&CanFrame::new(0x201, &[0x90, 0, 0])).unwrap();
        assert!(bms.receive().unwrap().is_none());
    }

    #[test]
    fn driver_arms_then_sweeps_consistently() {
        let mut d = SimulatedDriver::new(10);
        for _ in 0..10 {
            let s = d.sample().unwrap();
            assert!(s.start_button);
            assert!(s.brake >= 130);
        }
        for _ in 0..400 {
            let s = d.sample().unwrap();
            assert!(!s.start_button);
            // Channels must rescale onto each other within rounding.
            let rescaled = u32::from(s.apps_3v3) * 50 / 33;
            assert!((i64::from(s.apps_5v) - i64::from(rescaled)).abs() <= 2);
        }
    }
}
