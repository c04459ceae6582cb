//! Telemetry frame encoding and broadcast rotation.
//!
//! Three frame shapes share the telemetry slot: raw ADC counts, derived
//! digital values, and the packed car/fault/pack state. Every layout here is
//! a frozen contract with the off-car decoder; all multi-byte fields are
//! little-endian.

use crate::bms::BmsStatus;
use crate::pedal::{FaultBits, PedalFault};
use crate::state::CarStatus;
use vcu_traits::CanFrame;
use vcu_traits::frame::{
    ADC_MSG, BMS_MSG, BRAKE_MSG, CAR_MSG, DIGITAL_MSG, HALL_SENSOR_MSG, MOTOR_COMMAND,
    STA_CAR_CHANGE_MSG, STATE_MSG, THROTTLE_FAULT_MSG, THROTTLE_IN_MSG, THROTTLE_OUT_MSG,
};

/// Everything the telemetry task reads, assembled once per broadcast slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct TelemetrySnapshot {
    // Raw ADC counts.
    pub apps_5v: u16,
    pub apps_3v3: u16,
    pub brake: u16,
    pub hall: u16,

    // Derived values.
    pub motor_rpm: u16,
    pub motor_speed: u16,
    pub apps_3v3_scaled: u16,
    pub torque: i16,

    // Car and fault state.
    pub car_status: CarStatus,
    pub state_unknown: bool,
    pub hv_ready: bool,
    pub bms_status: BmsStatus,
    pub bms_wrong_id: bool,
    pub force_stop: bool,
    pub screenshot: bool,
    pub fault_bits: FaultBits,
    pub bms_data: [u8; 6],
}

/// Raw ADC frame: four unsigned counts.
pub fn encode_adc(snap: &TelemetrySnapshot) -> CanFrame {
    let mut d = [0u8; 8];
    d[0..2].copy_from_slice(&snap.apps_5v.to_le_bytes());
    d[2..4].copy_from_slice(&snap.apps_3v3.to_le_bytes());
    d[4..6].copy_from_slice(&snap.brake.to_le_bytes());
    d[6..8].copy_from_slice(&snap.hall.to_le_bytes());
    CanFrame::new(ADC_MSG, &d)
}

/// Derived-values frame: rpm, speed, rescaled redundant channel, torque.
pub fn encode_digital(snap: &TelemetrySnapshot) -> CanFrame {
    let mut d = [0u8; 8];
    d[0..2].copy_from_slice(&snap.motor_rpm.to_le_bytes());
    d[2..4].copy_from_slice(&snap.motor_speed.to_le_bytes());
    d[4..6].copy_from_slice(&snap.apps_3v3_scaled.to_le_bytes());
    d[6..8].copy_from_slice(&snap.torque.to_le_bytes());
    CanFrame::new(DIGITAL_MSG, &d)
}

/// Packed state frame.
///
/// Byte 0: bits 0-1 car stage, 2 state unknown, 3 HV ready, 4 BMS silent,
/// 5 BMS wrong id, 6 force stop, 7 both pedals pressed.
/// Byte 1: fault bitfield. Bytes 2-7: raw pack data from the BMS.
pub fn encode_state(snap: &TelemetrySnapshot) -> CanFrame {
    let mut d = [0u8; 8];
    let mut b0 = snap.car_status.wire_code() & 0x03;
    if snap.state_unknown {
        b0 |= 0x04;
    }
    if snap.hv_ready {
        b0 |= 0x08;
    }
    if snap.bms_status == BmsStatus::NoMsg {
        b0 |= 0x10;
    }
    if snap.bms_wrong_id {
        b0 |= 0x20;
    }
    if snap.force_stop {
        b0 |= 0x40;
    }
    if snap.screenshot {
        b0 |= 0x80;
    }
    d[0] = b0;
    d[1] = snap.fault_bits.to_byte();
    d[2..8].copy_from_slice(&snap.bms_data);
    CanFrame::new(STATE_MSG, &d)
}

/// Torque command to the inverter: command byte then signed torque counts.
pub fn motor_command(torque: i16) -> CanFrame {
    let t = torque.to_le_bytes();
    CanFrame::new(MOTOR_COMMAND, &[0x90, t[0], t[1]])
}

/// Raw accelerator/brake counts as seen by the plausibility machine.
pub fn throttle_in(apps_5v: u16, apps_3v3: u16, brake: u16) -> CanFrame {
    let mut d = [0u8; 6];
    d[0..2].copy_from_slice(&apps_5v.to_le_bytes());
    d[2..4].copy_from_slice(&apps_3v3.to_le_bytes());
    d[4..6].copy_from_slice(&brake.to_le_bytes());
    CanFrame::new(THROTTLE_IN_MSG, &d)
}

/// Torque actually commanded after mapping, limiting and fault gating.
pub fn throttle_out(torque: i16) -> CanFrame {
    CanFrame::new(THROTTLE_OUT_MSG, &torque.to_le_bytes())
}

/// Current pedal fault code.
pub fn throttle_fault(fault: PedalFault) -> CanFrame {
    CanFrame::new(THROTTLE_FAULT_MSG, &[fault.wire_code()])
}

/// Current car stage.
pub fn car_status(status: CarStatus) -> CanFrame {
    CanFrame::new(CAR_MSG, &[status.wire_code()])
}

/// Car stage transition: previous then next.
pub fn car_change(from: CarStatus, to: CarStatus) -> CanFrame {
    CanFrame::new(STA_CAR_CHANGE_MSG, &[from.wire_code(), to.wire_code()])
}

/// Brake count and brake-light state.
pub fn brake_status(brake: u16, pressed: bool) -> CanFrame {
    let b = brake.to_le_bytes();
    CanFrame::new(BRAKE_MSG, &[b[0], b[1], u8::from(pressed)])
}

/// BMS link state code.
pub fn bms_status(status: BmsStatus) -> CanFrame {
    CanFrame::new(BMS_MSG, &[status.wire_code()])
}

/// Wheel speed sensor count.
pub fn hall_sensor(hall: u16) -> CanFrame {
    CanFrame::new(HALL_SENSOR_MSG, &hall.to_le_bytes())
}

/// Round-robin selector for the shared telemetry slot.
///
/// Every `state_every`-th slot carries the state frame; the remaining slots
/// alternate between ADC and digital frames, ADC on every
/// `adc_digital_ratio`-th slot.
#[derive(Debug)]
pub struct TelemetryRotation {
    counter: u32,
    state_every: u32,
    adc_digital_ratio: u32,
}

impl TelemetryRotation {
    pub fn new(cfg: &vcu_config::TelemetryCfg) -> Self {
        Self {
            counter: 0,
            state_every: cfg.state_every.max(1),
            adc_digital_ratio: cfg.adc_digital_ratio.max(1),
        }
    }

    pub fn next(&mut self, snap: &TelemetrySnapshot) -> CanFrame {
        self.counter = self.counter.wrapping_add(1);
        if self.counter % self.state_every == 0 {
            encode_state(snap)
        } else if self.counter % self.adc_digital_ratio == 0 {
            encode_adc(snap)
        } else {
            encode_digital(snap)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vcu_config::TelemetryCfg;

    fn snap() -> TelemetrySnapshot {
        TelemetrySnapshot {
            apps_5v: 0x0102,
            apps_3v3: 0x0304,
            brake: 0x0506,
            hall: 0x0708,
            motor_rpm: 1500,
            motor_speed: 42,
            apps_3v3_scaled: 0x0155,
            torque: -2,
            car_status: CarStatus::Drive,
            hv_ready: true,
            bms_data: [9, 8, 7, 6, 5, 4],
            ..TelemetrySnapshot::default()
        }
    }

    #[test]
    fn adc_frame_is_byte_exact() {
        let f = encode_adc(&snap());
        assert_eq!(f.id, 0x698);
        assert_eq!(
            f.payload(),
            &[0x02, 0x01, 0x04, 0x03, 0x06, 0x05, 0x08, 0x07]
        );
    }

    #[test]
    fn digital_frame_is_byte_exact() {
        let f = encode_digital(&snap());
        assert_eq!(f.id, 0x699);
        // 1500 = 0x05DC, 42 = 0x002A, -2 = 0xFFFE.
        assert_eq!(
            f.payload(),
            &[0xDC, 0x05, 0x2A, 0x00, 0x55, 0x01, 0xFE, 0xFF]
        );
    }

    #[test]
    fn state_frame_packs_flags_and_pack_data() {
        let mut s = snap();
        s.force_stop = true;
        s.screenshot = true;
        let f = encode_state(&s);
        assert_eq!(f.id, 0x69A);
        // Drive (3) | hv_ready (0x08) | bms NoMsg (0x10) | force stop |
        // screenshot.
        assert_eq!(f.payload()[0], 0x03 | 0x08 | 0x10 | 0x40 | 0x80);
        assert_eq!(f.payload()[1], 0x00);
        assert_eq!(&f.payload()[2..], &[9, 8, 7, 6, 5, 4]);
    }

    #[test]
    fn state_frame_carries_fault_byte() {
        let mut s = snap();
        s.fault_bits.fault_active = true;
        s.fault_bits.fault_exceeded = true;
        s.fault_bits.brake_high = true;
        assert_eq!(encode_state(&s).payload()[1], 0x01 | 0x02 | 0x80);
    }

    #[test]
    fn motor_command_layout() {
        let f = motor_command(-32_430);
        assert_eq!(f.id, 0x201);
        assert_eq!(f.dlc, 3);
        let t = (-32_430i16).to_le_bytes();
        assert_eq!(f.payload(), &[0x90, t[0], t[1]]);
    }

    #[test]
    fn rotation_state_every_tenth_slot() {
        let cfg = TelemetryCfg {
            state_every: 10,
            adc_digital_ratio: 2,
        };
        let mut rot = TelemetryRotation::new(&cfg);
        let s = snap();
        let ids: Vec<u32> = (0..10).map(|_| rot.next(&s).id).collect();
        assert_eq!(
            ids,
            vec![0x699, 0x698, 0x699, 0x698, 0x699, 0x698, 0x699, 0x698, 0x699, 0x69A]
        );
        // The pattern repeats.
        assert_eq!(rot.next(&s).id, 0x699);
    }

    #[test]
    fn side_channel_frames() {
        assert_eq!(throttle_fault(PedalFault::DiffExceeded).payload(), &[0x12]);
        assert_eq!(car_status(CarStatus::Bussing).payload(), &[2]);
        assert_eq!(
            car_change(CarStatus::Init, CarStatus::Starting).payload(),
            &[0, 1]
        );
        assert_eq!(brake_status(0x0201, true).payload(), &[0x01, 0x02, 1]);
        assert_eq!(bms_status(BmsStatus::Started).payload(), &[3]);
        assert_eq!(hall_sensor(0xABCD).payload(), &[0xCD, 0xAB]);
    }
}
