//! CAN wire types shared by every crate in the workspace.
//!
//! Identifier values and frame layouts are a frozen contract with the
//! external telemetry decoder; renumbering requires a version bump.

/// Extended frame format flag, carried in bit 31 of the identifier.
pub const EFF_FLAG: u32 = 0x8000_0000;

/// Maximum payload length of a classic CAN frame.
pub const MAX_DLC: usize = 8;

// === Throttle / motor bus ===
pub const MOTOR_COMMAND: u32 = 0x201;
pub const THROTTLE_IN_MSG: u32 = 0x690;
pub const THROTTLE_OUT_MSG: u32 = 0x691;
pub const THROTTLE_FAULT_MSG: u32 = 0x692;

// === Status bus ===
pub const CAR_MSG: u32 = 0x693;
pub const STA_CAR_CHANGE_MSG: u32 = 0x694;
pub const BRAKE_MSG: u32 = 0x695;
pub const BMS_MSG: u32 = 0x696;
pub const HALL_SENSOR_MSG: u32 = 0x697;

// === Telemetry bus ===
pub const ADC_MSG: u32 = 0x698;
pub const DIGITAL_MSG: u32 = 0x699;
pub const STATE_MSG: u32 = 0x69A;

// === BMS hardware protocol (extended identifiers) ===
pub const BMS_COMMAND: u32 = 0x1801_F340;
pub const BMS_SEND_CMD: u32 = BMS_COMMAND | EFF_FLAG;
pub const BMS_INFO: u32 = 0x1860_40F3;
pub const BMS_INFO_EXT: u32 = BMS_INFO | EFF_FLAG;

/// A classic CAN 2.0 frame: identifier, payload length, payload bytes.
///
/// Extended identifiers carry [`EFF_FLAG`] in `id`, mirroring the on-wire
/// convention of the SocketCAN/MCP2515 world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanFrame {
    pub id: u32,
    pub dlc: u8,
    pub data: [u8; MAX_DLC],
}

impl CanFrame {
    /// Build a frame from an identifier and payload slice.
    ///
    /// Payloads longer than [`MAX_DLC`] are truncated; CAN cannot carry them.
    pub fn new(id: u32, payload: &[u8]) -> Self {
        let mut data = [0u8; MAX_DLC];
        let dlc = payload.len().min(MAX_DLC);
        data[..dlc].copy_from_slice(&payload[..dlc]);
        Self {
            id,
            dlc: dlc as u8,
            data,
        }
    }

    /// Identifier with the extended-frame flag masked off.
    #[inline]
    pub fn raw_id(&self) -> u32 {
        self.id & !EFF_FLAG
    }

    /// True if the identifier uses the extended frame format.
    #[inline]
    pub fn is_extended(&self) -> bool {
        self.id & EFF_FLAG != 0
    }

    /// Payload bytes actually carried by the frame.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.data[..usize::from(self.dlc.min(MAX_DLC as u8))]
    }
}

impl Default for CanFrame {
    fn default() -> Self {
        Self {
            id: 0,
            dlc: 0,
            data: [0u8; MAX_DLC],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_truncates_oversized_payload() {
        let f = CanFrame::new(MOTOR_COMMAND, &[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(f.dlc, 8);
        assert_eq!(f.payload(), &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn extended_flag_round_trip() {
        let f = CanFrame::new(BMS_SEND_CMD, &[0x01, 0x01]);
        assert!(f.is_extended());
        assert_eq!(f.raw_id(), BMS_COMMAND);
        assert_eq!(f.payload(), &[0x01, 0x01]);
    }
}
