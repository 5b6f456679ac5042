// MIT License - Copyright (c) 2026 Peter Wright

//! Peripheral device types and state packet decoding.

use serde::{Deserialize, Serialize};

use crate::codec::bytes_to_int_le;
use crate::constants::DEVICE_ACTIVITY_BYTES;
use crate::state::BinaryState;

/// Kind of peripheral attached to the central unit. Device numbers are
/// positional; the roster in the config maps them to types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    MotionDetector,
    OpeningDetector,
    GlassBreakDetector,
    SmokeDetector,
    FloodDetector,
    GasDetector,
    SirenIndoor,
    SirenOutdoor,
    Keypad,
    Button,
    Thermostat,
    Other,
    /// Placeholder for an unoccupied device slot.
    Empty,
}

impl DeviceType {
    pub fn label(&self) -> &'static str {
        match self {
            DeviceType::MotionDetector => "Motion detector",
            DeviceType::OpeningDetector => "Opening detector",
            DeviceType::GlassBreakDetector => "Glass break detector",
            DeviceType::SmokeDetector => "Smoke detector",
            DeviceType::FloodDetector => "Flood detector",
            DeviceType::GasDetector => "Gas detector",
            DeviceType::SirenIndoor => "Indoor siren",
            DeviceType::SirenOutdoor => "Outdoor siren",
            DeviceType::Keypad => "Keypad",
            DeviceType::Button => "Button",
            DeviceType::Thermostat => "Thermostat",
            DeviceType::Other => "Other device",
            DeviceType::Empty => "Empty slot",
        }
    }

    /// Device types whose state packets carry nothing worth tracking.
    pub fn is_ignored(&self) -> bool {
        matches!(
            self,
            DeviceType::Keypad | DeviceType::Other | DeviceType::Empty
        )
    }

    /// Whether activity packets map to a sensor. Outdoor sirens report
    /// activity whenever they sound, which is already covered by the
    /// section state.
    pub fn has_activity_sensor(&self) -> bool {
        !matches!(self, DeviceType::SirenOutdoor)
    }
}

/// A tracked device, with the state keys it reports under.
#[derive(Debug, Clone)]
pub struct Device {
    pub number: u16,
    pub device_type: DeviceType,
    /// Absent for devices without an activity sensor.
    pub sensor_id: Option<String>,
    pub problem_sensor_id: String,
}

impl Device {
    pub fn new(number: u16, device_type: DeviceType) -> Self {
        Self {
            number,
            device_type,
            sensor_id: device_type
                .has_activity_sensor()
                .then(|| device_sensor_id(number)),
            problem_sensor_id: device_problem_sensor_id(number),
        }
    }
}

pub fn device_sensor_id(number: u16) -> String {
    format!("device_sensor_{number}")
}

pub fn device_problem_sensor_id(number: u16) -> String {
    format!("device_problem_sensor_{number}")
}

/// State key of the LAN connection pseudo-device.
pub const LAN_CONNECTION_ID: &str = "lan";

/// Device number a state packet refers to. Number 0 is the central unit
/// itself. `None` for packets too short to carry one.
pub fn device_number(packet: &[u8]) -> Option<u16> {
    let bytes = packet.get(4..6)?;
    Some((bytes_to_int_le(bytes) / 64) as u16)
}

/// On/off value of a device state packet.
///
/// The state byte encodes the device number and the on/off flag together:
/// each device owns a window of 4 values starting at
/// `(number + band correction) * 4 + 104`, where the correction folds the
/// number into the byte range. The first two values mean on, the last two
/// off. Anything outside the window is unrecognised.
pub fn device_on_off(packet: &[u8], number: u16) -> Option<BinaryState> {
    let state = u16::from(*packet.get(3)?);

    let correction: i32 = if number <= 36 {
        0
    } else if number <= 96 {
        -64
    } else {
        -128
    };

    let offset = (i32::from(number) + correction) * 4 + 104;
    let relative = i32::from(state) - offset;

    match relative {
        0 | 1 => Some(BinaryState::On),
        2 | 3 => Some(BinaryState::Off),
        _ => None,
    }
}

/// Whether a state packet reports device activity (motion, opening, a
/// button press) rather than sabotage or a fault.
pub fn is_activity_packet(packet: &[u8]) -> bool {
    packet
        .get(2)
        .is_some_and(|b| DEVICE_ACTIVITY_BYTES.contains(b))
}

pub fn is_sabotage_packet(packet: &[u8]) -> bool {
    packet.get(2).is_some_and(|b| b % 128 == 6)
}

pub fn is_fault_packet(packet: &[u8]) -> bool {
    packet.get(2).is_some_and(|b| b % 128 == 7)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_number() {
        // Bytes 4..6 little-endian, divided by 64
        assert_eq!(device_number(&[0x55, 0x08, 0x00, 0x00, 0x40, 0x00]), Some(1));
        assert_eq!(device_number(&[0x55, 0x08, 0x00, 0x00, 0x80, 0x00]), Some(2));
        assert_eq!(device_number(&[0x55, 0x08, 0x00, 0x00, 0x00, 0x00]), Some(0));
        // 125 * 64 = 8000 = 0x1f40
        assert_eq!(device_number(&[0x55, 0x09, 0x00, 0x00, 0x40, 0x1f]), Some(125));
        assert_eq!(device_number(&[0x55, 0x08, 0x00]), None);
    }

    #[test]
    fn test_device_on_off_low_numbers() {
        // Device 1: window starts at (1 + 0) * 4 + 104 = 108 = 0x6c
        let on = [0x55, 0x08, 0x00, 0x6c, 0x40, 0x00];
        assert_eq!(device_on_off(&on, 1), Some(BinaryState::On));
        let on2 = [0x55, 0x08, 0x00, 0x6d, 0x40, 0x00];
        assert_eq!(device_on_off(&on2, 1), Some(BinaryState::On));
        let off = [0x55, 0x08, 0x00, 0x6e, 0x40, 0x00];
        assert_eq!(device_on_off(&off, 1), Some(BinaryState::Off));
        let off2 = [0x55, 0x08, 0x00, 0x6f, 0x40, 0x00];
        assert_eq!(device_on_off(&off2, 1), Some(BinaryState::Off));
        // Outside the window
        let unknown = [0x55, 0x08, 0x00, 0x70, 0x40, 0x00];
        assert_eq!(device_on_off(&unknown, 1), None);
    }

    #[test]
    fn test_device_number_round_trip_across_bands() {
        // Numbers on both sides of each band boundary, encoded as
        // number * 64 little-endian
        for number in [1u16, 36, 37, 96, 97, 125] {
            let encoded = number * 64;
            let packet = [
                0x55,
                0x08,
                0x00,
                0x00,
                (encoded & 0xff) as u8,
                (encoded >> 8) as u8,
            ];
            assert_eq!(device_number(&packet), Some(number));
        }
    }

    #[test]
    fn test_device_on_off_band_boundaries() {
        // Device 36 is the last uncorrected number: window at
        // 36 * 4 + 104 = 248 = 0xf8
        assert_eq!(
            device_on_off(&[0x55, 0x08, 0x00, 0xf8, 0x00, 0x09], 36),
            Some(BinaryState::On)
        );
        assert_eq!(
            device_on_off(&[0x55, 0x08, 0x00, 0xfb, 0x00, 0x09], 36),
            Some(BinaryState::Off)
        );

        // Device 37 already takes the -64 correction, so 0xfc (where an
        // uncorrected window would start) must not decode
        assert_eq!(device_on_off(&[0x55, 0x08, 0x00, 0xfc, 0x40, 0x09], 37), None);

        // Device 96 is the last -64 number: window at
        // (96 - 64) * 4 + 104 = 232 = 0xe8
        assert_eq!(
            device_on_off(&[0x55, 0x09, 0x00, 0xe8, 0x00, 0x18], 96),
            Some(BinaryState::On)
        );
        assert_eq!(
            device_on_off(&[0x55, 0x09, 0x00, 0xeb, 0x00, 0x18], 96),
            Some(BinaryState::Off)
        );

        // Device 97 takes the -128 correction, so 0xec (the would-be -64
        // window) must not decode
        assert_eq!(device_on_off(&[0x55, 0x09, 0x00, 0xec, 0x40, 0x18], 97), None);
    }

    #[test]
    fn test_device_on_off_band_correction() {
        // Device 40: correction -64, window starts at (40 - 64) * 4 + 104 = 8
        let on = [0x55, 0x09, 0x00, 0x08, 0x00, 0x0a];
        assert_eq!(device_on_off(&on, 40), Some(BinaryState::On));
        // Device 125: correction -128, window starts at (125 - 128) * 4 + 104 = 92
        let off = [0x55, 0x09, 0x00, 0x5e, 0x40, 0x1f];
        assert_eq!(device_on_off(&off, 125), Some(BinaryState::Off));
    }

    #[test]
    fn test_packet_classification_by_third_byte() {
        assert!(is_activity_packet(&[0x55, 0x08, 0x00, 0x6c]));
        assert!(is_activity_packet(&[0x55, 0x08, 0xa4, 0x6c]));
        assert!(!is_activity_packet(&[0x55, 0x08, 0x06, 0x6c]));

        assert!(is_sabotage_packet(&[0x55, 0x08, 0x06, 0x6c]));
        assert!(is_sabotage_packet(&[0x55, 0x08, 0x86, 0x6c]));
        assert!(!is_sabotage_packet(&[0x55, 0x08, 0x07, 0x6c]));

        assert!(is_fault_packet(&[0x55, 0x08, 0x07, 0x6c]));
        assert!(is_fault_packet(&[0x55, 0x08, 0x87, 0x6c]));
        assert!(!is_fault_packet(&[0x55, 0x08, 0x06, 0x6c]));
    }

    #[test]
    fn test_device_roster_ids() {
        let device = Device::new(3, DeviceType::MotionDetector);
        assert_eq!(device.sensor_id.as_deref(), Some("device_sensor_3"));
        assert_eq!(device.problem_sensor_id, "device_problem_sensor_3");

        // Outdoor sirens have no activity sensor
        let siren = Device::new(4, DeviceType::SirenOutdoor);
        assert!(siren.sensor_id.is_none());
    }

    #[test]
    fn test_ignored_types() {
        assert!(DeviceType::Keypad.is_ignored());
        assert!(DeviceType::Other.is_ignored());
        assert!(DeviceType::Empty.is_ignored());
        assert!(!DeviceType::MotionDetector.is_ignored());
    }
}
