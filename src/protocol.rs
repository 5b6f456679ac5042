// MIT License - Copyright (c) 2026 Peter Wright

//! Packet classification and command encoding for the JA-100 protocol.

use crate::constants::*;
use crate::error::{JablotronError, Result};

/// Reply packet families, matched by prefix. A read chunk holds at most one
/// packet at offset 0, but device state packets sometimes carry a trailing
/// sections-states packet (see [`find_embedded_sections_states`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    /// Model / hardware / firmware info, possibly several concatenated.
    InfoReply,
    /// Full sections-states dump.
    SectionsStates,
    /// Single wired device state change.
    WiredDeviceState,
    /// Single wireless device state change.
    WirelessDeviceState,
    /// Aggregate active-devices bitmap.
    DevicesStates,
    Unknown,
}

impl PacketKind {
    pub fn classify(packet: &[u8]) -> Self {
        if packet.first() == Some(&INFO_PREFIX) {
            PacketKind::InfoReply
        } else if packet.starts_with(SECTIONS_STATES_PREFIX) {
            PacketKind::SectionsStates
        } else if packet.starts_with(WIRED_DEVICE_STATE_PREFIX) {
            PacketKind::WiredDeviceState
        } else if packet.starts_with(WIRELESS_DEVICE_STATE_PREFIX) {
            PacketKind::WirelessDeviceState
        } else if packet.first() == Some(&DEVICES_STATES_PREFIX) {
            PacketKind::DevicesStates
        } else {
            PacketKind::Unknown
        }
    }
}

/// Offset of a sections-states packet embedded after a device state packet,
/// if the chunk carries one.
pub fn find_embedded_sections_states(packet: &[u8]) -> Option<usize> {
    if packet.len() <= SECTIONS_STATES_PREFIX.len() {
        return None;
    }
    (1..packet.len() - SECTIONS_STATES_PREFIX.len() + 1)
        .find(|&i| packet[i..].starts_with(SECTIONS_STATES_PREFIX))
}

/// State a section can be commanded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    Disarmed,
    ArmedAway,
    ArmedNight,
}

impl TargetState {
    /// Base of the command byte; the section number is added on top.
    fn base_code(&self) -> u8 {
        match self {
            TargetState::Disarmed => SECTION_COMMAND_BASE_DISARM,
            TargetState::ArmedAway => SECTION_COMMAND_BASE_ARM_AWAY,
            TargetState::ArmedNight => SECTION_COMMAND_BASE_ARM_NIGHT,
        }
    }
}

/// Inverse of the command byte encoding, used by tests and diagnostics.
pub fn decode_section_command(byte: u8) -> Option<(TargetState, u8)> {
    match byte {
        144..=158 => Some((TargetState::Disarmed, byte - SECTION_COMMAND_BASE_DISARM)),
        160..=174 => Some((TargetState::ArmedAway, byte - SECTION_COMMAND_BASE_ARM_AWAY)),
        176..=190 => Some((TargetState::ArmedNight, byte - SECTION_COMMAND_BASE_ARM_NIGHT)),
        _ => None,
    }
}

/// Check that a PIN code can be packed into the 4-byte code packet.
pub fn validate_code(code: &str) -> Result<()> {
    if (4..=8).contains(&code.len()) && code.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(JablotronError::InvalidCode)
    }
}

/// Encode a PIN into the 10-byte code packet.
///
/// The 4 payload bytes pack up to 8 digits two per byte: byte `i` holds
/// digit `i` in its low nibble and, when the code is longer than 4 digits,
/// digit `i + 4` in its high nibble. Absent high digits are replaced by
/// `0x3`, so a 4-digit code comes out as plain ASCII digits.
pub fn create_code_packet(code: &str) -> Result<Vec<u8>> {
    validate_code(code)?;

    let digits: Vec<u8> = code.bytes().map(|b| b - b'0').collect();

    let mut packet = CODE_PACKET_PREFIX.to_vec();
    for i in 0..4 {
        let low = digits[i];
        let byte = match digits.get(i + 4) {
            Some(high) => high * 16 + low,
            None => 0x30 + low,
        };
        packet.push(byte);
    }

    Ok(packet)
}

/// Request packets the engine can send.
#[derive(Debug, Clone)]
pub enum Command {
    GetModel,
    GetInfo,
    GetSectionsStates,
    Heartbeat,
    /// Authenticated status refresh, sent on the low-frequency keepalive
    /// slot while every section is disarmed.
    StatusRefresh { code: String },
    /// Arm or disarm a section. The code packet and the command packet go
    /// out in a single write.
    SetSectionState {
        section: u8,
        state: TargetState,
        code: String,
    },
}

impl Command {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match self {
            Command::GetModel => Ok(PACKET_GET_MODEL.to_vec()),
            Command::GetInfo => Ok(PACKET_GET_INFO.to_vec()),
            Command::GetSectionsStates => Ok(PACKET_GET_SECTIONS_STATES.to_vec()),
            Command::Heartbeat => Ok(PACKET_HEARTBEAT.to_vec()),
            Command::StatusRefresh { code } => {
                let mut packet = create_code_packet(code)?;
                packet.extend_from_slice(PACKET_STATUS_REFRESH_SUFFIX);
                Ok(packet)
            }
            Command::SetSectionState {
                section,
                state,
                code,
            } => {
                let mut packet = create_code_packet(code)?;
                packet.extend_from_slice(SECTION_COMMAND_PREFIX);
                packet.push(state.base_code() + section);
                Ok(packet)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(
            PacketKind::classify(&[0x40, 0x07, 0x02]),
            PacketKind::InfoReply
        );
        assert_eq!(
            PacketKind::classify(&[0x51, 0x22, 0x01, 0x00]),
            PacketKind::SectionsStates
        );
        assert_eq!(
            PacketKind::classify(&[0x55, 0x08, 0x00]),
            PacketKind::WiredDeviceState
        );
        assert_eq!(
            PacketKind::classify(&[0x55, 0x09, 0x00]),
            PacketKind::WirelessDeviceState
        );
        assert_eq!(PacketKind::classify(&[0xd8, 0x08]), PacketKind::DevicesStates);
        assert_eq!(PacketKind::classify(&[0x13, 0x37]), PacketKind::Unknown);
        assert_eq!(PacketKind::classify(&[]), PacketKind::Unknown);
    }

    #[test]
    fn test_find_embedded_sections_states() {
        let packet = [0x55, 0x08, 0x00, 0x6c, 0x40, 0x00, 0x51, 0x22, 0x01, 0x00];
        assert_eq!(find_embedded_sections_states(&packet), Some(6));
        // Offset 0 is the packet itself, not an embedded one
        assert_eq!(find_embedded_sections_states(&[0x51, 0x22, 0x01, 0x00]), None);
        assert_eq!(find_embedded_sections_states(&[0x55, 0x08, 0x00]), None);
    }

    #[test]
    fn test_validate_code() {
        assert!(validate_code("1234").is_ok());
        assert!(validate_code("12345678").is_ok());
        assert!(matches!(
            validate_code("123"),
            Err(JablotronError::InvalidCode)
        ));
        assert!(matches!(
            validate_code("123456789"),
            Err(JablotronError::InvalidCode)
        ));
        assert!(matches!(
            validate_code("12a4"),
            Err(JablotronError::InvalidCode)
        ));
    }

    #[test]
    fn test_create_code_packet_short_code() {
        // 4 digits: high nibble padded with 0x3, i.e. plain ASCII digits
        let packet = create_code_packet("1234").unwrap();
        assert_eq!(
            packet,
            vec![0x80, 0x08, 0x03, 0x39, 0x39, 0x39, 0x31, 0x32, 0x33, 0x34]
        );
    }

    #[test]
    fn test_create_code_packet_long_code() {
        // Digits 5..8 land in the high nibbles of bytes 0..3
        let packet = create_code_packet("12345678").unwrap();
        assert_eq!(
            packet,
            vec![0x80, 0x08, 0x03, 0x39, 0x39, 0x39, 0x51, 0x62, 0x73, 0x84]
        );
    }

    #[test]
    fn test_section_command_round_trip() {
        for state in [
            TargetState::Disarmed,
            TargetState::ArmedAway,
            TargetState::ArmedNight,
        ] {
            for section in 1..=15u8 {
                let cmd = Command::SetSectionState {
                    section,
                    state,
                    code: "1234".to_string(),
                };
                let bytes = cmd.to_bytes().unwrap();
                let command_byte = *bytes.last().unwrap();
                assert_eq!(decode_section_command(command_byte), Some((state, section)));
            }
        }
    }

    #[test]
    fn test_status_refresh_packet() {
        let bytes = Command::StatusRefresh {
            code: "1234".to_string(),
        }
        .to_bytes()
        .unwrap();
        assert!(bytes.starts_with(&[0x80, 0x08, 0x03]));
        assert!(bytes.ends_with(&[0x52, 0x02, 0x13, 0x05, 0x9a]));
    }

    #[test]
    fn test_invalid_code_rejected_in_command() {
        let err = Command::SetSectionState {
            section: 1,
            state: TargetState::ArmedAway,
            code: "12".to_string(),
        }
        .to_bytes()
        .unwrap_err();
        assert!(matches!(err, JablotronError::InvalidCode));
    }
}
