// MIT License - Copyright (c) 2026 Peter Wright

//! Protocol constants for the JA-100 serial protocol.
//!
//! The protocol is undocumented; every value here was recovered by observing
//! traffic between a central unit and the official configuration software.
//! Request packets are written verbatim to the serial device, replies are
//! matched by their positional prefix bytes (there is no outer
//! length/checksum envelope).

use std::time::Duration;

/// Request the central unit model (info tag `0x02`).
pub const PACKET_GET_MODEL: &[u8] = &[0x30, 0x01, 0x02];

/// Request model + hardware version + firmware version in one combined packet.
///
/// Info tags: `0x02` model, `0x08` hardware version, `0x09` firmware version.
/// Tags `0x0a` (registration code) and `0x0b` (installation name) exist but
/// are not requested.
pub const PACKET_GET_INFO: &[u8] = &[
    0x30, 0x01, 0x02, 0x30, 0x01, 0x08, 0x30, 0x01, 0x09,
];

/// Request the states of all sections.
pub const PACKET_GET_SECTIONS_STATES: &[u8] = &[0x80, 0x01, 0x01, 0x52, 0x01, 0x0e];

/// Lightweight keepalive sent while the line is idle.
pub const PACKET_HEARTBEAT: &[u8] = &[0x52, 0x01, 0x02];

/// Heavier status-refresh request, sent after a code packet on the
/// low-frequency keepalive slot.
pub const PACKET_STATUS_REFRESH_SUFFIX: &[u8] = &[0x52, 0x02, 0x13, 0x05, 0x9a];

/// Prefix of every PIN code packet, followed by the 4 packed code bytes.
pub const CODE_PACKET_PREFIX: &[u8] = &[0x80, 0x08, 0x03, 0x39, 0x39, 0x39];

/// Prefix of an arm/disarm command, followed by a single state+section byte.
pub const SECTION_COMMAND_PREFIX: &[u8] = &[0x80, 0x02, 0x0d];

/// Prefix of a sections-states reply.
pub const SECTIONS_STATES_PREFIX: &[u8] = &[0x51, 0x22];

/// First byte of an aggregate devices-states packet.
pub const DEVICES_STATES_PREFIX: u8 = 0xd8;

/// Prefix of a wired device state packet.
pub const WIRED_DEVICE_STATE_PREFIX: &[u8] = &[0x55, 0x08];

/// Prefix of a wireless device state packet.
pub const WIRELESS_DEVICE_STATE_PREFIX: &[u8] = &[0x55, 0x09];

/// First byte of an info reply; also separates concatenated info sub-packets.
pub const INFO_PREFIX: u8 = 0x40;

pub const INFO_MODEL: u8 = 0x02;
pub const INFO_HARDWARE_VERSION: u8 = 0x08;
pub const INFO_FIRMWARE_VERSION: u8 = 0x09;

/// Third byte values of a device state packet that signal device activity
/// (motion, opening, button press) rather than sabotage or a fault.
pub const DEVICE_ACTIVITY_BYTES: &[u8] = &[
    0x00, 0x01, 0x0a, 0x0c, 0x24, 0x3e, 0x80, 0x81, 0xa3, 0xa4, 0xa6, 0xbe,
];

/// Section primary states (low nibble of the first state byte).
pub const SECTION_PRIMARY_DISARMED: u8 = 1;
pub const SECTION_PRIMARY_ARMED_PARTIALLY: u8 = 2;
pub const SECTION_PRIMARY_ARMED_FULL: u8 = 3;
pub const SECTION_PRIMARY_TRIGGERED: u8 = 11;

/// Section secondary states (high nibble of the first state byte).
pub const SECTION_SECONDARY_OK: u8 = 0;
pub const SECTION_SECONDARY_TRIGGERED: u8 = 1;
pub const SECTION_SECONDARY_PROBLEM: u8 = 2;
pub const SECTION_SECONDARY_PENDING: u8 = 4;
pub const SECTION_SECONDARY_ARMING: u8 = 8;

/// Section tertiary states (second state byte, taken whole).
pub const SECTION_TERTIARY_OFF: u8 = 0;
pub const SECTION_TERTIARY_ON: u8 = 1;
pub const SECTION_TERTIARY_TRIGGERED: u8 = 17;

/// A sections-states slot with this value marks the first unused section;
/// enumeration stops there.
pub const SECTION_UNUSED_SLOT: [u8; 2] = [0x07, 0x00];

/// Hard upper bound on the number of sections a central unit reports.
pub const MAX_SECTIONS: u8 = 15;

/// Fixed chunk size for every serial read.
pub const PACKET_READ_SIZE: usize = 64;

/// Bound on each detection probe (model, identity, initial sections).
pub const DETECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Central unit models whose protocol this crate understands. Anything else
/// is rejected during detection rather than decoded on a best-effort basis.
pub const SUPPORTED_MODEL_PREFIXES: &[&str] = &["JA-101", "JA-103", "JA-106", "JA-107"];

/// The only model variant with a built-in LAN module.
pub const LAN_MODEL: &str = "JA-101K-LAN";

/// Synthetic device number the LAN module reports state under.
pub const LAN_DEVICE_NUMBER: u16 = 125;

/// Base values for the arm/disarm command byte; the section number is added.
pub const SECTION_COMMAND_BASE_DISARM: u8 = 143;
pub const SECTION_COMMAND_BASE_ARM_AWAY: u8 = 159;
pub const SECTION_COMMAND_BASE_ARM_NIGHT: u8 = 175;
