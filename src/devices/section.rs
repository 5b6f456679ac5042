// MIT License - Copyright (c) 2026 Peter Wright

//! Section (partition) state decoding.

use crate::constants::*;
use crate::state::{AlarmState, BinaryState};

/// Raw state of a section, split out of its two-byte slot. The first byte
/// carries the primary state in the low nibble and the secondary state in
/// the high nibble; the second byte is the tertiary state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionState {
    pub primary: u8,
    pub secondary: u8,
    pub tertiary: u8,
}

impl SectionState {
    pub fn from_bytes(bytes: [u8; 2]) -> Self {
        let primary = bytes[0] % 16;
        Self {
            primary,
            secondary: (bytes[0] - primary) / 16,
            tertiary: bytes[1],
        }
    }

    /// Whether every component has a known meaning. Unknown combinations
    /// are still converted (falling through to disarmed) but logged so new
    /// firmware behaviour shows up in the logs.
    pub fn is_known(&self) -> bool {
        let primary = [
            SECTION_PRIMARY_DISARMED,
            SECTION_PRIMARY_ARMED_PARTIALLY,
            SECTION_PRIMARY_ARMED_FULL,
            SECTION_PRIMARY_TRIGGERED,
        ];
        let secondary = [
            SECTION_SECONDARY_OK,
            SECTION_SECONDARY_TRIGGERED,
            SECTION_SECONDARY_PROBLEM,
            SECTION_SECONDARY_PENDING,
            SECTION_SECONDARY_ARMING,
        ];
        let tertiary = [
            SECTION_TERTIARY_OFF,
            SECTION_TERTIARY_ON,
            SECTION_TERTIARY_TRIGGERED,
        ];

        primary.contains(&self.primary)
            && secondary.contains(&self.secondary)
            && tertiary.contains(&self.tertiary)
    }

    /// Collapse the three components into a single alarm state. The checks
    /// are ordered by precedence; anything unrecognised falls through to
    /// disarmed.
    pub fn to_alarm_state(&self) -> AlarmState {
        if self.primary == SECTION_PRIMARY_TRIGGERED
            || self.secondary == SECTION_SECONDARY_TRIGGERED
        {
            return AlarmState::Triggered;
        }

        if self.secondary == SECTION_SECONDARY_ARMING {
            return AlarmState::Arming;
        }

        if self.secondary == SECTION_SECONDARY_PENDING {
            return AlarmState::Pending;
        }

        if self.primary == SECTION_PRIMARY_ARMED_FULL {
            // Tertiary ON while fully armed means a detector is active
            return if self.tertiary == SECTION_TERTIARY_ON {
                AlarmState::Triggered
            } else {
                AlarmState::ArmedAway
            };
        }

        if self.primary == SECTION_PRIMARY_ARMED_PARTIALLY {
            return AlarmState::ArmedNight;
        }

        AlarmState::Disarmed
    }

    /// State of the section's problem sensor.
    pub fn problem_state(&self) -> BinaryState {
        BinaryState::from_bool(self.secondary == SECTION_SECONDARY_PROBLEM)
    }

    /// Whether the problem sensor may be updated from this state. Secondary
    /// states other than OK and PROBLEM say nothing about problems, so the
    /// sensor keeps its last value through them.
    pub fn updates_problem_sensor(&self) -> bool {
        self.secondary == SECTION_SECONDARY_OK || self.secondary == SECTION_SECONDARY_PROBLEM
    }
}

/// Split a sections-states packet into per-section states. Section `n`
/// occupies the two bytes at offset `n * 2`; the first slot equal to
/// `07 00` marks the end of the configured sections.
pub fn parse_sections_states(packet: &[u8]) -> Vec<(u8, SectionState)> {
    let mut states = Vec::new();

    for section in 1..=MAX_SECTIONS {
        let offset = usize::from(section) * 2;
        if offset + 2 > packet.len() {
            break;
        }

        let slot = [packet[offset], packet[offset + 1]];
        if slot == SECTION_UNUSED_SLOT {
            break;
        }

        states.push((section, SectionState::from_bytes(slot)));
    }

    states
}

/// A section discovered at startup, with the state keys it reports under.
#[derive(Debug, Clone)]
pub struct Section {
    pub number: u8,
    pub alarm_id: String,
    pub problem_sensor_id: String,
}

impl Section {
    pub fn new(number: u8) -> Self {
        Self {
            number,
            alarm_id: section_alarm_id(number),
            problem_sensor_id: section_problem_sensor_id(number),
        }
    }
}

pub fn section_alarm_id(section: u8) -> String {
    format!("section_{section}")
}

pub fn section_problem_sensor_id(section: u8) -> String {
    format!("section_problem_sensor_{section}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_splits_nibbles() {
        let state = SectionState::from_bytes([0x83, 0x11]);
        assert_eq!(state.primary, 3);
        assert_eq!(state.secondary, 8);
        assert_eq!(state.tertiary, 0x11);
    }

    #[test]
    fn test_is_known() {
        assert!(SectionState::from_bytes([0x01, 0x00]).is_known());
        assert!(SectionState::from_bytes([0x83, 0x11]).is_known());
        // Primary 5 is not a known state
        assert!(!SectionState::from_bytes([0x05, 0x00]).is_known());
        // Tertiary 2 is not a known state
        assert!(!SectionState::from_bytes([0x01, 0x02]).is_known());
    }

    #[test]
    fn test_to_alarm_state_precedence() {
        // Triggered primary wins over everything
        assert_eq!(
            SectionState::from_bytes([0x0b, 0x00]).to_alarm_state(),
            AlarmState::Triggered
        );
        // Triggered secondary too
        assert_eq!(
            SectionState::from_bytes([0x11, 0x00]).to_alarm_state(),
            AlarmState::Triggered
        );
        // Arming beats the armed primary underneath it
        assert_eq!(
            SectionState::from_bytes([0x83, 0x00]).to_alarm_state(),
            AlarmState::Arming
        );
        assert_eq!(
            SectionState::from_bytes([0x43, 0x00]).to_alarm_state(),
            AlarmState::Pending
        );
        // Fully armed, quiet
        assert_eq!(
            SectionState::from_bytes([0x03, 0x00]).to_alarm_state(),
            AlarmState::ArmedAway
        );
        // Fully armed with an active detector
        assert_eq!(
            SectionState::from_bytes([0x03, 0x01]).to_alarm_state(),
            AlarmState::Triggered
        );
        assert_eq!(
            SectionState::from_bytes([0x02, 0x00]).to_alarm_state(),
            AlarmState::ArmedNight
        );
        assert_eq!(
            SectionState::from_bytes([0x01, 0x00]).to_alarm_state(),
            AlarmState::Disarmed
        );
    }

    #[test]
    fn test_problem_sensor() {
        let problem = SectionState::from_bytes([0x21, 0x00]);
        assert_eq!(problem.problem_state(), BinaryState::On);
        assert!(problem.updates_problem_sensor());

        let ok = SectionState::from_bytes([0x01, 0x00]);
        assert_eq!(ok.problem_state(), BinaryState::Off);
        assert!(ok.updates_problem_sensor());

        // Arming says nothing about problems
        assert!(!SectionState::from_bytes([0x83, 0x00]).updates_problem_sensor());
    }

    #[test]
    fn test_parse_sections_states() {
        // Two sections, then the unused-slot sentinel
        let packet = [
            0x51, 0x22, 0x01, 0x00, 0x03, 0x00, 0x07, 0x00, 0x07, 0x00,
        ];
        let states = parse_sections_states(&packet);
        assert_eq!(states.len(), 2);
        assert_eq!(states[0].0, 1);
        assert_eq!(states[0].1.to_alarm_state(), AlarmState::Disarmed);
        assert_eq!(states[1].0, 2);
        assert_eq!(states[1].1.to_alarm_state(), AlarmState::ArmedAway);
    }

    #[test]
    fn test_parse_sections_states_truncated_packet() {
        let packet = [0x51, 0x22, 0x01];
        assert!(parse_sections_states(&packet).is_empty());
    }
}
