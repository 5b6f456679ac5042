// MIT License - Copyright (c) 2026 Peter Wright

use std::path::PathBuf;
use std::time::Duration;

use crate::constants::DETECT_TIMEOUT;
use crate::devices::device::DeviceType;

/// Configuration for connecting to a Jablotron central unit.
#[derive(Debug, Clone)]
pub struct PanelConfig {
    /// Path to the serial device (e.g. `/dev/hidraw0`).
    pub serial_port: String,
    /// Default PIN code, used when an arm/disarm call does not supply one.
    pub code: Option<String>,
    /// Peripheral roster, ordered by device number starting at 1. The
    /// central unit itself is device 0 and is never listed here.
    pub devices: Vec<DeviceType>,
    /// Refuse to arm without an explicit or configured code.
    pub require_code_to_arm: bool,
    /// Refuse to disarm without an explicit or configured code.
    pub require_code_to_disarm: bool,
    /// Where to persist states that the central unit does not replay after
    /// a restart. `None` disables persistence.
    pub storage_path: Option<PathBuf>,
    /// Bound on each startup detection probe.
    pub detect_timeout: Duration,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            serial_port: "/dev/hidraw0".to_string(),
            code: None,
            devices: Vec::new(),
            require_code_to_arm: false,
            require_code_to_disarm: true,
            storage_path: None,
            detect_timeout: DETECT_TIMEOUT,
        }
    }
}

impl PanelConfig {
    /// Create a new config builder starting from defaults.
    pub fn builder() -> PanelConfigBuilder {
        PanelConfigBuilder::default()
    }

    /// Type of a configured device by its 1-based device number.
    pub fn device_type(&self, number: u16) -> Option<DeviceType> {
        if number == 0 {
            return None;
        }
        self.devices.get(usize::from(number) - 1).copied()
    }

    /// Number of configured devices.
    pub fn device_count(&self) -> u16 {
        self.devices.len() as u16
    }
}

/// Builder for PanelConfig.
#[derive(Debug, Clone, Default)]
pub struct PanelConfigBuilder {
    config: PanelConfig,
}

impl PanelConfigBuilder {
    pub fn serial_port(mut self, port: impl Into<String>) -> Self {
        self.config.serial_port = port.into();
        self
    }

    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.config.code = Some(code.into());
        self
    }

    pub fn devices(mut self, devices: Vec<DeviceType>) -> Self {
        self.config.devices = devices;
        self
    }

    pub fn require_code_to_arm(mut self, require: bool) -> Self {
        self.config.require_code_to_arm = require;
        self
    }

    pub fn require_code_to_disarm(mut self, require: bool) -> Self {
        self.config.require_code_to_disarm = require;
        self
    }

    pub fn storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.storage_path = Some(path.into());
        self
    }

    pub fn detect_timeout(mut self, timeout: Duration) -> Self {
        self.config.detect_timeout = timeout;
        self
    }

    pub fn build(self) -> PanelConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = PanelConfig::builder()
            .serial_port("/dev/hidraw3")
            .code("1234")
            .devices(vec![DeviceType::MotionDetector, DeviceType::Keypad])
            .require_code_to_arm(true)
            .build();

        assert_eq!(config.serial_port, "/dev/hidraw3");
        assert_eq!(config.code.as_deref(), Some("1234"));
        assert!(config.require_code_to_arm);
        assert!(config.require_code_to_disarm);
        assert_eq!(config.device_count(), 2);
    }

    #[test]
    fn test_device_type_lookup() {
        let config = PanelConfig::builder()
            .devices(vec![DeviceType::MotionDetector, DeviceType::Keypad])
            .build();

        // Device numbers are 1-based; 0 is the central unit
        assert_eq!(config.device_type(0), None);
        assert_eq!(config.device_type(1), Some(DeviceType::MotionDetector));
        assert_eq!(config.device_type(2), Some(DeviceType::Keypad));
        assert_eq!(config.device_type(3), None);
    }
}
