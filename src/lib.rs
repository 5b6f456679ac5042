// MIT License - Copyright (c) 2026 Peter Wright

//! Serial protocol engine for Jablotron JA-100 family alarm central units.
//!
//! Connects to a central unit over its HID serial device, detects the model
//! and the configured sections, then keeps a live session going: decoding
//! section and device state packets as they stream in, answering idle gaps
//! with keepalives, and accepting arm/disarm commands.
//!
//! # Quick start
//!
//! ```no_run
//! use jablotron_serial_bridge::{DeviceType, JablotronPanel, PanelConfig, PanelEvent, TargetState};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PanelConfig::builder()
//!         .serial_port("/dev/hidraw0")
//!         .code("1234")
//!         .devices(vec![DeviceType::MotionDetector, DeviceType::OpeningDetector])
//!         .build();
//!
//!     let panel = JablotronPanel::connect(config).await?;
//!     let mut events = panel.subscribe();
//!
//!     panel.set_section_state(1, TargetState::ArmedAway, None).await?;
//!
//!     while let Ok(event) = events.recv().await {
//!         match event {
//!             PanelEvent::StateChanged { id, value } => println!("{id}: {value}"),
//!             PanelEvent::AvailabilityChanged { available } => {
//!                 println!("available: {available}")
//!             }
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod constants;
pub mod detection;
pub mod devices;
pub mod error;
pub mod event;
pub mod panel;
pub mod protocol;
pub mod state;
pub mod storage;
pub mod transport;

mod poll;

pub use config::{PanelConfig, PanelConfigBuilder};
pub use detection::CentralUnit;
pub use devices::device::{Device, DeviceType};
pub use devices::section::Section;
pub use error::{JablotronError, Result};
pub use event::{EventReceiver, EventSender, PanelEvent};
pub use panel::JablotronPanel;
pub use protocol::TargetState;
pub use state::{AlarmState, BinaryState, StateValue};
pub use transport::{SerialPortTransport, Transport, TransportReader};
