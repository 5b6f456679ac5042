// MIT License - Copyright (c) 2026 Peter Wright

//! The public panel handle: connection, command API and lifecycle.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::PanelConfig;
use crate::constants::{LAN_DEVICE_NUMBER, LAN_MODEL};
use crate::detection::{
    detect_central_unit, detect_initial_sections, verify_model, CentralUnit,
};
use crate::devices::device::{Device, LAN_CONNECTION_ID};
use crate::devices::section::{parse_sections_states, Section};
use crate::error::{JablotronError, Result};
use crate::event::{event_channel, EventReceiver};
use crate::poll::{keepalive_loop, read_loop, EngineContext};
use crate::protocol::{Command, TargetState};
use crate::state::{BinaryState, StateStore, StateValue};
use crate::storage::StateStorage;
use crate::transport::{SerialPortTransport, Transport};

/// A connected JA-100 central unit.
///
/// Created with [`JablotronPanel::connect`], which runs the detection
/// sequence and starts the engine loops. The handle is the only owner of
/// those loops; dropping it stops them.
pub struct JablotronPanel {
    ctx: Arc<EngineContext>,
    central_unit: CentralUnit,
    stop_tx: watch::Sender<bool>,
    read_handle: Option<JoinHandle<()>>,
    keepalive_handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for JablotronPanel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JablotronPanel")
            .field("central_unit", &self.central_unit)
            .finish_non_exhaustive()
    }
}

impl JablotronPanel {
    /// Connect to the serial device named in the config.
    pub async fn connect(config: PanelConfig) -> Result<Self> {
        let transport: Arc<dyn Transport> =
            Arc::new(SerialPortTransport::new(config.serial_port.clone()));
        Self::connect_with_transport(config, transport).await
    }

    /// Connect over a caller-supplied transport. This is the seam the
    /// integration tests use to run the engine against a scripted device.
    pub async fn connect_with_transport(
        config: PanelConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let storage = match &config.storage_path {
            Some(path) => {
                Some(StateStorage::open(path.clone(), config.serial_port.clone()).await?)
            }
            None => None,
        };

        let (event_tx, _event_rx) = event_channel(256);
        let states = StateStore::new(event_tx.clone(), storage);
        states.load_persisted().await;

        let model = verify_model(&transport, config.detect_timeout).await?;
        debug!(model, "model verified");

        let central_unit =
            detect_central_unit(&transport, &config.serial_port, config.detect_timeout).await?;
        info!(
            model = central_unit.model,
            hardware = central_unit.hardware_version,
            firmware = central_unit.firmware_version,
            "connected to central unit"
        );

        // Section roster comes from the first full sections-states dump
        let sections_packet =
            detect_initial_sections(&transport, config.detect_timeout).await?;
        let section_states = parse_sections_states(&sections_packet);
        if section_states.is_empty() {
            return Err(JablotronError::ShouldNotHappen);
        }

        let mut sections = Vec::with_capacity(section_states.len());
        for (number, state) in &section_states {
            if !state.is_known() {
                error!(
                    section = number,
                    packet = %crate::codec::format_packet(&sections_packet),
                    "unknown initial section state"
                );
            }

            let section = Section::new(*number);
            states
                .set_initial(&section.alarm_id, StateValue::Alarm(state.to_alarm_state()))
                .await;
            states
                .set_initial(
                    &section.problem_sensor_id,
                    StateValue::Binary(state.problem_state()),
                )
                .await;
            sections.push(section);
        }

        let mut devices = Vec::new();
        for (index, device_type) in config.devices.iter().enumerate() {
            if device_type.is_ignored() {
                continue;
            }

            let device = Device::new(index as u16 + 1, *device_type);
            if let Some(sensor_id) = &device.sensor_id {
                states
                    .set_initial(sensor_id, StateValue::Binary(BinaryState::Off))
                    .await;
            }
            states
                .set_initial(
                    &device.problem_sensor_id,
                    StateValue::Binary(BinaryState::Off),
                )
                .await;
            devices.push(device);
        }

        let lan_device_number = if central_unit.model == LAN_MODEL {
            states
                .set_initial(LAN_CONNECTION_ID, StateValue::Binary(BinaryState::On))
                .await;
            Some(LAN_DEVICE_NUMBER)
        } else {
            None
        };

        let ctx = Arc::new(EngineContext::new(
            config,
            transport,
            sections,
            devices,
            lan_device_number,
            states,
            event_tx,
        ));

        let (stop_tx, stop_rx) = watch::channel(false);
        let (updating_tx, updating_rx) = watch::channel(0u64);

        let read_handle = tokio::spawn(read_loop(
            Arc::clone(&ctx),
            updating_tx,
            stop_rx.clone(),
        ));
        let keepalive_handle =
            tokio::spawn(keepalive_loop(Arc::clone(&ctx), updating_rx, stop_rx));

        Ok(Self {
            ctx,
            central_unit,
            stop_tx,
            read_handle: Some(read_handle),
            keepalive_handle: Some(keepalive_handle),
        })
    }

    /// Subscribe to state and availability events.
    pub fn subscribe(&self) -> EventReceiver {
        self.ctx.event_tx.subscribe()
    }

    /// Identity of the connected central unit.
    pub fn central_unit(&self) -> &CentralUnit {
        &self.central_unit
    }

    /// Sections discovered at startup.
    pub fn sections(&self) -> &[Section] {
        &self.ctx.sections
    }

    /// Tracked devices from the configured roster.
    pub fn devices(&self) -> &[Device] {
        &self.ctx.devices
    }

    /// Whether the serial line produced data recently.
    pub fn is_available(&self) -> bool {
        self.ctx.is_available()
    }

    /// Current state of one entity.
    pub async fn state(&self, id: &str) -> Option<StateValue> {
        self.ctx.states.get(id).await
    }

    /// Snapshot of all tracked states.
    pub async fn states(&self) -> HashMap<String, StateValue> {
        self.ctx.states.snapshot().await
    }

    /// Arm or disarm a section.
    ///
    /// The code resolves to the explicit argument, falling back to the
    /// configured one. When the matching `require_code_to_*` option is set,
    /// the explicit argument is mandatory.
    pub async fn set_section_state(
        &self,
        section: u8,
        state: TargetState,
        code: Option<&str>,
    ) -> Result<()> {
        if !self.ctx.sections.iter().any(|s| s.number == section) {
            return Err(JablotronError::InvalidSection { section });
        }

        let code_required = match state {
            TargetState::Disarmed => self.ctx.config.require_code_to_disarm,
            TargetState::ArmedAway | TargetState::ArmedNight => {
                self.ctx.config.require_code_to_arm
            }
        };
        if code_required && code.is_none() {
            return Err(JablotronError::CodeRequired);
        }

        let code = code
            .map(str::to_owned)
            .or_else(|| self.ctx.config.code.clone())
            .ok_or(JablotronError::CodeRequired)?;

        let packet = Command::SetSectionState {
            section,
            state,
            code,
        }
        .to_bytes()?;

        info!(section, state = ?state, "changing section state");
        self.ctx.transport.send(&packet).await
    }

    /// Stop the engine loops and wait for them to finish.
    pub async fn shutdown(&mut self) {
        let _ = self.stop_tx.send(true);

        // A blocked read only returns once the device produces data, so
        // provoke a reply
        if let Ok(packet) = Command::GetSectionsStates.to_bytes() {
            if let Err(err) = self.ctx.transport.send(&packet).await {
                warn!(error = %err, "wakeup write during shutdown failed");
            }
        }

        for handle in [self.read_handle.take(), self.keepalive_handle.take()]
            .into_iter()
            .flatten()
        {
            let abort = handle.abort_handle();
            if tokio::time::timeout(std::time::Duration::from_secs(5), handle)
                .await
                .is_err()
            {
                warn!("engine loop did not stop in time");
                abort.abort();
            }
        }

        debug!("panel shut down");
    }
}

impl Drop for JablotronPanel {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(true);
        if let Some(handle) = self.read_handle.take() {
            handle.abort();
        }
        if let Some(handle) = self.keepalive_handle.take() {
            handle.abort();
        }
    }
}
