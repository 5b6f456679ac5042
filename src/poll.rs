// MIT License - Copyright (c) 2026 Peter Wright

//! The running engine: packet dispatch, the read loop and the keepalive
//! loop.
//!
//! The central unit streams state packets as long as something keeps the
//! session alive. The read loop consumes and dispatches them; the keepalive
//! loop watches for idle gaps and fills them with heartbeat or
//! status-refresh requests. Both loops are supervised by the panel handle
//! and stop via a shared watch channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, Timelike};
use tokio::sync::watch;
use tracing::{debug, error, info, trace, warn};

use crate::codec::{expand_bitfield_lsb_first, format_packet};
use crate::config::PanelConfig;
use crate::constants::PACKET_READ_SIZE;
use crate::devices::device::{self, Device, LAN_CONNECTION_ID};
use crate::devices::section::{self, parse_sections_states, Section};
use crate::event::{EventSender, PanelEvent};
use crate::protocol::{find_embedded_sections_states, Command, PacketKind};
use crate::state::{BinaryState, StateStore, StateValue};
use crate::transport::{Transport, TransportReader};

/// Pause between handled packets, matching the pace the central unit
/// produces them at.
const READ_PACING: Duration = Duration::from_millis(500);

/// How long the keepalive loop waits for traffic before treating the line
/// as idle.
const IDLE_WINDOW: Duration = Duration::from_millis(500);

/// Every 60th idle slot gets the heavier status-refresh request instead of
/// a plain heartbeat.
const KEEPALIVE_CYCLE: u32 = 60;

/// Shared state of a connected panel, used by the loops and the public
/// handle alike.
pub(crate) struct EngineContext {
    pub config: PanelConfig,
    pub transport: Arc<dyn Transport>,
    pub sections: Vec<Section>,
    pub devices: Vec<Device>,
    pub lan_device_number: Option<u16>,
    pub states: StateStore,
    pub event_tx: EventSender,
    available: AtomicBool,
}

impl EngineContext {
    pub fn new(
        config: PanelConfig,
        transport: Arc<dyn Transport>,
        sections: Vec<Section>,
        devices: Vec<Device>,
        lan_device_number: Option<u16>,
        states: StateStore,
        event_tx: EventSender,
    ) -> Self {
        Self {
            config,
            transport,
            sections,
            devices,
            lan_device_number,
            states,
            event_tx,
            available: AtomicBool::new(true),
        }
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Flip the availability flag, broadcasting only on actual transitions.
    fn set_available(&self, available: bool) {
        if self.available.swap(available, Ordering::SeqCst) != available {
            if available {
                info!(port = self.transport.endpoint(), "central unit back on line");
            } else {
                warn!(port = self.transport.endpoint(), "central unit not responding");
            }
            let _ = self
                .event_tx
                .send(PanelEvent::AvailabilityChanged { available });
        }
    }

    /// Route one read chunk to the right decoder. Returns whether the
    /// chunk was recognised; unrecognised chunks are re-read without
    /// pacing.
    async fn dispatch(&self, packet: &[u8]) -> bool {
        match PacketKind::classify(packet) {
            PacketKind::SectionsStates => {
                self.handle_sections_states(packet).await;
                true
            }
            PacketKind::WiredDeviceState | PacketKind::WirelessDeviceState => {
                self.handle_device_state(packet).await;

                // Device state packets sometimes carry a sections-states
                // packet in the same chunk
                if let Some(offset) = find_embedded_sections_states(packet) {
                    self.handle_sections_states(&packet[offset..]).await;
                }
                true
            }
            PacketKind::DevicesStates => {
                self.handle_devices_states(packet).await;
                true
            }
            PacketKind::InfoReply | PacketKind::Unknown => {
                trace!(packet = %format_packet(packet), "unhandled packet");
                false
            }
        }
    }

    async fn handle_sections_states(&self, packet: &[u8]) {
        for (number, state) in parse_sections_states(packet) {
            if !state.is_known() {
                error!(
                    section = number,
                    packet = %format_packet(packet),
                    "unknown section state"
                );
            }

            self.states
                .update(
                    &section::section_alarm_id(number),
                    StateValue::Alarm(state.to_alarm_state()),
                    false,
                )
                .await;

            if state.updates_problem_sensor() {
                self.states
                    .update(
                        &section::section_problem_sensor_id(number),
                        StateValue::Binary(state.problem_state()),
                        false,
                    )
                    .await;
            }
        }
    }

    async fn handle_device_state(&self, packet: &[u8]) {
        let Some(number) = device::device_number(packet) else {
            warn!(packet = %format_packet(packet), "truncated device state packet");
            return;
        };

        if number == 0 {
            debug!(packet = %format_packet(packet), "state packet of central unit");
            return;
        }

        let is_lan_device = self.lan_device_number == Some(number);

        if !is_lan_device {
            if number > self.config.device_count() {
                debug!(packet = %format_packet(packet), "state packet of unknown device");
                return;
            }

            if self
                .config
                .device_type(number)
                .is_some_and(|t| t.is_ignored())
            {
                debug!(
                    device = number,
                    packet = %format_packet(packet),
                    "state packet of ignored device"
                );
                return;
            }
        }

        let Some(state) = device::device_on_off(packet, number) else {
            error!(
                device = number,
                packet = %format_packet(packet),
                "unknown device state packet"
            );
            return;
        };

        if is_lan_device {
            // The LAN module reports its outage, so on the wire the sense
            // is inverted
            let connected = BinaryState::from_bool(state == BinaryState::Off);
            self.states
                .update(LAN_CONNECTION_ID, StateValue::Binary(connected), true)
                .await;
        } else if self
            .config
            .device_type(number)
            .is_some_and(|t| t.has_activity_sensor())
            && device::is_activity_packet(packet)
        {
            self.states
                .update(
                    &device::device_sensor_id(number),
                    StateValue::Binary(state),
                    false,
                )
                .await;
        } else if device::is_sabotage_packet(packet) || device::is_fault_packet(packet) {
            self.states
                .update(
                    &device::device_problem_sensor_id(number),
                    StateValue::Binary(state),
                    true,
                )
                .await;
        } else {
            error!(
                device = number,
                packet = %format_packet(packet),
                "unknown device state packet"
            );
        }
    }

    /// Decode the aggregate active-devices bitmap. The bitmap only clears
    /// sensors; turning one on is left to the per-device packet that the
    /// aggregate may carry at its tail.
    async fn handle_devices_states(&self, packet: &[u8]) {
        let Some(&length) = packet.get(1) else {
            return;
        };

        let bitmap_start = 3;
        let bitmap_end = bitmap_start + usize::from(length).saturating_sub(1);
        if length == 0 || bitmap_end > packet.len() {
            warn!(packet = %format_packet(packet), "malformed devices states packet");
            return;
        }

        let bits = expand_bitfield_lsb_first(&packet[bitmap_start..bitmap_end]);

        if let Some(trailing) = packet.get(bitmap_end..) {
            let kind = PacketKind::classify(trailing);
            if kind == PacketKind::WiredDeviceState || kind == PacketKind::WirelessDeviceState {
                self.handle_device_state(trailing).await;
            }
        }

        for device in &self.devices {
            let Some(sensor_id) = &device.sensor_id else {
                continue;
            };
            let active = bits.get(usize::from(device.number)).copied().unwrap_or(false);
            if !active {
                self.states
                    .update(sensor_id, StateValue::Binary(BinaryState::Off), false)
                    .await;
            }
        }
    }
}

/// Consume packets from the serial device until stopped. The read handle is
/// reopened once an hour and after every error; errors and silent lines
/// degrade the availability flag instead of ending the loop.
pub(crate) async fn read_loop(
    ctx: Arc<EngineContext>,
    updating_tx: watch::Sender<u64>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut reader: Option<Box<dyn TransportReader>> = None;
    let mut reopened_at_hour = Local::now().hour();
    let mut buf = [0u8; PACKET_READ_SIZE];
    let mut sequence: u64 = 0;

    loop {
        if *stop_rx.borrow() {
            break;
        }

        let current_hour = Local::now().hour();
        if current_hour != reopened_at_hour {
            reader = None;
            reopened_at_hour = current_hour;
        }

        if reader.is_none() {
            match ctx.transport.open_reader().await {
                Ok(handle) => reader = Some(handle),
                Err(err) => {
                    warn!(
                        port = ctx.transport.endpoint(),
                        error = %err,
                        "cannot open serial port for reading"
                    );
                    ctx.set_available(false);
                    if pause(&mut stop_rx, Duration::from_secs(1)).await {
                        break;
                    }
                    continue;
                }
            }
        }

        let Some(handle) = reader.as_mut() else {
            continue;
        };

        let n = tokio::select! {
            result = handle.read_chunk(&mut buf) => match result {
                Ok(n) => n,
                Err(err) => {
                    error!(error = %err, "read error");
                    ctx.set_available(false);
                    reader = None;
                    if pause(&mut stop_rx, READ_PACING).await {
                        break;
                    }
                    continue;
                }
            },
            _ = stop_rx.changed() => break,
        };

        sequence += 1;
        let _ = updating_tx.send(sequence);

        if n == 0 {
            ctx.set_available(false);
            if pause(&mut stop_rx, READ_PACING).await {
                break;
            }
            continue;
        }

        ctx.set_available(true);
        let handled = ctx.dispatch(&buf[..n]).await;

        // Junk between frames is re-read straight away; only handled
        // packets are paced
        if handled && pause(&mut stop_rx, READ_PACING).await {
            break;
        }
    }

    debug!("read loop stopped");
}

/// Keep the session alive while the line is idle. Each idle slot sends a
/// plain heartbeat, except the first slot of every cycle which sends an
/// authenticated status refresh, skipped while an alarm is in progress so
/// the heavier request cannot interfere with it.
pub(crate) async fn keepalive_loop(
    ctx: Arc<EngineContext>,
    mut updating_rx: watch::Receiver<u64>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut counter: u32 = 0;

    loop {
        if *stop_rx.borrow() {
            break;
        }

        match tokio::time::timeout(IDLE_WINDOW, updating_rx.changed()).await {
            Err(_elapsed) => {
                let command = if counter == 0 && !ctx.states.any_alarm_active().await {
                    match &ctx.config.code {
                        Some(code) => Command::StatusRefresh { code: code.clone() },
                        None => Command::Heartbeat,
                    }
                } else {
                    Command::Heartbeat
                };

                match command.to_bytes() {
                    Ok(packet) => {
                        if let Err(err) = ctx.transport.send(&packet).await {
                            error!(error = %err, "keepalive write error");
                        }
                    }
                    Err(err) => error!(error = %err, "keepalive encode error"),
                }

                counter += 1;
            }
            Ok(_) => {
                // Traffic is flowing, stay out of the way
                if pause(&mut stop_rx, Duration::from_secs(1)).await {
                    break;
                }
            }
        }

        if counter == KEEPALIVE_CYCLE {
            counter = 0;
        }
    }

    debug!("keepalive loop stopped");
}

/// Sleep, or return true immediately when stop is signalled.
async fn pause(stop_rx: &mut watch::Receiver<bool>, duration: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        _ = stop_rx.changed() => true,
    }
}
