// MIT License - Copyright (c) 2026 Peter Wright

//! Startup detection probes.
//!
//! The central unit never answers unprompted during startup, so each probe
//! runs a writer task that resends its request every second while a reader
//! scans incoming chunks for a matching reply, the whole thing bounded by
//! the configured detection timeout.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::codec::{decode_info_text, format_packet};
use crate::constants::*;
use crate::error::{JablotronError, Result};
use crate::protocol::Command;
use crate::transport::Transport;

/// Identity of the central unit, as reported by the info probe.
#[derive(Debug, Clone)]
pub struct CentralUnit {
    pub serial_port: String,
    pub model: String,
    pub hardware_version: String,
    pub firmware_version: String,
}

/// Run one probe: resend `request` every second and feed every read chunk
/// to `matcher` until it produces a result or `bound` elapses.
async fn run_probe<T>(
    transport: &Arc<dyn Transport>,
    request: Command,
    bound: Duration,
    mut matcher: impl FnMut(&[u8]) -> Option<T>,
) -> Result<Option<T>> {
    let request = request.to_bytes()?;
    let (stop_tx, mut stop_rx) = watch::channel(false);

    let writer_transport = Arc::clone(transport);
    let writer = tokio::spawn(async move {
        loop {
            if let Err(err) = writer_transport.send(&request).await {
                warn!(error = %err, "probe request failed");
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                _ = stop_rx.changed() => break,
            }
        }
    });

    let mut reader = transport.open_reader().await?;
    let mut buf = [0u8; PACKET_READ_SIZE];

    let outcome = tokio::time::timeout(bound, async {
        loop {
            let n = reader.read_chunk(&mut buf).await?;
            if n == 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
                continue;
            }
            if let Some(result) = matcher(&buf[..n]) {
                return Ok(result);
            }
        }
    })
    .await;

    let _ = stop_tx.send(true);
    let _ = writer.await;

    match outcome {
        Ok(Ok(result)) => Ok(Some(result)),
        Ok(Err(err)) => Err(err),
        Err(_elapsed) => Ok(None),
    }
}

/// Check that the device talks the protocol and is a supported model.
pub async fn verify_model(transport: &Arc<dyn Transport>, bound: Duration) -> Result<String> {
    let model = run_probe(transport, Command::GetModel, bound, |packet| {
        debug!(packet = %format_packet(packet), "model probe packet");

        if packet.first() == Some(&INFO_PREFIX) && packet.get(2) == Some(&INFO_MODEL) {
            // Undecodable text is a garbled read; keep listening
            decode_info_text(&packet[3..])
        } else {
            None
        }
    })
    .await?
    .ok_or(JablotronError::ModelNotDetected)?;

    if SUPPORTED_MODEL_PREFIXES
        .iter()
        .any(|prefix| model.starts_with(prefix))
    {
        Ok(model)
    } else {
        Err(JablotronError::ModelNotSupported { model })
    }
}

/// Collect model, hardware version and firmware version. The reply is a
/// chunk of concatenated info sub-packets, each starting with the info
/// prefix; partial replies across chunks are accumulated until all three
/// tags have been seen.
pub async fn detect_central_unit(
    transport: &Arc<dyn Transport>,
    serial_port: &str,
    bound: Duration,
) -> Result<CentralUnit> {
    let mut model: Option<String> = None;
    let mut hardware_version: Option<String> = None;
    let mut firmware_version: Option<String> = None;

    let identity = run_probe(transport, Command::GetInfo, bound, |packet| {
        if packet.first() != Some(&INFO_PREFIX) {
            return None;
        }

        debug!(packet = %format_packet(packet), "info packet");

        for i in 0..packet.len() {
            if packet[i] != INFO_PREFIX {
                continue;
            }

            let sub = &packet[i..];
            let Some(tag) = sub.get(2) else { continue };
            let Some(text) = decode_info_text(&sub[3..]) else {
                continue;
            };

            match *tag {
                INFO_MODEL => model = Some(text),
                INFO_HARDWARE_VERSION => hardware_version = Some(text),
                INFO_FIRMWARE_VERSION => firmware_version = Some(text),
                _ => {}
            }
        }

        match (&model, &hardware_version, &firmware_version) {
            (Some(m), Some(h), Some(f)) => Some((m.clone(), h.clone(), f.clone())),
            _ => None,
        }
    })
    .await?;

    let (model, hardware_version, firmware_version) =
        identity.ok_or(JablotronError::DetectionTimeout)?;

    Ok(CentralUnit {
        serial_port: serial_port.to_string(),
        model,
        hardware_version,
        firmware_version,
    })
}

/// Wait for the first full sections-states dump and return it raw; the
/// caller derives the section roster and initial states from it.
pub async fn detect_initial_sections(
    transport: &Arc<dyn Transport>,
    bound: Duration,
) -> Result<Vec<u8>> {
    run_probe(transport, Command::GetSectionsStates, bound, |packet| {
        if packet.starts_with(SECTIONS_STATES_PREFIX) {
            Some(packet.to_vec())
        } else {
            None
        }
    })
    .await?
    .ok_or(JablotronError::DetectionTimeout)
}
