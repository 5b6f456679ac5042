// MIT License - Copyright (c) 2026 Peter Wright
// Headless bridge binary

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};

use jablotron_serial_bridge::{DeviceType, JablotronPanel, PanelConfig, PanelEvent};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "jablotron-bridge")]
#[command(about = "Bridge to a Jablotron JA-100 alarm central unit over serial")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Config {
    serial_port: String,
    #[serde(default)]
    code: Option<String>,
    /// Peripheral roster in device-number order, e.g.
    /// `["motion_detector", "opening_detector", "keypad"]`
    #[serde(default)]
    devices: Vec<DeviceType>,
    #[serde(default)]
    require_code_to_arm: bool,
    #[serde(default = "default_require_code_to_disarm")]
    require_code_to_disarm: bool,
    #[serde(default)]
    storage_path: Option<String>,
}

fn default_require_code_to_disarm() -> bool {
    true
}

fn build_panel_config(config: &Config) -> PanelConfig {
    let mut builder = PanelConfig::builder()
        .serial_port(&config.serial_port)
        .devices(config.devices.clone())
        .require_code_to_arm(config.require_code_to_arm)
        .require_code_to_disarm(config.require_code_to_disarm);

    if let Some(code) = &config.code {
        builder = builder.code(code);
    }
    if let Some(path) = &config.storage_path {
        builder = builder.storage_path(path);
    }

    builder.build()
}

fn load_config(path: &str) -> Result<Config> {
    let text = std::fs::read_to_string(path).context("Failed to read config file")?;
    toml::from_str(&text).context("Failed to parse config file")
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity (e.g. RUST_LOG=debug or
    // RUST_LOG=jablotron_serial_bridge=trace). Default: info.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // systemd journal already adds timestamps, so omit them when running under systemd
    if std::env::var_os("JOURNAL_STREAM").is_some() {
        tracing_subscriber::fmt().without_time().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let cli = Cli::parse();
    let mut config = load_config(&cli.config)?;

    let mut sighup = signal(SignalKind::hangup())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    loop {
        info!("Connecting to central unit on {}", config.serial_port);
        let mut panel = JablotronPanel::connect(build_panel_config(&config)).await?;

        let unit = panel.central_unit();
        info!(
            "Connected: {} (hardware {}, firmware {}), {} sections, {} devices",
            unit.model,
            unit.hardware_version,
            unit.firmware_version,
            panel.sections().len(),
            panel.devices().len()
        );

        let mut events = panel.subscribe();

        info!("Bridge running. Send SIGHUP to reload config, SIGINT/SIGTERM to stop.");
        let restart = loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Received SIGINT, shutting down...");
                    break false;
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down...");
                    break false;
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, reloading config and reconnecting...");
                    break true;
                }
                event = events.recv() => match event {
                    Ok(PanelEvent::StateChanged { id, value }) => {
                        info!("{id}: {value}");
                    }
                    Ok(PanelEvent::AvailabilityChanged { available }) => {
                        if available {
                            info!("Central unit available");
                        } else {
                            warn!("Central unit unavailable");
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Event receiver lagged, missed {n} events");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        warn!("Event channel closed");
                        break false;
                    }
                }
            }
        };

        panel.shutdown().await;

        if !restart {
            break;
        }

        // Reload config from disk; keep previous config on failure
        match load_config(&cli.config) {
            Ok(new_config) => {
                config = new_config;
                info!("Config reloaded successfully");
            }
            Err(e) => warn!("Failed to reload config, keeping previous: {e}"),
        }
    }

    info!("Shutdown complete");
    Ok(())
}
