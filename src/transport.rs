// MIT License - Copyright (c) 2026 Peter Wright

//! Serial transport abstraction.
//!
//! The JA-100 line is exposed as a HID character device (`/dev/hidraw*`),
//! so reads and writes go through plain file handles rather than a tty.
//! The central unit tolerates (and the official software performs) writes
//! from a handle opened per packet, while reads come from one long-lived
//! handle that the engine reopens periodically.

use std::time::Duration;

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

use crate::codec::format_packet;
use crate::error::Result;

/// One read handle on the serial device. Dropped and recreated by the read
/// loop on errors and on the hourly reopen.
#[async_trait]
pub trait TransportReader: Send {
    /// Read the next chunk into `buf`, returning the number of bytes read.
    /// Zero means the line produced nothing.
    async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// Byte-level access to the central unit. Implemented by the real serial
/// device and by the mock transport in the integration tests.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Human-readable endpoint for log output.
    fn endpoint(&self) -> &str;

    /// Open a fresh read handle.
    async fn open_reader(&self) -> Result<Box<dyn TransportReader>>;

    /// Write one packet to the device.
    async fn send(&self, packet: &[u8]) -> Result<()>;
}

/// The real serial device.
pub struct SerialPortTransport {
    path: String,
}

impl SerialPortTransport {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

struct SerialPortReader {
    file: File,
}

#[async_trait]
impl TransportReader for SerialPortReader {
    async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.file.read(buf).await?)
    }
}

#[async_trait]
impl Transport for SerialPortTransport {
    fn endpoint(&self) -> &str {
        &self.path
    }

    async fn open_reader(&self) -> Result<Box<dyn TransportReader>> {
        let file = File::open(&self.path).await?;
        Ok(Box::new(SerialPortReader { file }))
    }

    async fn send(&self, packet: &[u8]) -> Result<()> {
        debug!(packet = %format_packet(packet), "sending packet");

        let mut file = OpenOptions::new().write(true).open(&self.path).await?;
        file.write_all(packet).await?;
        file.flush().await?;

        // Give the central unit time to process before the handle closes
        tokio::time::sleep(Duration::from_millis(100)).await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_reports_device_path() {
        let transport = SerialPortTransport::new("/dev/hidraw0");
        assert_eq!(transport.endpoint(), "/dev/hidraw0");
    }
}
