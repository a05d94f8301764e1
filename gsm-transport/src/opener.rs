//! Port opener seam
//!
//! A session acquires its AT port lazily, on first USSD use, and only the
//! session knows the device name at that point. The opener trait is the
//! seam that lets tests substitute a scripted transport for a real port.

use crate::serial::{SerialSettings, SerialTransport};
use crate::stream::TransportLayer;
use async_trait::async_trait;
use gsm_core::GsmResult;
use std::time::Duration;

/// Opens a transport bound to a named device
#[async_trait]
pub trait PortOpener: Send + Sync {
    type Transport: TransportLayer + 'static;

    /// Open the transport on `device`, ready for I/O
    async fn open(&self, device: &str) -> GsmResult<Self::Transport>;
}

/// Opens real serial ports with the modem AT defaults (115200 baud, 5 s
/// per-read timeout)
#[derive(Debug, Clone)]
pub struct SerialPortOpener {
    pub baud_rate: u32,
    pub read_timeout: Duration,
}

impl Default for SerialPortOpener {
    fn default() -> Self {
        Self {
            baud_rate: crate::serial::DEFAULT_BAUD,
            read_timeout: crate::serial::DEFAULT_READ_TIMEOUT,
        }
    }
}

#[async_trait]
impl PortOpener for SerialPortOpener {
    type Transport = SerialTransport;

    async fn open(&self, device: &str) -> GsmResult<Self::Transport> {
        let settings = SerialSettings::new(device.to_string(), self.baud_rate)
            .with_timeout(self.read_timeout);
        let mut transport = SerialTransport::new(settings);
        transport.open().await?;
        Ok(transport)
    }
}
