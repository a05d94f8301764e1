//! Serial port transport implementation

use crate::stream::{StreamAccessor, TransportLayer};
use async_trait::async_trait;
use gsm_core::{GsmError, GsmResult};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{ClearBuffer, SerialPort, SerialStream};

/// Baud rate used for modem AT ports
pub const DEFAULT_BAUD: u32 = 115_200;

/// Per-read timeout used for modem AT ports
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Wrapper for SerialStream that implements Debug
struct DebugSerialStream(SerialStream);

impl fmt::Debug for DebugSerialStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialStream").finish()
    }
}

impl Deref for DebugSerialStream {
    type Target = SerialStream;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for DebugSerialStream {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Serial port transport settings
#[derive(Debug, Clone)]
pub struct SerialSettings {
    pub port_name: String,
    pub baud_rate: u32,
    pub data_bits: tokio_serial::DataBits,
    pub stop_bits: tokio_serial::StopBits,
    pub parity: tokio_serial::Parity,
    pub flow_control: tokio_serial::FlowControl,
    pub timeout: Option<Duration>,
}

impl SerialSettings {
    /// Create new serial settings with default framing (8N1, no flow control)
    pub fn new(port_name: String, baud_rate: u32) -> Self {
        Self {
            port_name,
            baud_rate,
            data_bits: tokio_serial::DataBits::Eight,
            stop_bits: tokio_serial::StopBits::One,
            parity: tokio_serial::Parity::None,
            flow_control: tokio_serial::FlowControl::None,
            timeout: Some(DEFAULT_READ_TIMEOUT),
        }
    }

    /// Settings for a modem AT port: 115200 baud, 5 second read timeout
    pub fn modem(port_name: String) -> Self {
        Self::new(port_name, DEFAULT_BAUD)
    }

    /// Override the per-read timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Serial port transport implementation
#[derive(Debug)]
pub struct SerialTransport {
    stream: Option<DebugSerialStream>,
    settings: SerialSettings,
    closed: bool,
}

impl SerialTransport {
    /// Create a new serial transport (not yet opened)
    pub fn new(settings: SerialSettings) -> Self {
        Self {
            stream: None,
            settings,
            closed: true,
        }
    }

    fn stream_mut(&mut self) -> GsmResult<&mut DebugSerialStream> {
        self.stream.as_mut().ok_or_else(|| {
            GsmError::Transport(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "Serial stream not connected",
            ))
        })
    }
}

#[async_trait]
impl TransportLayer for SerialTransport {
    async fn open(&mut self) -> GsmResult<()> {
        if !self.closed {
            return Err(GsmError::Transport(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Port has already been opened",
            )));
        }

        let builder = tokio_serial::new(&self.settings.port_name, self.settings.baud_rate)
            .data_bits(self.settings.data_bits)
            .stop_bits(self.settings.stop_bits)
            .parity(self.settings.parity)
            .flow_control(self.settings.flow_control);

        let stream = SerialStream::open(&builder).map_err(|e| {
            GsmError::Transport(std::io::Error::other(format!(
                "Failed to open serial port {}: {}",
                self.settings.port_name, e
            )))
        })?;

        self.stream = Some(DebugSerialStream(stream));
        self.closed = false;
        Ok(())
    }
}

#[async_trait]
impl StreamAccessor for SerialTransport {
    async fn read(&mut self, buf: &mut [u8]) -> GsmResult<usize> {
        let timeout = self.settings.timeout;
        let stream = self.stream_mut()?;

        let result = if let Some(timeout) = timeout {
            match tokio::time::timeout(timeout, stream.read(buf)).await {
                Ok(inner) => inner.map_err(GsmError::Transport),
                Err(_) => return Err(GsmError::Timeout),
            }
        } else {
            stream.read(buf).await.map_err(GsmError::Transport)
        };

        match result {
            Ok(0) => {
                self.closed = true;
                Ok(0)
            }
            Ok(n) => Ok(n),
            Err(e) => {
                self.closed = true;
                Err(e)
            }
        }
    }

    async fn write(&mut self, buf: &[u8]) -> GsmResult<usize> {
        let timeout = self.settings.timeout;
        let stream = self.stream_mut()?;

        if let Some(timeout) = timeout {
            match tokio::time::timeout(timeout, stream.write(buf)).await {
                Ok(inner) => inner.map_err(GsmError::Transport),
                Err(_) => Err(GsmError::Timeout),
            }
        } else {
            stream.write(buf).await.map_err(GsmError::Transport)
        }
    }

    async fn discard_input(&mut self) -> GsmResult<()> {
        let stream = self.stream_mut()?;
        stream.clear(ClearBuffer::Input).map_err(|e| {
            GsmError::Transport(std::io::Error::other(format!(
                "Failed to clear input buffer: {}",
                e
            )))
        })
    }

    async fn flush(&mut self) -> GsmResult<()> {
        let stream = self.stream_mut()?;
        stream.flush().await.map_err(GsmError::Transport)
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    async fn close(&mut self) -> GsmResult<()> {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.flush().await;
        }
        self.closed = true;
        Ok(())
    }
}
