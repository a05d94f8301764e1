//! Stream accessor trait for the transport layer

use async_trait::async_trait;
use gsm_core::{GsmError, GsmResult};

/// Stream accessor interface to a physical byte stream to the modem
///
/// The per-read timeout is fixed at construction time by the concrete
/// transport's settings.
#[async_trait]
pub trait StreamAccessor: Send + Sync {
    /// Read available bytes into `buf`
    ///
    /// Returns the number of bytes read. `Ok(0)` signals end of stream.
    /// A per-read timeout surfaces as `GsmError::Timeout` so callers can
    /// treat it as end-of-segment rather than a transport failure.
    async fn read(&mut self, buf: &mut [u8]) -> GsmResult<usize>;

    /// Write data to the stream, returning the number of bytes written
    async fn write(&mut self, buf: &[u8]) -> GsmResult<usize>;

    /// Write all of `buf` to the stream
    async fn write_all(&mut self, buf: &[u8]) -> GsmResult<()> {
        let mut written = 0;
        while written < buf.len() {
            let n = self.write(&buf[written..]).await?;
            if n == 0 {
                return Err(GsmError::Transport(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "Failed to write all data",
                )));
            }
            written += n;
        }
        Ok(())
    }

    /// Discard any unread bytes sitting in the receive buffer
    ///
    /// Used before writing a command so a response is never matched
    /// against stale bytes from a previous exchange.
    async fn discard_input(&mut self) -> GsmResult<()>;

    /// Flush any buffered outbound data
    async fn flush(&mut self) -> GsmResult<()>;

    /// Check if the stream is closed
    fn is_closed(&self) -> bool;

    /// Close the stream
    async fn close(&mut self) -> GsmResult<()>;
}

/// Transport layer trait that extends StreamAccessor
#[async_trait]
pub trait TransportLayer: StreamAccessor {
    /// Open the physical connection
    async fn open(&mut self) -> GsmResult<()>;
}
