//! Transport layer for the gsm modem stack
//!
//! This crate provides the byte-stream accessor trait used by the AT
//! channel, its serial-port implementation, and the opener seam through
//! which a session lazily acquires a port.

pub mod opener;
pub mod serial;
pub mod stream;

#[cfg(feature = "mock")]
pub mod mock;

pub use gsm_core::{GsmError, GsmResult};
pub use opener::{PortOpener, SerialPortOpener};
pub use serial::{DEFAULT_BAUD, DEFAULT_READ_TIMEOUT, SerialSettings, SerialTransport};
pub use stream::{StreamAccessor, TransportLayer};
