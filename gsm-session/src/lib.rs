//! Session coordination for the gsm modem stack
//!
//! The native driver and the AT channel cannot share the serial device;
//! this crate owns the connect/disconnect dance between them and exposes
//! the user-facing operations: SMS send (single and multipart), inbox
//! reading, incoming-message waits, and USSD queries.

pub mod session;

pub use gsm_core::{GsmError, GsmResult};
pub use session::{GsmSession, SessionConfig};
