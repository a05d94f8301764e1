//! The native driver boundary
//!
//! Everything the stack needs from the underlying state-machine library,
//! expressed as a trait so the rest of the workspace never touches the
//! hardware binding directly and tests can substitute a scripted driver.

use crate::rendezvous::{IncomingRendezvous, SendRendezvous};
use async_trait::async_trait;
use gsm_core::{GsmResult, ReceivedSms, SmsSubmission};
use std::sync::Arc;

/// Interface to the native modem state machine
///
/// `submit_sms` only hands the message to the driver; delivery is
/// confirmed asynchronously through the registered [`SendRendezvous`] as
/// the caller pumps device I/O. Incoming messages arrive through the
/// registered [`IncomingRendezvous`] the same way.
#[async_trait]
pub trait ModemDriver: Send {
    /// Device name from the driver's own configuration, if any
    fn configured_device(&self) -> Option<String>;

    /// Whether the driver currently holds an open device session
    fn is_connected(&self) -> bool;

    /// Establish the device session and hook up the status callbacks
    async fn connect(&mut self) -> GsmResult<()>;

    /// Tear down the device session, releasing the serial device
    async fn terminate(&mut self) -> GsmResult<()>;

    /// Process one unit of pending device I/O
    ///
    /// Callbacks fire from inside this call, on the driver's stack. Never
    /// blocks longer than the driver's own I/O timeouts.
    async fn pump(&mut self) -> GsmResult<()>;

    /// Hand a message to the driver for sending
    async fn submit_sms(&mut self, submission: &SmsSubmission) -> GsmResult<()>;

    /// Fetch the next stored message; `restart` begins a fresh walk.
    /// `Ok(None)` means the storage is drained.
    async fn next_sms(&mut self, restart: bool) -> GsmResult<Option<ReceivedSms>>;

    /// Delete a stored message
    async fn delete_sms(&mut self, sms: &ReceivedSms) -> GsmResult<()>;

    /// Enable or disable delivery of incoming messages via callback
    async fn set_incoming_enabled(&mut self, enabled: bool) -> GsmResult<()>;

    /// Register the slot the send-status callback writes into
    fn register_send_status(&mut self, rendezvous: Arc<SendRendezvous>);

    /// Register the slot the incoming-message callback writes into
    fn register_incoming(&mut self, rendezvous: Arc<IncomingRendezvous>);

    /// Render a nonzero driver status code as a human-readable message
    fn describe_error(&self, code: i32) -> String;
}
