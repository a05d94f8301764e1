//! Async SMS/USSD modem coordination
//!
//! Re-exports the full stack:
//! - [`gsm_core`] — error and message types
//! - [`gsm_transport`] — serial byte-stream transport and the port opener seam
//! - [`gsm_at`] — AT command channel (send/expect, bounded reads)
//! - [`gsm_driver`] — native driver boundary and send-status rendezvous
//! - [`gsm_session`] — session coordination (SMS, USSD, connect/reconnect)

pub use gsm_core::{GsmError, GsmResult, ReceivedSms, SmsSubmission};

pub use gsm_at::{AtChannel, CMD_CHARSET_GSM, TERM_ERROR, TERM_OK, cmd_ussd_query};
pub use gsm_driver::{
    IncomingRendezvous, ModemDriver, SendPollConfig, SendRendezvous, SendStatus, send_and_confirm,
    wait_for_incoming,
};
pub use gsm_session::{GsmSession, SessionConfig};
pub use gsm_transport::{
    PortOpener, SerialPortOpener, SerialSettings, SerialTransport, StreamAccessor, TransportLayer,
};
