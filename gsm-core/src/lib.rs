//! Core types for the gsm modem stack
//!
//! This crate provides the shared error type and the SMS message types used
//! by the transport, AT channel, driver, and session crates.

pub mod error;
pub mod sms;

pub use error::{GsmError, GsmResult};
pub use sms::{ReceivedSms, SmsSubmission};
