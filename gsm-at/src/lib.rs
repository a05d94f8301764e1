//! AT command channel for the gsm modem stack
//!
//! This crate drives a byte-stream transport with a send-then-expect
//! discipline: write a command, then read until a known terminator string
//! appears or a read budget is exhausted, with an optional deadline-raced
//! read for unsolicited result text (USSD answers).

pub mod channel;
pub mod commands;

pub use channel::{AtChannel, printable};
pub use commands::{CMD_CHARSET_GSM, TERM_ERROR, TERM_OK, cmd_ussd_query};
pub use gsm_core::{GsmError, GsmResult};
