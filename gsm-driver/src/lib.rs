//! Native driver boundary for the gsm modem stack
//!
//! The native state-machine driver (the library that actually talks SMS to
//! the hardware) is an opaque collaborator: this crate defines the trait a
//! driver must implement, the rendezvous slots its callbacks write into,
//! and the pump loop that turns a callback-delivered completion signal
//! into a value a synchronous caller can await.

pub mod driver;
pub mod poller;
pub mod rendezvous;

pub use driver::ModemDriver;
pub use gsm_core::{GsmError, GsmResult};
pub use poller::{SendPollConfig, send_and_confirm, wait_for_incoming};
pub use rendezvous::{IncomingRendezvous, SendRendezvous, SendStatus};
