//! Rendezvous slots between driver callbacks and waiting callers
//!
//! The driver invokes its status callback from inside a pump call, on a
//! call stack the driver controls. The callback does nothing but write the
//! outcome into a slot (plus logging); the waiting caller polls the slot
//! between pumps. Each slot is owned by one session and handed to the
//! driver at callback registration, so two sessions in one process never
//! contaminate each other's sends.

use gsm_core::{GsmError, GsmResult, ReceivedSms};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Outcome slot for one asynchronous send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    /// No send armed
    Idle,
    /// Armed, waiting for the network reply
    Pending,
    /// The callback reported status code 0
    Delivered,
    /// The callback reported a nonzero status code
    Failed(i32),
}

/// Shared slot holding the outcome of the in-flight send
///
/// Exactly one send may own the slot at a time: arming while a send is
/// still pending is rejected with `GsmError::Busy` rather than silently
/// clobbering the earlier send's outcome.
#[derive(Debug)]
pub struct SendRendezvous {
    slot: Mutex<SendStatus>,
}

impl SendRendezvous {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(SendStatus::Idle),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SendStatus> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the slot for a new send, setting it to `Pending`
    ///
    /// Must be called before the send is submitted; some modems answer
    /// instantly, and the callback may fire during submission itself.
    pub fn arm(&self) -> GsmResult<()> {
        let mut slot = self.lock();
        if *slot == SendStatus::Pending {
            return Err(GsmError::Busy);
        }
        *slot = SendStatus::Pending;
        Ok(())
    }

    /// Callback side: record the driver's status code
    ///
    /// Invoked exactly once per send attempt by the driver runtime. Writes
    /// the slot and logs; never blocks, never retries.
    pub fn complete(&self, status_code: i32) {
        let mut slot = self.lock();
        if status_code == 0 {
            log::debug!("send status callback: delivered");
            *slot = SendStatus::Delivered;
        } else {
            log::debug!("send status callback: failed with code {}", status_code);
            *slot = SendStatus::Failed(status_code);
        }
    }

    /// Waiter side: current slot value
    pub fn status(&self) -> SendStatus {
        *self.lock()
    }

    /// Release the slot once the waiter has taken the outcome
    pub fn disarm(&self) {
        *self.lock() = SendStatus::Idle;
    }
}

impl Default for SendRendezvous {
    fn default() -> Self {
        Self::new()
    }
}

/// Slot for the last callback-delivered inbound message
#[derive(Debug)]
pub struct IncomingRendezvous {
    slot: Mutex<Option<ReceivedSms>>,
}

impl IncomingRendezvous {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<ReceivedSms>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Callback side: deposit a message the driver just received
    pub fn deliver(&self, sms: ReceivedSms) {
        log::debug!("incoming sms from {}", sms.number);
        *self.lock() = Some(sms);
    }

    /// Waiter side: take the message, if one has arrived
    pub fn take(&self) -> Option<ReceivedSms> {
        self.lock().take()
    }
}

impl Default for IncomingRendezvous {
    fn default() -> Self {
        Self::new()
    }
}
