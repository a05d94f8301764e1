//! Send-poll loop
//!
//! Bridges the callback-delivered completion signal into a value the
//! caller can await: arm the slot, submit, then pump device I/O in a loop,
//! checking the slot after every pump. The interval between pumps and the
//! ceiling on pump attempts are explicit configuration rather than an
//! unbounded spin.

use crate::driver::ModemDriver;
use crate::rendezvous::{IncomingRendezvous, SendRendezvous, SendStatus};
use gsm_core::{GsmError, GsmResult, ReceivedSms, SmsSubmission};
use std::time::Duration;

/// Pacing for the pump loop
#[derive(Debug, Clone)]
pub struct SendPollConfig {
    /// Sleep between pumps; zero reproduces a tight spin bounded only by
    /// the driver's own I/O timeouts
    pub poll_interval: Duration,
    /// Maximum pumps before the wait is declared a timeout
    pub max_pumps: u32,
}

impl Default for SendPollConfig {
    /// 10 ms between pumps, 3000 pumps: roughly a 30 second ceiling on top
    /// of whatever the driver's own I/O takes
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(10),
            max_pumps: 3000,
        }
    }
}

/// Send one message and wait for the network's delivery report
///
/// The slot is armed before submission (some modems answer instantly) and
/// disarmed on every exit path so the next send can claim it. A second
/// caller arriving while a send is pending gets `GsmError::Busy` from the
/// arm step.
pub async fn send_and_confirm<D: ModemDriver + ?Sized>(
    driver: &mut D,
    rendezvous: &SendRendezvous,
    submission: &SmsSubmission,
    config: &SendPollConfig,
) -> GsmResult<()> {
    rendezvous.arm()?;
    let result = submit_and_wait(driver, rendezvous, submission, config).await;
    rendezvous.disarm();
    result
}

async fn submit_and_wait<D: ModemDriver + ?Sized>(
    driver: &mut D,
    rendezvous: &SendRendezvous,
    submission: &SmsSubmission,
    config: &SendPollConfig,
) -> GsmResult<()> {
    driver.submit_sms(submission).await?;

    for _ in 0..config.max_pumps {
        driver.pump().await?;
        match rendezvous.status() {
            SendStatus::Delivered => {
                log::info!("sms to {} delivered", submission.number);
                return Ok(());
            }
            SendStatus::Failed(code) => {
                return Err(GsmError::Driver {
                    code,
                    message: driver.describe_error(code),
                });
            }
            SendStatus::Pending | SendStatus::Idle => {
                if !config.poll_interval.is_zero() {
                    tokio::time::sleep(config.poll_interval).await;
                }
            }
        }
    }

    log::error!("sms to {} not confirmed within pump budget", submission.number);
    Err(GsmError::Timeout)
}

/// Pump device I/O until the incoming slot yields a message
pub async fn wait_for_incoming<D: ModemDriver + ?Sized>(
    driver: &mut D,
    rendezvous: &IncomingRendezvous,
    config: &SendPollConfig,
) -> GsmResult<ReceivedSms> {
    for _ in 0..config.max_pumps {
        driver.pump().await?;
        if let Some(sms) = rendezvous.take() {
            return Ok(sms);
        }
        if !config.poll_interval.is_zero() {
            tokio::time::sleep(config.poll_interval).await;
        }
    }
    Err(GsmError::Timeout)
}
