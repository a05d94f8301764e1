//! AT channel implementation
//!
//! The transport sits behind an async mutex so a deadline-raced read can
//! run on a detached task that owns the port for its own bounded lifetime
//! (bounded by the transport's per-read timeout), while ordinary
//! send/expect exchanges run on the caller's task.

use crate::commands::{TERM_ERROR, TERM_OK};
use bytes::BytesMut;
use gsm_core::{GsmError, GsmResult};
use gsm_transport::StreamAccessor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, oneshot};

/// Offset added to the read budget for the CR/LF the modem prepends to a
/// terminator line
const READ_BUDGET_SLACK: usize = 2;

/// Some networks follow a USSD answer with a promotional trailer; a result
/// ending in this suffix is dropped rather than delivered.
const SPURIOUS_SUFFIX: &str = "\"Terima";

/// Escape CR/LF bytes so wire traffic logs stay single-line and diffable
pub fn printable(input: &str) -> String {
    input.replace("\r\n", "\\r\\n").replace('\r', "\\r")
}

/// Command/response channel over a byte-stream transport
pub struct AtChannel<S: StreamAccessor + 'static> {
    transport: Arc<Mutex<S>>,
}

impl<S: StreamAccessor + 'static> AtChannel<S> {
    /// Wrap an already-open transport
    pub fn new(transport: S) -> Self {
        Self {
            transport: Arc::new(Mutex::new(transport)),
        }
    }

    /// Write a command verbatim, discarding any stale unread input first
    ///
    /// The discard prevents a response from being matched against leftover
    /// bytes of a previous exchange.
    pub async fn send(&self, command: &str) -> GsmResult<()> {
        log::debug!("--- send: {}", printable(command));
        let mut port = self.transport.lock().await;
        port.discard_input().await?;
        port.write_all(command.as_bytes()).await?;
        port.flush().await?;
        Ok(())
    }

    /// Read until the accumulated buffer ends in one of `candidates`
    ///
    /// Matching is an exact, case-sensitive suffix check, control
    /// characters included, evaluated after every read. The read budget is
    /// the longest candidate length plus two; once that many read attempts
    /// pass without a match the call fails with `GsmError::NoMatch`
    /// carrying the partial buffer for diagnostics. Empty reads and
    /// per-read timeouts consume budget; any other transport error
    /// propagates immediately.
    pub async fn expect(&self, candidates: &[&str]) -> GsmResult<String> {
        let budget = candidates.iter().map(|c| c.len()).max().unwrap_or(0) + READ_BUDGET_SLACK;
        let mut accumulated = BytesMut::new();
        let mut buf = vec![0u8; budget];

        let mut port = self.transport.lock().await;
        for _ in 0..budget {
            let n = match port.read(&mut buf).await {
                Ok(n) => n,
                Err(GsmError::Timeout) => 0,
                Err(e) => return Err(e),
            };
            if n == 0 {
                continue;
            }
            accumulated.extend_from_slice(&buf[..n]);

            let text = String::from_utf8_lossy(&accumulated);
            for candidate in candidates {
                if text.ends_with(candidate) {
                    log::debug!(
                        "--- expect: {} got: {}",
                        printable(&candidates.join("|")),
                        printable(&text)
                    );
                    return Ok(text.into_owned());
                }
            }
        }

        let partial = String::from_utf8_lossy(&accumulated).into_owned();
        log::debug!(
            "--- expect: {} got: {} (match not found)",
            printable(&candidates.join("|")),
            printable(&partial)
        );
        Err(GsmError::NoMatch { partial })
    }

    /// Read until the transport signals end of segment, concatenating all
    /// complete lines with no separator
    ///
    /// Receiving zero lines is not an error; a failed transport read is.
    pub async fn read_all(&self) -> GsmResult<String> {
        let mut port = self.transport.lock().await;
        read_segment(&mut *port).await
    }

    /// Race a background read against a deadline
    ///
    /// If the deadline elapses first the caller gets `GsmError::Timeout`
    /// and the read is abandoned; it may still run to completion on its
    /// own task with no further observable effect, bounded by the
    /// transport's per-read timeout. If the read completes first its
    /// result is delivered exactly once — unless it ends in the known
    /// spurious trailer, in which case nothing is delivered on that arm
    /// and the caller waits out the deadline.
    pub async fn read_with_timeout(&self, deadline: Duration) -> GsmResult<String> {
        let deadline_at = tokio::time::Instant::now() + deadline;
        let (tx, rx) = oneshot::channel::<GsmResult<String>>();
        let transport = Arc::clone(&self.transport);
        tokio::spawn(async move {
            let mut port = transport.lock().await;
            match read_segment(&mut *port).await {
                Ok(text) if text.ends_with(SPURIOUS_SUFFIX) => {
                    log::debug!("--- read: dropping spurious trailer: {}", printable(&text));
                }
                outcome => {
                    let _ = tx.send(outcome);
                }
            }
        });

        tokio::select! {
            _ = tokio::time::sleep_until(deadline_at) => Err(GsmError::Timeout),
            outcome = rx => match outcome {
                Ok(result) => result,
                Err(_) => {
                    // The read arm withheld its result; honor the full deadline
                    tokio::time::sleep_until(deadline_at).await;
                    Err(GsmError::Timeout)
                }
            },
        }
    }

    /// Primary entry point: send, then wait for `OK\r\n`/`ERROR\r\n` when
    /// `wait_for_reply` is set, else drain whatever the modem says
    ///
    /// No deadline of its own; callers needing bounded wait wrap the read
    /// side with [`AtChannel::read_with_timeout`].
    pub async fn send_command(&self, command: &str, wait_for_reply: bool) -> GsmResult<String> {
        self.send(command).await?;
        if wait_for_reply {
            self.expect(&[TERM_OK, TERM_ERROR]).await
        } else {
            self.read_all().await
        }
    }

    /// Close the underlying transport
    pub async fn close(&self) -> GsmResult<()> {
        let mut port = self.transport.lock().await;
        port.close().await
    }
}

/// Read until end of segment (zero-length read or per-read timeout) and
/// concatenate complete lines with no separator
async fn read_segment<S: StreamAccessor + ?Sized>(port: &mut S) -> GsmResult<String> {
    let mut raw = Vec::new();
    let mut buf = [0u8; 256];
    loop {
        match port.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => raw.extend_from_slice(&buf[..n]),
            Err(GsmError::Timeout) => break,
            Err(e) => return Err(e),
        }
    }

    let text = String::from_utf8_lossy(&raw);
    let joined: String = text
        .split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .collect();
    Ok(joined)
}
