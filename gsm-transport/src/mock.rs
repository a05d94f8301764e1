//! Scripted in-memory transport for tests
//!
//! Reads are served from a script of steps; writes and input discards are
//! recorded behind a shared handle so tests can assert on them after the
//! transport has been moved into a channel or session.

use crate::stream::{StreamAccessor, TransportLayer};
use async_trait::async_trait;
use gsm_core::{GsmError, GsmResult};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// One step of a read script
#[derive(Debug, Clone)]
pub enum ScriptedRead {
    /// Deliver these bytes immediately
    Data(Vec<u8>),
    /// Deliver these bytes after a delay (drives the tokio clock in
    /// paused-time tests)
    Delayed(Duration, Vec<u8>),
    /// A per-read timeout with no data
    Timeout,
    /// End of stream
    Eof,
    /// A transport-level failure
    Error(std::io::ErrorKind),
}

/// Shared record of everything a test transport observed
#[derive(Debug, Default)]
pub struct MockLog {
    pub writes: Vec<String>,
    pub discards: usize,
}

/// Scripted transport implementing the stream accessor
#[derive(Debug)]
pub struct MockTransport {
    script: VecDeque<ScriptedRead>,
    log: Arc<Mutex<MockLog>>,
    closed: bool,
}

impl MockTransport {
    pub fn new(script: Vec<ScriptedRead>) -> Self {
        Self {
            script: script.into(),
            log: Arc::new(Mutex::new(MockLog::default())),
            closed: false,
        }
    }

    /// Handle to the write/discard record, valid after the transport has
    /// been moved elsewhere
    pub fn log_handle(&self) -> Arc<Mutex<MockLog>> {
        Arc::clone(&self.log)
    }
}

fn lock_log(log: &Arc<Mutex<MockLog>>) -> std::sync::MutexGuard<'_, MockLog> {
    log.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Read the commands a mock transport has seen so far
pub fn written_commands(log: &Arc<Mutex<MockLog>>) -> Vec<String> {
    lock_log(log).writes.clone()
}

#[async_trait]
impl StreamAccessor for MockTransport {
    async fn read(&mut self, buf: &mut [u8]) -> GsmResult<usize> {
        let step = match self.script.pop_front() {
            Some(step) => step,
            // Script exhausted: behave like a quiet line at end of segment
            None => return Ok(0),
        };

        let data = match step {
            ScriptedRead::Data(data) => data,
            ScriptedRead::Delayed(delay, data) => {
                tokio::time::sleep(delay).await;
                data
            }
            ScriptedRead::Timeout => return Err(GsmError::Timeout),
            ScriptedRead::Eof => return Ok(0),
            ScriptedRead::Error(kind) => {
                return Err(GsmError::Transport(std::io::Error::new(
                    kind,
                    "scripted transport failure",
                )));
            }
        };

        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        // Anything that did not fit is pushed back for the next read
        if n < data.len() {
            self.script.push_front(ScriptedRead::Data(data[n..].to_vec()));
        }
        Ok(n)
    }

    async fn write(&mut self, buf: &[u8]) -> GsmResult<usize> {
        lock_log(&self.log)
            .writes
            .push(String::from_utf8_lossy(buf).into_owned());
        Ok(buf.len())
    }

    async fn discard_input(&mut self) -> GsmResult<()> {
        lock_log(&self.log).discards += 1;
        Ok(())
    }

    async fn flush(&mut self) -> GsmResult<()> {
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    async fn close(&mut self) -> GsmResult<()> {
        self.closed = true;
        Ok(())
    }
}

#[async_trait]
impl TransportLayer for MockTransport {
    async fn open(&mut self) -> GsmResult<()> {
        self.closed = false;
        Ok(())
    }
}
