//! Modem session
//!
//! A session composes a native driver with a lazily-created AT channel.
//! Invariant: the driver and the channel never both hold the serial device
//! open — a USSD query tears the driver's session down first and restores
//! it afterward, on every exit path.

use gsm_at::channel::AtChannel;
use gsm_at::commands;
use gsm_core::{GsmError, GsmResult, ReceivedSms, SmsSubmission};
use gsm_driver::driver::ModemDriver;
use gsm_driver::poller::{SendPollConfig, send_and_confirm, wait_for_incoming};
use gsm_driver::rendezvous::{IncomingRendezvous, SendRendezvous};
use gsm_transport::PortOpener;
use std::sync::Arc;
use std::time::Duration;

/// Longest text sent as a single message
pub const SINGLE_SMS_MAX: usize = 160;

/// Part size for concatenated sends; the driver adds its own multipart
/// headers, which cost payload space
const LONG_SMS_PART_LEN: usize = 153;

/// Session tunables
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Bounded wait for the USSD result text after the submit command
    pub ussd_timeout: Duration,
    /// Pacing for the send-confirmation pump loop
    pub poll: SendPollConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ussd_timeout: Duration::from_secs(30),
            poll: SendPollConfig::default(),
        }
    }
}

/// A modem session: native driver plus an optional AT channel handle
///
/// All operations take `&mut self`, so sends from one session cannot
/// overlap. Each session owns a private rendezvous slot, registered with
/// its driver at construction; a caller arming the slot while a send is
/// still pending is rejected with `GsmError::Busy` at the arm step.
pub struct GsmSession<D: ModemDriver, P: PortOpener> {
    driver: D,
    opener: P,
    engine: Option<AtChannel<P::Transport>>,
    send_status: Arc<SendRendezvous>,
    incoming: Arc<IncomingRendezvous>,
    config: SessionConfig,
}

impl<D: ModemDriver, P: PortOpener> GsmSession<D, P> {
    /// Create a session, registering its rendezvous slots with the driver
    pub fn new(mut driver: D, opener: P, config: SessionConfig) -> Self {
        let send_status = Arc::new(SendRendezvous::new());
        let incoming = Arc::new(IncomingRendezvous::new());
        driver.register_send_status(Arc::clone(&send_status));
        driver.register_incoming(Arc::clone(&incoming));
        Self {
            driver,
            opener,
            engine: None,
            send_status,
            incoming,
            config,
        }
    }

    pub async fn connect(&mut self) -> GsmResult<()> {
        self.driver.connect().await
    }

    pub fn is_connected(&self) -> bool {
        self.driver.is_connected()
    }

    /// Tear down the session: the AT channel handle first, then the driver
    pub async fn terminate(&mut self) -> GsmResult<()> {
        if let Some(engine) = self.engine.take() {
            engine.close().await?;
        }
        self.driver.terminate().await
    }

    /// Send a single-part message and wait for the delivery report
    pub async fn send_sms(&mut self, text: &str, number: &str) -> GsmResult<()> {
        let submission = SmsSubmission::new(number, text);
        send_and_confirm(
            &mut self.driver,
            &self.send_status,
            &submission,
            &self.config.poll,
        )
        .await
    }

    /// Send a long text as concatenated parts
    ///
    /// Each part is an independent send: the rendezvous slot is re-armed
    /// and the delivery report awaited per part, and the first failed part
    /// aborts the rest.
    pub async fn send_long_sms(&mut self, text: &str, number: &str) -> GsmResult<()> {
        for part in split_into_parts(text) {
            let submission = SmsSubmission::new(number, part);
            send_and_confirm(
                &mut self.driver,
                &self.send_status,
                &submission,
                &self.config.poll,
            )
            .await?;
        }
        Ok(())
    }

    /// Send `text`, choosing single or multipart by length
    pub async fn send_text(&mut self, text: &str, number: &str) -> GsmResult<()> {
        if text.chars().count() <= SINGLE_SMS_MAX {
            self.send_sms(text, number).await
        } else {
            self.send_long_sms(text, number).await
        }
    }

    /// Drain the modem's message storage, optionally deleting as we go
    pub async fn read_sms(&mut self, delete: bool) -> GsmResult<Vec<ReceivedSms>> {
        let mut messages = Vec::new();
        let mut restart = true;
        while let Some(sms) = self.driver.next_sms(restart).await? {
            restart = false;
            if delete {
                self.driver.delete_sms(&sms).await?;
            }
            messages.push(sms);
        }
        Ok(messages)
    }

    /// Block until the driver delivers an incoming message
    pub async fn wait_for_sms(&mut self) -> GsmResult<ReceivedSms> {
        self.driver.set_incoming_enabled(true).await?;
        wait_for_incoming(&mut self.driver, &self.incoming, &self.config.poll).await
    }

    /// Run a USSD query for `code` over the raw AT channel
    ///
    /// The target device is the explicit argument, else the driver's
    /// configured device. If the driver holds the device, its session is
    /// terminated first and re-established afterward whether the query
    /// succeeded or not. The AT channel is constructed on first use and
    /// reused by later queries (device name fixed at construction).
    pub async fn get_ussd(&mut self, code: &str, device: Option<&str>) -> GsmResult<String> {
        let device = match device {
            Some(name) => name.to_string(),
            None => self.driver.configured_device().ok_or_else(|| {
                GsmError::Config("no device given and none configured on the driver".to_string())
            })?,
        };

        let was_connected = self.driver.is_connected();
        if was_connected {
            log::info!("releasing {} from the driver for a USSD query", device);
            self.driver.terminate().await?;
        }

        let result = self.ussd_exchange(code, &device).await;

        if was_connected {
            log::info!("restoring driver session on {}", device);
            if let Err(e) = self.driver.connect().await {
                // The query outcome is the caller's primary concern; a
                // failed restore is logged, not surfaced over it.
                log::error!("failed to reconnect driver after USSD query: {}", e);
            }
        }

        result
    }

    async fn ussd_exchange(&mut self, code: &str, device: &str) -> GsmResult<String> {
        if self.engine.is_none() {
            let transport = self.opener.open(device).await?;
            self.engine = Some(AtChannel::new(transport));
        }
        let Some(engine) = self.engine.as_ref() else {
            return Err(GsmError::Config("AT channel unavailable".to_string()));
        };

        let charset = engine.send_command(commands::CMD_CHARSET_GSM, true).await?;
        if charset.ends_with(commands::TERM_ERROR) {
            return Err(GsmError::CommandFailed(charset));
        }

        let submitted = engine
            .send_command(&commands::cmd_ussd_query(code), true)
            .await?;
        if submitted.ends_with(commands::TERM_ERROR) {
            return Err(GsmError::CommandFailed(submitted));
        }

        engine.read_with_timeout(self.config.ussd_timeout).await
    }
}

/// Split text into fixed-size parts for a concatenated send
fn split_into_parts(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut part = String::new();
    let mut count = 0;
    for ch in text.chars() {
        part.push(ch);
        count += 1;
        if count == LONG_SMS_PART_LEN {
            parts.push(std::mem::take(&mut part));
            count = 0;
        }
    }
    if !part.is_empty() {
        parts.push(part);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gsm_transport::mock::{MockLog, MockTransport, ScriptedRead, written_commands};
    use std::sync::Mutex as StdMutex;

    /// Driver double that records lifecycle events and completes sends on
    /// a scripted pump
    struct FakeDriver {
        device: Option<String>,
        connected: bool,
        events: Vec<&'static str>,
        send_status: Option<Arc<SendRendezvous>>,
        incoming: Option<Arc<IncomingRendezvous>>,
        complete_on_pump: u32,
        status_code: i32,
        pumps: u32,
        submitted: Vec<SmsSubmission>,
        inbox: Vec<ReceivedSms>,
        cursor: usize,
        deleted: Vec<i32>,
        incoming_sms: Option<ReceivedSms>,
        incoming_enabled: bool,
    }

    impl FakeDriver {
        fn new(connected: bool) -> Self {
            Self {
                device: Some("/dev/ttyUSB0".to_string()),
                connected,
                events: Vec::new(),
                send_status: None,
                incoming: None,
                complete_on_pump: 1,
                status_code: 0,
                pumps: 0,
                submitted: Vec::new(),
                inbox: Vec::new(),
                cursor: 0,
                deleted: Vec::new(),
                incoming_sms: None,
                incoming_enabled: false,
            }
        }
    }

    #[async_trait]
    impl ModemDriver for FakeDriver {
        fn configured_device(&self) -> Option<String> {
            self.device.clone()
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        async fn connect(&mut self) -> GsmResult<()> {
            self.events.push("connect");
            self.connected = true;
            Ok(())
        }

        async fn terminate(&mut self) -> GsmResult<()> {
            self.events.push("terminate");
            self.connected = false;
            Ok(())
        }

        async fn pump(&mut self) -> GsmResult<()> {
            self.pumps += 1;
            if self.pumps % self.complete_on_pump == 0 {
                if let Some(rendezvous) = &self.send_status {
                    rendezvous.complete(self.status_code);
                }
                if let (Some(rendezvous), Some(sms)) = (&self.incoming, self.incoming_sms.take()) {
                    rendezvous.deliver(sms);
                }
            }
            Ok(())
        }

        async fn submit_sms(&mut self, submission: &SmsSubmission) -> GsmResult<()> {
            self.submitted.push(submission.clone());
            Ok(())
        }

        async fn next_sms(&mut self, restart: bool) -> GsmResult<Option<ReceivedSms>> {
            if restart {
                self.cursor = 0;
            }
            let sms = self.inbox.get(self.cursor).cloned();
            self.cursor += 1;
            Ok(sms)
        }

        async fn delete_sms(&mut self, sms: &ReceivedSms) -> GsmResult<()> {
            self.deleted.push(sms.location);
            Ok(())
        }

        async fn set_incoming_enabled(&mut self, enabled: bool) -> GsmResult<()> {
            self.incoming_enabled = enabled;
            Ok(())
        }

        fn register_send_status(&mut self, rendezvous: Arc<SendRendezvous>) {
            self.send_status = Some(rendezvous);
        }

        fn register_incoming(&mut self, rendezvous: Arc<IncomingRendezvous>) {
            self.incoming = Some(rendezvous);
        }

        fn describe_error(&self, code: i32) -> String {
            format!("driver status {}", code)
        }
    }

    /// Opener double handing out a pre-scripted transport
    struct FakeOpener {
        transport: StdMutex<Option<MockTransport>>,
        opens: StdMutex<Vec<String>>,
    }

    impl FakeOpener {
        fn new(transport: MockTransport) -> Self {
            Self {
                transport: StdMutex::new(Some(transport)),
                opens: StdMutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PortOpener for FakeOpener {
        type Transport = MockTransport;

        async fn open(&self, device: &str) -> GsmResult<MockTransport> {
            self.opens.lock().unwrap().push(device.to_string());
            self.transport
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| GsmError::Config("no scripted transport left".to_string()))
        }
    }

    fn spin_config() -> SessionConfig {
        SessionConfig {
            ussd_timeout: Duration::from_secs(30),
            poll: SendPollConfig {
                poll_interval: Duration::ZERO,
                max_pumps: 100,
            },
        }
    }

    fn ussd_session(
        driver: FakeDriver,
        script: Vec<ScriptedRead>,
    ) -> (GsmSession<FakeDriver, FakeOpener>, Arc<StdMutex<MockLog>>) {
        let transport = MockTransport::new(script);
        let log = transport.log_handle();
        let session = GsmSession::new(driver, FakeOpener::new(transport), spin_config());
        (session, log)
    }

    #[tokio::test]
    async fn test_ussd_round_trip() {
        let (mut session, log) = ussd_session(
            FakeDriver::new(true),
            vec![
                ScriptedRead::Data(b"OK\r\n".to_vec()),
                ScriptedRead::Data(b"OK\r\n".to_vec()),
                ScriptedRead::Data(b"Saldo Anda Rp 10.000\r\n".to_vec()),
            ],
        );

        let result = session.get_ussd("*888#", None).await.unwrap();

        assert_eq!(result, "Saldo Anda Rp 10.000");
        assert_eq!(
            written_commands(&log),
            vec![
                commands::CMD_CHARSET_GSM.to_string(),
                commands::cmd_ussd_query("*888#"),
            ]
        );
        // Exactly one terminate, then exactly one reconnect.
        assert_eq!(session.driver.events, vec!["terminate", "connect"]);
    }

    #[tokio::test]
    async fn test_ussd_charset_error_short_circuits() {
        let (mut session, log) = ussd_session(
            FakeDriver::new(true),
            vec![ScriptedRead::Data(b"ERROR\r\n".to_vec())],
        );

        let err = session.get_ussd("*888#", None).await.unwrap_err();

        assert!(matches!(err, GsmError::CommandFailed(_)));
        // The USSD submit was never written to the transport.
        assert_eq!(
            written_commands(&log),
            vec![commands::CMD_CHARSET_GSM.to_string()]
        );
        // The driver session is still restored on the error path.
        assert_eq!(session.driver.events, vec!["terminate", "connect"]);
    }

    #[tokio::test]
    async fn test_ussd_skips_reconnect_when_not_connected() {
        let (mut session, _log) = ussd_session(
            FakeDriver::new(false),
            vec![
                ScriptedRead::Data(b"OK\r\n".to_vec()),
                ScriptedRead::Data(b"OK\r\n".to_vec()),
                ScriptedRead::Data(b"*123# ok\r\n".to_vec()),
            ],
        );

        session.get_ussd("*123#", None).await.unwrap();

        assert!(session.driver.events.is_empty());
    }

    #[tokio::test]
    async fn test_ussd_requires_a_device_name() {
        let mut driver = FakeDriver::new(true);
        driver.device = None;
        let (mut session, _log) = ussd_session(driver, vec![]);

        let err = session.get_ussd("*888#", None).await.unwrap_err();

        assert!(matches!(err, GsmError::Config(_)));
        // Resolution failed before any teardown happened.
        assert!(session.driver.events.is_empty());
    }

    #[tokio::test]
    async fn test_ussd_engine_is_reused_across_queries() {
        let (mut session, _log) = ussd_session(
            FakeDriver::new(false),
            vec![
                ScriptedRead::Data(b"OK\r\n".to_vec()),
                ScriptedRead::Data(b"OK\r\n".to_vec()),
                ScriptedRead::Data(b"first\r\n".to_vec()),
            ],
        );

        session.get_ussd("*1#", None).await.unwrap();
        // Second query reuses the engine; its script is spent, so the
        // charset expect runs out of budget.
        let err = session.get_ussd("*2#", None).await.unwrap_err();

        assert!(matches!(err, GsmError::NoMatch { .. }));
        assert_eq!(
            *session.opener.opens.lock().unwrap(),
            vec!["/dev/ttyUSB0".to_string()]
        );
    }

    #[tokio::test]
    async fn test_ussd_explicit_device_overrides_configured() {
        let (mut session, _log) = ussd_session(
            FakeDriver::new(false),
            vec![
                ScriptedRead::Data(b"OK\r\n".to_vec()),
                ScriptedRead::Data(b"OK\r\n".to_vec()),
                ScriptedRead::Data(b"ok\r\n".to_vec()),
            ],
        );

        session.get_ussd("*1#", Some("/dev/ttyACM3")).await.unwrap();

        assert_eq!(
            *session.opener.opens.lock().unwrap(),
            vec!["/dev/ttyACM3".to_string()]
        );
    }

    #[tokio::test]
    async fn test_send_sms_confirms_through_rendezvous() {
        let (mut session, _log) = ussd_session(FakeDriver::new(true), vec![]);

        session.send_sms("halo", "+6281234").await.unwrap();

        assert_eq!(session.driver.submitted.len(), 1);
        assert_eq!(session.driver.submitted[0].number, "+6281234");
    }

    #[tokio::test]
    async fn test_send_long_sms_rearms_per_part() {
        let (mut session, _log) = ussd_session(FakeDriver::new(true), vec![]);

        let text = "x".repeat(LONG_SMS_PART_LEN * 2 + 10);
        session.send_long_sms(&text, "+6281234").await.unwrap();

        assert_eq!(session.driver.submitted.len(), 3);
        assert_eq!(
            session.driver.submitted[0].text.chars().count(),
            LONG_SMS_PART_LEN
        );
        assert_eq!(session.driver.submitted[2].text.chars().count(), 10);
    }

    #[tokio::test]
    async fn test_send_text_picks_multipart_for_long_text() {
        let (mut session, _log) = ussd_session(FakeDriver::new(true), vec![]);

        session
            .send_text(&"y".repeat(SINGLE_SMS_MAX + 1), "+6281234")
            .await
            .unwrap();

        assert!(session.driver.submitted.len() > 1);
    }

    #[tokio::test]
    async fn test_read_sms_drains_and_deletes() {
        let mut driver = FakeDriver::new(true);
        driver.inbox = vec![
            ReceivedSms {
                location: 1,
                folder: 1,
                number: "+62a".to_string(),
                text: "one".to_string(),
            },
            ReceivedSms {
                location: 2,
                folder: 1,
                number: "+62b".to_string(),
                text: "two".to_string(),
            },
        ];
        let (mut session, _log) = ussd_session(driver, vec![]);

        let messages = session.read_sms(true).await.unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(session.driver.deleted, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_wait_for_sms_enables_incoming_and_returns_message() {
        let mut driver = FakeDriver::new(true);
        driver.complete_on_pump = 2;
        driver.incoming_sms = Some(ReceivedSms {
            location: 5,
            folder: 1,
            number: "+628777".to_string(),
            text: "ping".to_string(),
        });
        let (mut session, _log) = ussd_session(driver, vec![]);

        let sms = session.wait_for_sms().await.unwrap();

        assert_eq!(sms.text, "ping");
        assert!(session.driver.incoming_enabled);
    }

    #[test]
    fn test_split_into_parts_boundaries() {
        assert!(split_into_parts("").is_empty());
        assert_eq!(split_into_parts("short"), vec!["short".to_string()]);
        let exact = "z".repeat(LONG_SMS_PART_LEN);
        assert_eq!(split_into_parts(&exact).len(), 1);
        let over = "z".repeat(LONG_SMS_PART_LEN + 1);
        assert_eq!(split_into_parts(&over).len(), 2);
    }
}
