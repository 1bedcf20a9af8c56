#![allow(dead_code)]

//! Scripted transport shared by the protocol integration tests

use marlinkit_communication::{Printer, Session, Transport};
use marlinkit_core::{ConnectionError, ProtocolListener, Result, SessionState};
use marlinkit_settings::Config;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub const BANNER: &str = "FIRMWARE_NAME:Marlin 2.1.2 (Jun 10 2023 12:00:00) \
     SOURCE_CODE_URL:github.com/MarlinFirmware/Marlin PROTOCOL_VERSION:1.0 \
     MACHINE_TYPE:Ender-3 EXTRUDER_COUNT:1 UUID:cede2a2f-41a2-4748-9b12-c55c62f367ff";

/// One step of a scripted device
enum ScriptItem {
    /// A complete response line
    Line(String),
    /// No data for this long, measured from the first read that hits it
    Silence { ms: u64, started: Option<Instant> },
}

/// In-memory transport that replays a fixed response script
///
/// Responses are consumed in order. `Silence` entries read as "no data yet"
/// until their wall-clock duration has passed, which separates response
/// bursts in time; an exhausted script reads as silence forever. Written
/// lines are logged with their terminators stripped.
pub struct MockTransport {
    script: VecDeque<ScriptItem>,
    sent: Arc<Mutex<Vec<String>>>,
    fail_writes_after: Option<u32>,
    writes_done: u32,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
            sent: Arc::new(Mutex::new(Vec::new())),
            fail_writes_after: None,
            writes_done: 0,
        }
    }

    pub fn respond(mut self, line: &str) -> Self {
        self.script.push_back(ScriptItem::Line(line.to_string()));
        self
    }

    pub fn silence(mut self, ms: u64) -> Self {
        self.script.push_back(ScriptItem::Silence { ms, started: None });
        self
    }

    /// Let `count` writes succeed, then fail every one after
    pub fn fail_writes_after(mut self, count: u32) -> Self {
        self.fail_writes_after = Some(count);
        self
    }

    pub fn sent_log(&self) -> Arc<Mutex<Vec<String>>> {
        self.sent.clone()
    }
}

impl Transport for MockTransport {
    fn read_line(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            match self.script.front_mut() {
                None => return Ok(None),
                Some(ScriptItem::Silence { ms, started }) => {
                    let now = Instant::now();
                    let begun = *started.get_or_insert(now);
                    if now.duration_since(begun) < Duration::from_millis(*ms) {
                        return Ok(None);
                    }
                    self.script.pop_front();
                }
                Some(ScriptItem::Line(_)) => match self.script.pop_front() {
                    Some(ScriptItem::Line(line)) => return Ok(Some(line.into_bytes())),
                    _ => unreachable!(),
                },
            }
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        if let Some(limit) = self.fail_writes_after {
            if self.writes_done >= limit {
                return Err(ConnectionError::WriteFailed {
                    port: "mock".to_string(),
                    reason: "scripted failure".to_string(),
                }
                .into());
            }
        }
        self.writes_done += 1;
        let text = String::from_utf8_lossy(data);
        self.sent
            .lock()
            .unwrap()
            .push(text.trim_end_matches('\n').to_string());
        Ok(())
    }

    fn flush_input(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Timing scaled down so the timeout paths run in milliseconds
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.protocol.settle_delay_ms = 0;
    config.protocol.poll_interval_ms = 1;
    config.protocol.ack_timeout_ms = 100;
    config.protocol.identify_timeout_ms = 60;
    config.protocol.identify_quiet_ms = 5;
    config.protocol.inter_command_delay_ms = 0;
    config
}

/// Script for a device that identifies itself and acknowledges the request
///
/// The trailing silence lets the identification quiet gap elapse before any
/// further scripted responses become visible.
pub fn identified_script() -> MockTransport {
    MockTransport::new()
        .respond(BANNER)
        .respond("ok")
        .respond("ok")
        .silence(40)
}

/// Script covering the full connect handshake of [`Printer`]
pub fn connected_script() -> MockTransport {
    identified_script().respond("ok").respond("ok")
}

/// Session that has connected and identified; the sent log starts empty
pub fn ready_session(transport: MockTransport) -> (Session, Arc<Mutex<Vec<String>>>) {
    ready_session_with(transport, test_config())
}

pub fn ready_session_with(
    transport: MockTransport,
    config: Config,
) -> (Session, Arc<Mutex<Vec<String>>>) {
    let sent = transport.sent_log();
    let mut session = Session::connect(Box::new(transport), Arc::new(config)).unwrap();
    session.identify().unwrap();
    sent.lock().unwrap().clear();
    (session, sent)
}

/// Printer that has run the connect handshake; the sent log starts empty
pub fn connect_printer(transport: MockTransport) -> (Printer, Arc<Mutex<Vec<String>>>) {
    connect_printer_with(transport, test_config())
}

pub fn connect_printer_with(
    transport: MockTransport,
    config: Config,
) -> (Printer, Arc<Mutex<Vec<String>>>) {
    let sent = transport.sent_log();
    let printer = Printer::with_transport(Box::new(transport), config).unwrap();
    sent.lock().unwrap().clear();
    (printer, sent)
}

/// Listener that records every callback for later assertions
#[derive(Default)]
pub struct RecordingListener {
    pub state_changes: Mutex<Vec<(SessionState, SessionState)>>,
    pub sent: Mutex<Vec<String>>,
    pub received: Mutex<Vec<String>>,
    pub noise: Mutex<Vec<String>>,
    pub advisories: Mutex<Vec<String>>,
}

impl ProtocolListener for RecordingListener {
    fn on_state_changed(&self, from: SessionState, to: SessionState) {
        self.state_changes.lock().unwrap().push((from, to));
    }

    fn on_command_sent(&self, line: &str) {
        self.sent.lock().unwrap().push(line.to_string());
    }

    fn on_line_received(&self, line: &str) {
        self.received.lock().unwrap().push(line.to_string());
    }

    fn on_noise_discarded(&self, line: &str) {
        self.noise.lock().unwrap().push(line.to_string());
    }

    fn on_advisory(&self, message: &str) {
        self.advisories.lock().unwrap().push(message.to_string());
    }
}
