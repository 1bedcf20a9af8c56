//! Transport session state machine
//!
//! One [`Session`] owns one transport and drives the strictly sequential
//! command/acknowledgment exchange: connect and settle, identify, then one
//! command in flight at a time. The tracked [`MachineState`] advances only
//! on acknowledgment, and every transmission ends with the disable-motors
//! sentinel line from the command table.

use crate::protocol::ack::{await_ack, is_ack, AckOutcome};
use crate::protocol::device_info::DeviceInfo;
use crate::protocol::encoder::Command;
use crate::transport::Transport;
use marlinkit_core::{
    Error, ListenerHandle, ListenerSet, MachineState, ProtocolError, ProtocolListener, Result,
    SessionState,
};
use marlinkit_settings::Config;
use std::sync::Arc;
use std::time::Instant;

const IDENTIFY_COMMAND: &str = "M115";

/// A live connection running the command/acknowledgment protocol
pub struct Session {
    transport: Box<dyn Transport>,
    config: Arc<Config>,
    /// Disable-motors text written after every transmission
    sentinel: String,
    machine: MachineState,
    state: SessionState,
    device_info: Option<DeviceInfo>,
    listeners: ListenerSet,
}

impl Session {
    /// Take ownership of an opened transport and wait out the boot settle
    ///
    /// Marlin resets when the serial line opens and ignores input while it
    /// boots, so nothing is written until the settle delay has passed. Boot
    /// chatter received during the delay is dropped. The session comes back
    /// in the identifying state; call [`Session::identify`] next.
    pub fn connect(transport: Box<dyn Transport>, config: Arc<Config>) -> Result<Self> {
        let machine = MachineState::new(config.motion.default_feed_rate);
        let sentinel = config.commands.disable_motors.clone();
        let mut session = Self {
            transport,
            config,
            sentinel,
            machine,
            state: SessionState::Connecting,
            device_info: None,
            listeners: ListenerSet::new(),
        };

        tracing::info!(
            "Connecting to {}; settling for {}ms",
            session.transport.name(),
            session.config.protocol.settle_delay_ms
        );
        let settle = session.config.protocol.settle_delay();
        if !settle.is_zero() {
            std::thread::sleep(settle);
        }
        session.transport.flush_input()?;
        session.set_state(SessionState::Identifying);
        Ok(session)
    }

    /// Request and read the device identification report
    ///
    /// Writes the identify command and accumulates response lines until the
    /// device goes quiet. Acknowledgment lines are absorbed here so they
    /// cannot leak into the first command's wait. Producing no report at
    /// all is fatal; the caller gets a session only a close is good for.
    pub fn identify(&mut self) -> Result<DeviceInfo> {
        if self.state != SessionState::Identifying {
            return Err(ProtocolError::NotReady { state: self.state }.into());
        }

        tracing::debug!("Requesting identification");
        if let Err(e) = self.transmit(&[IDENTIFY_COMMAND.to_string()]) {
            self.set_state(SessionState::Failed);
            return Err(e);
        }

        let timeout_ms = self.config.protocol.identify_timeout_ms;
        let deadline = Instant::now() + self.config.protocol.identify_timeout();
        let quiet = self.config.protocol.identify_quiet();
        let poll = self.config.protocol.poll_interval();
        let mut banner: Vec<String> = Vec::new();
        let mut last_rx: Option<Instant> = None;

        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            if let Some(rx) = last_rx {
                if now.duration_since(rx) >= quiet {
                    break;
                }
            }

            match self.transport.read_line() {
                Err(e) => {
                    self.set_state(SessionState::Failed);
                    return Err(e);
                }
                Ok(Some(bytes)) => {
                    let text = String::from_utf8_lossy(&bytes);
                    let line = text.trim();
                    last_rx = Some(Instant::now());
                    if line.is_empty() {
                        continue;
                    }
                    self.listeners.notify(|l| l.on_line_received(line));
                    // A machine name can contain the token; report markers win
                    let is_report = line.contains("FIRMWARE_NAME:") || line.starts_with("Cap:");
                    if !is_report && is_ack(line) {
                        continue;
                    }
                    banner.push(line.to_string());
                }
                Ok(None) => std::thread::sleep(poll.min(deadline - now)),
            }
        }

        if banner.is_empty() {
            self.set_state(SessionState::Failed);
            return Err(ProtocolError::IdentificationTimeout { timeout_ms }.into());
        }

        let info = DeviceInfo::parse(&banner.join("\n"));
        tracing::info!("Identified device: {}", info);
        self.device_info = Some(info.clone());
        self.set_state(SessionState::Ready);
        Ok(info)
    }

    /// Transmit one command and wait for its acknowledgment
    ///
    /// The command's lines are written in order followed by the sentinel.
    /// On acknowledgment the command's state effect is applied and the
    /// session returns to ready. A missing acknowledgment leaves the
    /// session ready as well; only transport failures mark it failed.
    pub fn execute(&mut self, command: Command) -> Result<()> {
        if self.state != SessionState::Ready {
            return Err(ProtocolError::NotReady { state: self.state }.into());
        }

        self.set_state(SessionState::Sending);
        if let Err(e) = self.transmit(command.lines()) {
            self.set_state(SessionState::Failed);
            return Err(e);
        }

        if command.expects_ack() {
            self.set_state(SessionState::AwaitingAck);
            if let Err(e) = self.wait_for_ack(&command) {
                match &e {
                    Error::Protocol(ProtocolError::AckTimeout { .. }) => {
                        self.set_state(SessionState::Ready)
                    }
                    _ => self.set_state(SessionState::Failed),
                }
                return Err(e);
            }
        }

        self.machine.apply(command.effect());

        let pause = self.config.protocol.inter_command_delay();
        if !pause.is_zero() {
            std::thread::sleep(pause);
        }
        self.set_state(SessionState::Ready);
        Ok(())
    }

    /// Close the session and release the transport
    pub fn close(&mut self) -> Result<()> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        let result = self.transport.close();
        self.set_state(SessionState::Closed);
        result
    }

    pub fn session_state(&self) -> SessionState {
        self.state
    }

    pub fn machine_state(&self) -> &MachineState {
        &self.machine
    }

    pub fn device_info(&self) -> Option<&DeviceInfo> {
        self.device_info.as_ref()
    }

    pub fn register_listener(&self, listener: Arc<dyn ProtocolListener>) -> ListenerHandle {
        self.listeners.register(listener)
    }

    pub fn unregister_listener(&self, handle: &ListenerHandle) -> bool {
        self.listeners.unregister(handle)
    }

    /// Surface a degraded-but-continuing condition
    pub(crate) fn advise(&self, message: &str) {
        tracing::warn!("{}", message);
        self.listeners.notify(|l| l.on_advisory(message));
    }

    fn wait_for_ack(&mut self, command: &Command) -> Result<()> {
        let timeout_ms = self.config.protocol.ack_timeout_ms;
        let deadline = Instant::now() + self.config.protocol.ack_timeout();
        let poll = self.config.protocol.poll_interval();
        let max_noise = self.config.protocol.max_unrecognized_lines;
        let mut noise = 0u32;

        loop {
            match await_ack(self.transport.as_mut(), deadline, poll)? {
                AckOutcome::Acknowledged(line) => {
                    tracing::trace!("Acknowledged: {}", line);
                    self.listeners.notify(|l| l.on_line_received(&line));
                    return Ok(());
                }
                AckOutcome::Unrecognized(line) => {
                    noise += 1;
                    tracing::warn!("Discarding unrecognized response: {}", line);
                    self.listeners.notify(|l| l.on_line_received(&line));
                    self.listeners.notify(|l| l.on_noise_discarded(&line));
                    if noise > max_noise {
                        tracing::warn!("Noise bound exceeded after {} lines", noise);
                        return Err(ProtocolError::AckTimeout {
                            command: command.to_string(),
                            timeout_ms,
                        }
                        .into());
                    }
                }
                AckOutcome::TimedOut => {
                    return Err(ProtocolError::AckTimeout {
                        command: command.to_string(),
                        timeout_ms,
                    }
                    .into());
                }
            }
        }
    }

    /// Write command lines followed by the sentinel
    fn transmit(&mut self, lines: &[String]) -> Result<()> {
        for line in lines {
            self.send_line(line)?;
        }
        let sentinel = self.sentinel.clone();
        self.send_line(&sentinel)
    }

    fn send_line(&mut self, line: &str) -> Result<()> {
        tracing::trace!("Sending line: {}", line);
        let data = format!("{}\n", line);
        self.transport.write(data.as_bytes())?;
        self.listeners.notify(|l| l.on_command_sent(line));
        Ok(())
    }

    fn set_state(&mut self, to: SessionState) {
        if self.state == to {
            return;
        }
        let from = self.state;
        self.state = to;
        tracing::debug!("Session state: {} -> {}", from, to);
        self.listeners.notify(|l| l.on_state_changed(from, to));
    }
}
