//! Serial port transport implementation
//!
//! Wraps a real serial port behind the [`Transport`] trait. Reads go through
//! a small internal buffer so that partial lines survive between polls, and
//! the port's own read timeout keeps individual reads short.

use super::Transport;
use marlinkit_core::{ConnectionError, Result};
use std::io::{self, Read, Write};
use std::time::Duration;

/// Transport over a physical serial port
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
    name: String,
    pending: Vec<u8>,
}

impl SerialTransport {
    /// Open a serial port in 8N1 configuration
    ///
    /// `timeout` bounds a single blocking read on the port; the protocol
    /// timeouts are layered on top by the session.
    pub fn open(port_name: &str, baud_rate: u32, timeout: Duration) -> Result<Self> {
        let builder = serialport::new(port_name, baud_rate)
            .timeout(timeout)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None);

        match builder.open() {
            Ok(port) => {
                tracing::info!("Opened {} at {} baud", port_name, baud_rate);
                Ok(Self {
                    port,
                    name: port_name.to_string(),
                    pending: Vec::new(),
                })
            }
            Err(e) => {
                tracing::warn!("Failed to open serial port {}: {}", port_name, e);
                Err(ConnectionError::FailedToOpen {
                    port: port_name.to_string(),
                    reason: e.to_string(),
                }
                .into())
            }
        }
    }

    /// Extract one buffered line if a terminator has arrived
    fn take_buffered_line(&mut self) -> Option<Vec<u8>> {
        let pos = self.pending.iter().position(|b| *b == b'\n')?;
        let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
        line.pop();
        Some(line)
    }
}

impl Transport for SerialTransport {
    fn read_line(&mut self) -> Result<Option<Vec<u8>>> {
        if let Some(line) = self.take_buffered_line() {
            return Ok(Some(line));
        }

        let mut chunk = [0u8; 256];
        match self.port.read(&mut chunk) {
            Ok(0) => Ok(None),
            Ok(n) => {
                self.pending.extend_from_slice(&chunk[..n]);
                Ok(self.take_buffered_line())
            }
            // The port timeout expiring just means no data yet
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(None)
            }
            Err(e) => Err(ConnectionError::ReadFailed {
                port: self.name.clone(),
                reason: e.to_string(),
            }
            .into()),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        let failed = |e: &io::Error| ConnectionError::WriteFailed {
            port: self.name.clone(),
            reason: e.to_string(),
        };
        self.port.write_all(data).map_err(|e| failed(&e))?;
        self.port.flush().map_err(|e| failed(&e))?;
        Ok(())
    }

    fn flush_input(&mut self) -> Result<()> {
        self.pending.clear();
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(|e| ConnectionError::ReadFailed {
                port: self.name.clone(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        // Dropping the handle closes the descriptor; nothing else to do
        tracing::debug!("Closing {}", self.name);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
