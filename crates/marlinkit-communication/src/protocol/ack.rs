//! Acknowledgment reading
//!
//! Marlin confirms each command with a free-text line containing `ok`. The
//! reader polls the transport for complete lines, classifies each one, and
//! reports exactly one outcome per call. Retry and noise-tolerance policy
//! belongs to the session, not here.

use crate::transport::Transport;
use marlinkit_core::Result;
use std::time::{Duration, Instant};

/// The literal acknowledgment token
///
/// Matching is by substring: firmware builds prefix or suffix the token with
/// temperature reports, echo text, and similar chatter.
pub const ACK_TOKEN: &str = "ok";

/// Outcome of one acknowledgment wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckOutcome {
    /// A line containing the token arrived; the line is carried for
    /// diagnostics
    Acknowledged(String),
    /// A complete line arrived that does not contain the token
    Unrecognized(String),
    /// The deadline passed without a classifiable line
    TimedOut,
}

/// Test whether a line acknowledges a command
pub fn is_ack(line: &str) -> bool {
    line.contains(ACK_TOKEN)
}

/// Wait for the next classifiable response line
///
/// Returns the first non-blank line as [`AckOutcome::Acknowledged`] or
/// [`AckOutcome::Unrecognized`], or [`AckOutcome::TimedOut`] once `deadline`
/// passes. Blank lines are skipped without producing an outcome. Transport
/// failures propagate as errors.
pub fn await_ack(
    transport: &mut dyn Transport,
    deadline: Instant,
    poll_interval: Duration,
) -> Result<AckOutcome> {
    loop {
        let now = Instant::now();
        if now >= deadline {
            return Ok(AckOutcome::TimedOut);
        }

        match transport.read_line()? {
            Some(bytes) => {
                let text = String::from_utf8_lossy(&bytes);
                let line = text.trim();
                if line.is_empty() {
                    continue;
                }
                if is_ack(line) {
                    return Ok(AckOutcome::Acknowledged(line.to_string()));
                }
                return Ok(AckOutcome::Unrecognized(line.to_string()));
            }
            None => {
                std::thread::sleep(poll_interval.min(deadline - now));
            }
        }
    }
}
