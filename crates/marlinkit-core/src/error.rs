//! Error handling for MarlinKit
//!
//! Provides structured error types for all layers of the engine:
//! - Connection errors (port enumeration, open, raw I/O)
//! - Command errors (geometry validation, malformed requests)
//! - Protocol errors (handshake and acknowledgment failures)
//!
//! All error types use `thiserror` for ergonomic error handling.

use crate::state::SessionState;
use crate::types::{Axis, Position};
use thiserror::Error;

/// Connection error type
///
/// Represents errors raised by the serial transport layer, from port
/// discovery through raw reads and writes.
#[derive(Error, Debug, Clone)]
pub enum ConnectionError {
    /// The serial port could not be opened
    #[error("Failed to open port {port}: {reason}")]
    FailedToOpen {
        /// The device path that was attempted.
        port: String,
        /// The reason reported by the serial layer.
        reason: String,
    },

    /// No port was configured and none could be detected
    #[error("No serial port configured and none detected")]
    NoPortAvailable,

    /// Port enumeration failed
    #[error("Failed to enumerate serial ports: {reason}")]
    EnumerationFailed {
        /// The reason reported by the serial layer.
        reason: String,
    },

    /// A read from the port failed
    #[error("Read from {port} failed: {reason}")]
    ReadFailed {
        /// The device path of the port.
        port: String,
        /// The reason reported by the serial layer.
        reason: String,
    },

    /// A write to the port failed
    #[error("Write to {port} failed: {reason}")]
    WriteFailed {
        /// The device path of the port.
        port: String,
        /// The reason reported by the serial layer.
        reason: String,
    },
}

/// Command error type
///
/// Represents errors detected before any bytes are written: geometry
/// violations, unparsable axis or mode requests, and malformed motion
/// parameters. These never change device or session state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    /// A target or destination coordinate violates a soft limit
    #[error("Axis {axis} target {value} violates soft limit {limit}")]
    OutOfBounds {
        /// The axis whose bound was violated.
        axis: Axis,
        /// The offending target value.
        value: f64,
        /// The limit (min or max) that was violated.
        limit: f64,
    },

    /// A coordinate is NaN or infinite
    #[error("Axis {axis} target is not a finite number")]
    NonFiniteValue {
        /// The axis carrying the non-finite value.
        axis: Axis,
    },

    /// An axis character outside X/Y/Z was requested
    #[error("Invalid axis character '{0}'")]
    InvalidAxis(char),

    /// A coordinate mode string could not be parsed
    #[error("Invalid coordinate mode '{0}' (expected \"abs\" or \"rel\")")]
    InvalidMode(String),

    /// A plane string could not be parsed
    #[error("Invalid plane '{0}' (expected \"xy\", \"zx\" or \"yz\")")]
    InvalidPlane(String),

    /// A feed rate was zero or negative
    #[error("Feed rate must be positive, got {0}")]
    InvalidFeedRate(f64),

    /// An arc radius was zero or non-finite
    #[error("Arc radius must be finite and nonzero, got {0}")]
    InvalidRadius(f64),

    /// A motion command named no axes at all
    #[error("Motion command names no axes")]
    EmptyMove,
}

/// Protocol error type
///
/// Represents failures of the command/acknowledgment exchange itself:
/// handshake timeouts, missing acknowledgments, and composite operations
/// interrupted partway through.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The device never identified itself after connect
    #[error("No identification response within {timeout_ms}ms")]
    IdentificationTimeout {
        /// The timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// No acknowledgment arrived for a command
    #[error("No acknowledgment for '{command}' within {timeout_ms}ms")]
    AckTimeout {
        /// The wire text of the unacknowledged command.
        command: String,
        /// The timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// An operation was attempted in the wrong session state
    #[error("Session is {state}, expected ready")]
    NotReady {
        /// The session state at the time of the attempt.
        state: SessionState,
    },

    /// A multi-move operation failed after at least one move completed
    #[error("{operation} aborted at the '{step}' step")]
    PartialComposite {
        /// The composite operation that was interrupted.
        operation: &'static str,
        /// The sub-step that failed.
        step: &'static str,
        /// The best-known machine position after the completed steps.
        position: Option<Position>,
        /// The error raised by the failing sub-step.
        #[source]
        source: Box<Error>,
    },
}

/// Unified error type for MarlinKit
///
/// Aggregates all domain-specific errors into one type for use in
/// public APIs and across crate boundaries.
#[derive(Error, Debug)]
pub enum Error {
    /// Connection-related error
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Command validation error
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Protocol exchange error
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl Error {
    /// Check if this error is a timeout of any kind
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::Protocol(
                ProtocolError::AckTimeout { .. } | ProtocolError::IdentificationTimeout { .. }
            )
        )
    }

    /// Check if the session remains usable after this error
    ///
    /// Command validation failures reject the request before any bytes move,
    /// and a missing acknowledgment leaves the session ready for a retry.
    /// Connection and identification failures do not.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Command(_) => true,
            Error::Protocol(ProtocolError::AckTimeout { .. }) => true,
            Error::Protocol(ProtocolError::PartialComposite { source, .. }) => {
                source.is_recoverable()
            }
            _ => false,
        }
    }
}

/// Result type alias using the unified error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_error_display() {
        let err = CommandError::OutOfBounds {
            axis: Axis::X,
            value: 250.0,
            limit: 220.0,
        };
        assert_eq!(err.to_string(), "Axis X target 250 violates soft limit 220");

        let err = CommandError::InvalidAxis('w');
        assert_eq!(err.to_string(), "Invalid axis character 'w'");

        let err = CommandError::InvalidMode("sideways".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid coordinate mode 'sideways' (expected \"abs\" or \"rel\")"
        );
    }

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::AckTimeout {
            command: "G28 X Y Z".to_string(),
            timeout_ms: 30000,
        };
        assert_eq!(
            err.to_string(),
            "No acknowledgment for 'G28 X Y Z' within 30000ms"
        );

        let err = ProtocolError::NotReady {
            state: SessionState::Closed,
        };
        assert_eq!(err.to_string(), "Session is closed, expected ready");
    }

    #[test]
    fn test_timeout_predicate() {
        let err: Error = ProtocolError::AckTimeout {
            command: "G0 X10".to_string(),
            timeout_ms: 1000,
        }
        .into();
        assert!(err.is_timeout());
        assert!(err.is_recoverable());

        let err: Error = ProtocolError::IdentificationTimeout { timeout_ms: 10000 }.into();
        assert!(err.is_timeout());
        assert!(!err.is_recoverable());

        let err: Error = ConnectionError::NoPortAvailable.into();
        assert!(!err.is_timeout());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_partial_composite_carries_source() {
        let inner: Error = ProtocolError::AckTimeout {
            command: "G91".to_string(),
            timeout_ms: 500,
        }
        .into();
        let err = ProtocolError::PartialComposite {
            operation: "hop",
            step: "move",
            position: Some(Position {
                x: 0.0,
                y: 0.0,
                z: 50.0,
            }),
            source: Box::new(inner),
        };
        assert_eq!(err.to_string(), "hop aborted at the 'move' step");
        let err: Error = err.into();
        assert!(err.is_recoverable());
    }
}
