//! Machine and session state tracking
//!
//! The engine mirrors the device's modal configuration locally so that
//! relative moves can be bounds-checked and callers can ask "where does the
//! machine believe it is" without a wire round trip. State only advances
//! when a command has been acknowledged, so the mirror never runs ahead of
//! the device.

use crate::types::{AxisSet, AxisValues, CoordinateMode, Plane, Position};
use std::fmt;

/// Lifecycle state of a transport session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No transport attached
    Disconnected,
    /// Transport opened, settle delay in progress
    Connecting,
    /// Waiting for the identification report
    Identifying,
    /// Idle and able to accept a command
    Ready,
    /// Command bytes going out
    Sending,
    /// Waiting for the acknowledgment line
    AwaitingAck,
    /// Unrecoverable transport or handshake failure
    Failed,
    /// Closed by the caller
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Identifying => "identifying",
            SessionState::Ready => "ready",
            SessionState::Sending => "sending",
            SessionState::AwaitingAck => "awaiting-ack",
            SessionState::Failed => "failed",
            SessionState::Closed => "closed",
        };
        write!(f, "{}", name)
    }
}

/// The state transition an acknowledged command implies
///
/// Every encoded command carries one of these. The session applies it to the
/// tracked [`MachineState`] after the device acknowledges, never before.
#[derive(Debug, Clone, PartialEq)]
pub enum StateEffect {
    /// No tracked state changes
    None,
    /// Coordinate mode switches
    SetMode(CoordinateMode),
    /// Arc plane switches
    SetPlane(Plane),
    /// Modal feed rate changes
    SetFeedRate(f64),
    /// A single-line linear or arc move, interpreted under `mode`
    Move {
        target: AxisValues,
        feed: Option<f64>,
        mode: CoordinateMode,
    },
    /// A bracketed relative move; restores absolute mode when done
    RelativeMove {
        delta: AxisValues,
        feed: Option<f64>,
    },
    /// A homing cycle over the given axes (empty means all)
    Homed(AxisSet),
}

/// Locally tracked mirror of the device's modal configuration
#[derive(Debug, Clone, PartialEq)]
pub struct MachineState {
    /// Current coordinate interpretation mode
    pub coordinate_mode: CoordinateMode,
    /// Current arc interpolation plane
    pub active_plane: Plane,
    /// Modal feed rate in units/min
    pub feed_rate: f64,
    /// Position implied by acknowledged commands, when derivable
    pub last_known_position: Option<Position>,
    /// Whether a full homing cycle has been acknowledged
    pub homed: bool,
}

impl MachineState {
    /// Fresh state with the configured default feed rate
    ///
    /// The position starts unknown. Marlin does not report where the
    /// carriage physically is after a reset, so nothing is assumed until
    /// a home or a fully specified absolute move establishes it.
    pub fn new(default_feed_rate: f64) -> Self {
        Self {
            coordinate_mode: CoordinateMode::Absolute,
            active_plane: Plane::Xy,
            feed_rate: default_feed_rate,
            last_known_position: None,
            homed: false,
        }
    }

    /// Apply the effect of an acknowledged command
    pub fn apply(&mut self, effect: &StateEffect) {
        match effect {
            StateEffect::None => {}
            StateEffect::SetMode(mode) => self.coordinate_mode = *mode,
            StateEffect::SetPlane(plane) => self.active_plane = *plane,
            StateEffect::SetFeedRate(rate) => self.feed_rate = *rate,
            StateEffect::Move { target, feed, mode } => {
                if let Some(rate) = feed {
                    self.feed_rate = *rate;
                }
                match mode {
                    CoordinateMode::Absolute => self.absorb_absolute(target),
                    CoordinateMode::Relative => self.shift_position(target),
                }
            }
            StateEffect::RelativeMove { delta, feed } => {
                if let Some(rate) = feed {
                    self.feed_rate = *rate;
                }
                self.shift_position(delta);
                self.coordinate_mode = CoordinateMode::Absolute;
            }
            StateEffect::Homed(axes) => {
                if axes.is_empty() || axes.is_all() {
                    self.homed = true;
                    self.last_known_position = Some(Position::origin());
                } else if let Some(pos) = &mut self.last_known_position {
                    for axis in axes.iter() {
                        pos.set(axis, 0.0);
                    }
                }
            }
        }
    }

    fn absorb_absolute(&mut self, target: &AxisValues) {
        match &mut self.last_known_position {
            Some(pos) => *pos = pos.with_values(target),
            None => {
                // A fully specified target pins the position for the first time
                if let (Some(x), Some(y), Some(z)) = (target.x, target.y, target.z) {
                    self.last_known_position = Some(Position::new(x, y, z));
                }
            }
        }
    }

    fn shift_position(&mut self, delta: &AxisValues) {
        if let Some(pos) = &mut self.last_known_position {
            *pos = pos.offset_by(delta);
        }
    }
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | plane {} | F{}",
            self.coordinate_mode, self.active_plane, self.feed_rate
        )?;
        match self.last_known_position {
            Some(pos) => write!(f, " | {}", pos)?,
            None => write!(f, " | position unknown")?,
        }
        if self.homed {
            write!(f, " | homed")?;
        }
        Ok(())
    }
}
