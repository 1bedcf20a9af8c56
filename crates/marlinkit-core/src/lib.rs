//! # MarlinKit Core
//!
//! Core types, traits, and utilities for MarlinKit.
//! Provides the fundamental abstractions for machine geometry, modal state
//! tracking, session lifecycle, errors, and diagnostic listeners.

pub mod error;
pub mod event;
pub mod geometry;
pub mod state;
pub mod types;

pub use error::{CommandError, ConnectionError, Error, ProtocolError, Result};

pub use event::{ListenerHandle, ListenerSet, ProtocolListener};

pub use geometry::{
    check_axis, validate_absolute, validate_relative, AxisLimits, BoundsCheck, SoftLimits,
};

pub use state::{MachineState, SessionState, StateEffect};

pub use types::{ArcDirection, Axis, AxisSet, AxisValues, CoordinateMode, Plane, Position};
