//! Soft limits and motion geometry validation
//!
//! Every motion request is checked against per-axis travel limits before any
//! bytes are written. Absolute targets are checked directly; relative deltas
//! are checked against the destination they imply, when the current position
//! is known at all.

use crate::error::CommandError;
use crate::types::{Axis, AxisValues, Position};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Travel limits for one axis
///
/// A coordinate `v` is inside the limits when `min <= v < max`. The upper
/// bound is exclusive so that a bed of size 220 rejects a move to exactly
/// 220.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisLimits {
    /// Lowest reachable coordinate (inclusive)
    pub min: f64,
    /// Lowest unreachable coordinate (exclusive upper bound)
    pub max: f64,
}

impl AxisLimits {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Limits from the origin up to `max`
    pub fn up_to(max: f64) -> Self {
        Self { min: 0.0, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value < self.max
    }

    /// True when the limits describe a non-empty range
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.max > self.min
    }
}

impl Default for AxisLimits {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 200.0,
        }
    }
}

/// Per-axis travel limits for the whole machine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoftLimits {
    pub x: AxisLimits,
    pub y: AxisLimits,
    pub z: AxisLimits,
}

impl SoftLimits {
    pub fn get(&self, axis: Axis) -> AxisLimits {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    pub fn is_valid(&self) -> bool {
        Axis::ALL.iter().all(|a| self.get(*a).is_valid())
    }
}

impl Default for SoftLimits {
    fn default() -> Self {
        Self {
            x: AxisLimits::up_to(220.0),
            y: AxisLimits::up_to(220.0),
            z: AxisLimits::up_to(250.0),
        }
    }
}

/// Outcome of a bounds check that could not always be performed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsCheck {
    /// The destination was computed and lies inside the limits
    Verified,
    /// No current position was known, so the destination was not checked
    Unverified,
}

impl fmt::Display for BoundsCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundsCheck::Verified => write!(f, "verified"),
            BoundsCheck::Unverified => write!(f, "unverified"),
        }
    }
}

/// Check a single coordinate against one axis' limits
pub fn check_axis(axis: Axis, value: f64, limits: &AxisLimits) -> Result<(), CommandError> {
    if !value.is_finite() {
        return Err(CommandError::NonFiniteValue { axis });
    }
    if value < limits.min {
        return Err(CommandError::OutOfBounds {
            axis,
            value,
            limit: limits.min,
        });
    }
    if value >= limits.max {
        return Err(CommandError::OutOfBounds {
            axis,
            value,
            limit: limits.max,
        });
    }
    Ok(())
}

/// Validate an absolute target against the soft limits
///
/// Only assigned axes are checked. Arc endpoints use this as well; only the
/// explicit endpoint is validated, not the swept path.
pub fn validate_absolute(target: &AxisValues, limits: &SoftLimits) -> Result<(), CommandError> {
    for (axis, value) in target.iter() {
        check_axis(axis, value, &limits.get(axis))?;
    }
    Ok(())
}

/// Validate a relative delta against the soft limits
///
/// When the current position is known the implied destination of each
/// assigned axis is checked and a violation is an error. When it is unknown
/// the move is allowed and flagged [`BoundsCheck::Unverified`] so callers can
/// surface an advisory.
pub fn validate_relative(
    delta: &AxisValues,
    from: Option<Position>,
    limits: &SoftLimits,
) -> Result<BoundsCheck, CommandError> {
    let Some(position) = from else {
        for (axis, value) in delta.iter() {
            if !value.is_finite() {
                return Err(CommandError::NonFiniteValue { axis });
            }
        }
        return Ok(BoundsCheck::Unverified);
    };

    for (axis, d) in delta.iter() {
        let destination = position.get(axis) + d;
        check_axis(axis, destination, &limits.get(axis))?;
    }
    Ok(BoundsCheck::Verified)
}
