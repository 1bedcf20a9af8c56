//! Fundamental value types for the MarlinKit engine
//!
//! Axes, axis sets and sparse axis/value triplets, machine positions, and
//! the modal enums (coordinate mode, arc plane, arc direction) shared by
//! every layer.

use crate::error::CommandError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A linear machine axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// All axes in canonical X, Y, Z order
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// The wire letter for this axis
    pub fn letter(&self) -> char {
        match self {
            Axis::X => 'X',
            Axis::Y => 'Y',
            Axis::Z => 'Z',
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl TryFrom<char> for Axis {
    type Error = CommandError;

    fn try_from(c: char) -> Result<Self, CommandError> {
        match c.to_ascii_uppercase() {
            'X' => Ok(Axis::X),
            'Y' => Ok(Axis::Y),
            'Z' => Ok(Axis::Z),
            _ => Err(CommandError::InvalidAxis(c)),
        }
    }
}

/// An unordered selection of axes
///
/// Parsing accepts letters in any order and collapses duplicates; iteration
/// always yields canonical X, Y, Z order, so `"ZXY"` and `"XYZ"` produce the
/// same wire text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AxisSet {
    members: [bool; 3],
}

impl AxisSet {
    /// Empty selection
    pub fn new() -> Self {
        Self::default()
    }

    /// Selection containing all three axes
    pub fn all() -> Self {
        Self {
            members: [true; 3],
        }
    }

    /// Add an axis to the selection
    pub fn insert(&mut self, axis: Axis) {
        self.members[axis as usize] = true;
    }

    /// Check membership
    pub fn contains(&self, axis: Axis) -> bool {
        self.members[axis as usize]
    }

    pub fn is_empty(&self) -> bool {
        self.members.iter().all(|m| !m)
    }

    pub fn is_all(&self) -> bool {
        self.members.iter().all(|m| *m)
    }

    /// Number of selected axes
    pub fn len(&self) -> usize {
        self.members.iter().filter(|m| **m).count()
    }

    /// Iterate selected axes in canonical order
    pub fn iter(&self) -> impl Iterator<Item = Axis> + '_ {
        Axis::ALL.into_iter().filter(|a| self.contains(*a))
    }
}

impl FromIterator<Axis> for AxisSet {
    fn from_iter<I: IntoIterator<Item = Axis>>(iter: I) -> Self {
        let mut set = AxisSet::new();
        for axis in iter {
            set.insert(axis);
        }
        set
    }
}

impl FromStr for AxisSet {
    type Err = CommandError;

    /// Parse an axis list such as `"XYZ"`, `"zx"` or `"X Y"`
    ///
    /// Whitespace and commas are ignored. Any other non-axis character is
    /// rejected.
    fn from_str(s: &str) -> Result<Self, CommandError> {
        let mut set = AxisSet::new();
        for c in s.chars() {
            if c.is_whitespace() || c == ',' {
                continue;
            }
            set.insert(Axis::try_from(c)?);
        }
        Ok(set)
    }
}

impl fmt::Display for AxisSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for axis in self.iter() {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{}", axis)?;
            first = false;
        }
        Ok(())
    }
}

/// A sparse axis/value assignment
///
/// Carries an optional value per axis. Used both for absolute targets and
/// for relative deltas; which one is a property of the command it rides in.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisValues {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
}

impl AxisValues {
    pub fn new(x: Option<f64>, y: Option<f64>, z: Option<f64>) -> Self {
        Self { x, y, z }
    }

    pub fn x(value: f64) -> Self {
        Self {
            x: Some(value),
            ..Default::default()
        }
    }

    pub fn y(value: f64) -> Self {
        Self {
            y: Some(value),
            ..Default::default()
        }
    }

    pub fn z(value: f64) -> Self {
        Self {
            z: Some(value),
            ..Default::default()
        }
    }

    pub fn xy(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            z: None,
        }
    }

    pub fn xz(x: f64, z: f64) -> Self {
        Self {
            x: Some(x),
            y: None,
            z: Some(z),
        }
    }

    pub fn yz(y: f64, z: f64) -> Self {
        Self {
            x: None,
            y: Some(y),
            z: Some(z),
        }
    }

    pub fn xyz(x: f64, y: f64, z: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            z: Some(z),
        }
    }

    /// Assignment of a single named axis
    pub fn single(axis: Axis, value: f64) -> Self {
        let mut values = Self::default();
        values.set(axis, value);
        values
    }

    pub fn get(&self, axis: Axis) -> Option<f64> {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    pub fn set(&mut self, axis: Axis, value: f64) {
        match axis {
            Axis::X => self.x = Some(value),
            Axis::Y => self.y = Some(value),
            Axis::Z => self.z = Some(value),
        }
    }

    /// True when no axis carries a value
    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.z.is_none()
    }

    /// Iterate assigned axes in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (Axis, f64)> + '_ {
        Axis::ALL
            .into_iter()
            .filter_map(|a| self.get(a).map(|v| (a, v)))
    }
}

/// An absolute machine position in work units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The machine origin
    pub fn origin() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    pub fn set(&mut self, axis: Axis, value: f64) {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => self.z = value,
        }
    }

    /// This position shifted by a sparse delta
    pub fn offset_by(&self, delta: &AxisValues) -> Self {
        let mut out = *self;
        for (axis, d) in delta.iter() {
            out.set(axis, out.get(axis) + d);
        }
        out
    }

    /// This position with the assigned components replaced
    pub fn with_values(&self, target: &AxisValues) -> Self {
        let mut out = *self;
        for (axis, v) in target.iter() {
            out.set(axis, v);
        }
        out
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "X:{:.3} Y:{:.3} Z:{:.3}", self.x, self.y, self.z)
    }
}

/// Coordinate interpretation mode
///
/// Absolute positioning interprets axis words as workspace coordinates,
/// relative positioning as offsets from the current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateMode {
    #[default]
    Absolute,
    Relative,
}

impl fmt::Display for CoordinateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordinateMode::Absolute => write!(f, "absolute"),
            CoordinateMode::Relative => write!(f, "relative"),
        }
    }
}

impl FromStr for CoordinateMode {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, CommandError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abs" | "absolute" => Ok(CoordinateMode::Absolute),
            "rel" | "relative" => Ok(CoordinateMode::Relative),
            _ => Err(CommandError::InvalidMode(s.to_string())),
        }
    }
}

/// Arc interpolation plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Plane {
    #[default]
    Xy,
    Zx,
    Yz,
}

impl fmt::Display for Plane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plane::Xy => write!(f, "XY"),
            Plane::Zx => write!(f, "ZX"),
            Plane::Yz => write!(f, "YZ"),
        }
    }
}

impl FromStr for Plane {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, CommandError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xy" => Ok(Plane::Xy),
            "zx" | "xz" => Ok(Plane::Zx),
            "yz" | "zy" => Ok(Plane::Yz),
            _ => Err(CommandError::InvalidPlane(s.to_string())),
        }
    }
}

/// Direction of travel along an arc
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcDirection {
    Clockwise,
    CounterClockwise,
}

impl fmt::Display for ArcDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArcDirection::Clockwise => write!(f, "clockwise"),
            ArcDirection::CounterClockwise => write!(f, "counter-clockwise"),
        }
    }
}
