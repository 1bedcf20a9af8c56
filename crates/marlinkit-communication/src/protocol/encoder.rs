//! Command encoding
//!
//! Builds the exact ASCII lines the device receives. Axis words are emitted
//! in canonical X, Y, Z order with the feed word last, and numbers use the
//! shortest round-trip form, so `10.0` goes to the wire as `10`. Encoders
//! return [`Command`] values carrying the wire text together with the state
//! transition an acknowledgment implies; nothing here touches the transport.

use marlinkit_core::{
    ArcDirection, AxisSet, AxisValues, CommandError, CoordinateMode, Plane, StateEffect,
};
use marlinkit_settings::CommandTable;
use std::fmt;

/// An encoded command ready for transmission
///
/// One command is one acknowledgment cycle, even when it spans several wire
/// lines (the bracketed relative move does). The effect is applied to the
/// tracked machine state only after the device acknowledges.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    lines: Vec<String>,
    expects_ack: bool,
    effect: StateEffect,
}

impl Command {
    /// Single-line command
    pub fn single(line: impl Into<String>, effect: StateEffect) -> Self {
        Self {
            lines: vec![line.into()],
            expects_ack: true,
            effect,
        }
    }

    /// Multi-line command acknowledged as one unit
    pub fn sequence(lines: Vec<String>, effect: StateEffect) -> Self {
        Self {
            lines,
            expects_ack: true,
            effect,
        }
    }

    /// Command that is written without waiting for a response
    pub fn unacknowledged(line: impl Into<String>) -> Self {
        Self {
            lines: vec![line.into()],
            expects_ack: false,
            effect: StateEffect::None,
        }
    }

    /// Raw G-code passthrough
    ///
    /// Splits on newlines and drops blank lines. The tracked machine state
    /// is not updated; callers sending raw text are on their own.
    pub fn raw(text: &str) -> Self {
        let lines = text
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        Self {
            lines,
            expects_ack: true,
            effect: StateEffect::None,
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn expects_ack(&self) -> bool {
        self.expects_ack
    }

    pub fn effect(&self) -> &StateEffect {
        &self.effect
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lines.join(" / "))
    }
}

/// Builds wire commands from a command table
#[derive(Debug, Clone)]
pub struct CommandEncoder {
    table: CommandTable,
}

impl CommandEncoder {
    pub fn new(table: CommandTable) -> Self {
        Self { table }
    }

    /// Single linear move, interpreted under `mode`
    pub fn linear_move(
        &self,
        target: &AxisValues,
        feed: Option<f64>,
        mode: CoordinateMode,
    ) -> Result<Command, CommandError> {
        if target.is_empty() {
            return Err(CommandError::EmptyMove);
        }
        check_feed(feed)?;
        Ok(Command::single(
            motion_line("G0", target, feed),
            StateEffect::Move {
                target: *target,
                feed,
                mode,
            },
        ))
    }

    /// Bracketed relative move
    ///
    /// Emits set-relative, the motion line, set-absolute as one command, so
    /// the device is back in absolute positioning whatever happens next.
    pub fn relative_move(
        &self,
        delta: &AxisValues,
        feed: Option<f64>,
    ) -> Result<Command, CommandError> {
        if delta.is_empty() {
            return Err(CommandError::EmptyMove);
        }
        check_feed(feed)?;
        Ok(Command::sequence(
            vec![
                self.table.set_relative.clone(),
                motion_line("G0", delta, feed),
                self.table.set_absolute.clone(),
            ],
            StateEffect::RelativeMove {
                delta: *delta,
                feed,
            },
        ))
    }

    /// Arc move in the active plane
    ///
    /// The endpoint is X/Y with an optional Z; the radius word selects the
    /// arc. A negative radius is legal and picks the longer of the two arcs
    /// through the endpoint.
    pub fn arc(
        &self,
        direction: ArcDirection,
        x: f64,
        y: f64,
        z: Option<f64>,
        radius: f64,
        mode: CoordinateMode,
    ) -> Result<Command, CommandError> {
        if !radius.is_finite() || radius == 0.0 {
            return Err(CommandError::InvalidRadius(radius));
        }
        let verb = match direction {
            ArcDirection::Clockwise => "G2",
            ArcDirection::CounterClockwise => "G3",
        };
        let target = AxisValues::new(Some(x), Some(y), z);
        let mut line = motion_line(verb, &target, None);
        line.push_str(" R");
        line.push_str(&format_number(radius));
        Ok(Command::single(
            line,
            StateEffect::Move {
                target,
                feed: None,
                mode,
            },
        ))
    }

    /// Set the modal feed rate without moving
    pub fn feed_rate(&self, rate: f64) -> Result<Command, CommandError> {
        check_feed(Some(rate))?;
        Ok(Command::single(
            format!("G0 F{}", format_number(rate)),
            StateEffect::SetFeedRate(rate),
        ))
    }

    /// Select a coordinate mode
    pub fn set_mode(&self, mode: CoordinateMode) -> Command {
        Command::single(self.table.mode_command(mode).to_string(), StateEffect::SetMode(mode))
    }

    /// Select an arc plane
    pub fn set_plane(&self, plane: Plane) -> Command {
        Command::single(
            self.table.plane_command(plane).to_string(),
            StateEffect::SetPlane(plane),
        )
    }

    /// Homing cycle over the given axes; an empty set homes everything
    pub fn home(&self, axes: AxisSet) -> Command {
        Command::single(
            with_axis_letters(&self.table.auto_home, axes),
            StateEffect::Homed(axes),
        )
    }

    /// Energize steppers; an empty set addresses all of them
    pub fn enable_motors(&self, axes: AxisSet) -> Command {
        Command::single(
            with_axis_letters(&self.table.enable_motors, axes),
            StateEffect::None,
        )
    }

    /// De-energize steppers; an empty set addresses all of them
    pub fn disable_motors(&self, axes: AxisSet) -> Command {
        Command::single(
            with_axis_letters(&self.table.disable_motors, axes),
            StateEffect::None,
        )
    }

    /// Emergency stop
    ///
    /// Written without an acknowledgment wait; the device halts and will
    /// usually need a reset before it talks again.
    pub fn emergency_stop(&self) -> Command {
        Command::unacknowledged("M112")
    }
}

/// Shortest round-trip decimal form of a value
fn format_number(value: f64) -> String {
    // Normalizes -0.0 so no command carries a negative zero word
    if value == 0.0 {
        "0".to_string()
    } else {
        value.to_string()
    }
}

fn motion_line(verb: &str, values: &AxisValues, feed: Option<f64>) -> String {
    let mut line = String::from(verb);
    for (axis, value) in values.iter() {
        line.push(' ');
        line.push(axis.letter());
        line.push_str(&format_number(value));
    }
    if let Some(rate) = feed {
        line.push_str(" F");
        line.push_str(&format_number(rate));
    }
    line
}

fn with_axis_letters(base: &str, axes: AxisSet) -> String {
    let mut line = base.to_string();
    for axis in axes.iter() {
        line.push(' ');
        line.push(axis.letter());
    }
    line
}

fn check_feed(feed: Option<f64>) -> Result<(), CommandError> {
    if let Some(rate) = feed {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(CommandError::InvalidFeedRate(rate));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use marlinkit_core::Axis;

    fn encoder() -> CommandEncoder {
        CommandEncoder::new(CommandTable::default())
    }

    fn axes(s: &str) -> AxisSet {
        s.parse().unwrap()
    }

    #[test]
    fn test_linear_move_wire_text() {
        let cmd = encoder()
            .linear_move(&AxisValues::xy(10.0, 20.0), None, CoordinateMode::Absolute)
            .unwrap();
        assert_eq!(cmd.lines(), ["G0 X10 Y20"]);
        assert!(cmd.expects_ack());
    }

    #[test]
    fn test_word_order_is_x_y_z_f() {
        let cmd = encoder()
            .linear_move(
                &AxisValues::xyz(1.5, -2.0, 0.25),
                Some(1500.0),
                CoordinateMode::Absolute,
            )
            .unwrap();
        assert_eq!(cmd.lines(), ["G0 X1.5 Y-2 Z0.25 F1500"]);
    }

    #[test]
    fn test_integral_values_have_no_fraction() {
        let cmd = encoder()
            .linear_move(&AxisValues::z(50.0), None, CoordinateMode::Absolute)
            .unwrap();
        assert_eq!(cmd.lines(), ["G0 Z50"]);
    }

    #[test]
    fn test_negative_zero_is_normalized() {
        let cmd = encoder()
            .linear_move(&AxisValues::z(-0.0), None, CoordinateMode::Absolute)
            .unwrap();
        assert_eq!(cmd.lines(), ["G0 Z0"]);
    }

    #[test]
    fn test_empty_move_rejected() {
        let err = encoder()
            .linear_move(&AxisValues::default(), None, CoordinateMode::Absolute)
            .unwrap_err();
        assert_eq!(err, CommandError::EmptyMove);
    }

    #[test]
    fn test_relative_move_brackets() {
        let cmd = encoder()
            .relative_move(&AxisValues::x(50.0), Some(5000.0))
            .unwrap();
        assert_eq!(cmd.lines(), ["G91", "G0 X50 F5000", "G90"]);
        assert_eq!(
            *cmd.effect(),
            StateEffect::RelativeMove {
                delta: AxisValues::x(50.0),
                feed: Some(5000.0),
            }
        );
    }

    #[test]
    fn test_arc_without_z() {
        let cmd = encoder()
            .arc(
                ArcDirection::Clockwise,
                100.0,
                60.0,
                None,
                40.0,
                CoordinateMode::Absolute,
            )
            .unwrap();
        assert_eq!(cmd.lines(), ["G2 X100 Y60 R40"]);
    }

    #[test]
    fn test_arc_with_z_and_direction() {
        let cmd = encoder()
            .arc(
                ArcDirection::CounterClockwise,
                100.0,
                60.0,
                Some(50.0),
                40.0,
                CoordinateMode::Absolute,
            )
            .unwrap();
        assert_eq!(cmd.lines(), ["G3 X100 Y60 Z50 R40"]);
    }

    #[test]
    fn test_arc_negative_radius_selects_major_arc() {
        let cmd = encoder()
            .arc(
                ArcDirection::Clockwise,
                10.0,
                0.0,
                None,
                -5.0,
                CoordinateMode::Absolute,
            )
            .unwrap();
        assert_eq!(cmd.lines(), ["G2 X10 Y0 R-5"]);
    }

    #[test]
    fn test_arc_zero_radius_rejected() {
        let err = encoder()
            .arc(
                ArcDirection::Clockwise,
                10.0,
                0.0,
                None,
                0.0,
                CoordinateMode::Absolute,
            )
            .unwrap_err();
        assert_eq!(err, CommandError::InvalidRadius(0.0));
    }

    #[test]
    fn test_home_appends_letters_in_canonical_order() {
        let enc = encoder();
        assert_eq!(enc.home(axes("ZXY")).lines(), ["G28 X Y Z"]);
        assert_eq!(enc.home(axes("z")).lines(), ["G28 Z"]);
        assert_eq!(enc.home(AxisSet::new()).lines(), ["G28"]);
    }

    #[test]
    fn test_home_effect_carries_axes() {
        let cmd = encoder().home(axes("XY"));
        match cmd.effect() {
            StateEffect::Homed(set) => {
                assert!(set.contains(Axis::X));
                assert!(set.contains(Axis::Y));
                assert!(!set.contains(Axis::Z));
            }
            other => panic!("unexpected effect: {:?}", other),
        }
    }

    #[test]
    fn test_motor_commands() {
        let enc = encoder();
        assert_eq!(enc.enable_motors(axes("xy")).lines(), ["M17 X Y"]);
        assert_eq!(enc.disable_motors(AxisSet::new()).lines(), ["M84"]);
        assert_eq!(*enc.enable_motors(AxisSet::new()).effect(), StateEffect::None);
    }

    #[test]
    fn test_mode_and_plane_commands() {
        let enc = encoder();
        assert_eq!(enc.set_mode(CoordinateMode::Absolute).lines(), ["G90"]);
        assert_eq!(enc.set_mode(CoordinateMode::Relative).lines(), ["G91"]);
        assert_eq!(enc.set_plane(Plane::Xy).lines(), ["G17"]);
        assert_eq!(enc.set_plane(Plane::Zx).lines(), ["G18"]);
        assert_eq!(enc.set_plane(Plane::Yz).lines(), ["G19"]);
    }

    #[test]
    fn test_feed_rate_command() {
        let cmd = encoder().feed_rate(4999.98).unwrap();
        assert_eq!(cmd.lines(), ["G0 F4999.98"]);
        assert_eq!(*cmd.effect(), StateEffect::SetFeedRate(4999.98));

        assert_eq!(
            encoder().feed_rate(0.0).unwrap_err(),
            CommandError::InvalidFeedRate(0.0)
        );
        assert_eq!(
            encoder().feed_rate(-100.0).unwrap_err(),
            CommandError::InvalidFeedRate(-100.0)
        );
    }

    #[test]
    fn test_emergency_stop_skips_ack() {
        let cmd = encoder().emergency_stop();
        assert_eq!(cmd.lines(), ["M112"]);
        assert!(!cmd.expects_ack());
    }

    #[test]
    fn test_raw_splits_and_drops_blank_lines() {
        let cmd = Command::raw("M105\n\n  M114  \n");
        assert_eq!(cmd.lines(), ["M105", "M114"]);
        assert!(cmd.expects_ack());
        assert_eq!(*cmd.effect(), StateEffect::None);
    }

    #[test]
    fn test_display_joins_lines() {
        let cmd = encoder()
            .relative_move(&AxisValues::z(5.0), Some(600.0))
            .unwrap();
        assert_eq!(cmd.to_string(), "G91 / G0 Z5 F600 / G90");
    }

    #[test]
    fn test_remapped_table_is_honored() {
        let mut table = CommandTable::default();
        table.auto_home = "$H".to_string();
        table.set_relative = "G91.1".to_string();
        let enc = CommandEncoder::new(table);
        assert_eq!(enc.home(AxisSet::new()).lines(), ["$H"]);
        let cmd = enc.relative_move(&AxisValues::x(1.0), None).unwrap();
        assert_eq!(cmd.lines()[0], "G91.1");
    }
}
