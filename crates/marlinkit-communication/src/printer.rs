//! High-level printer facade
//!
//! [`Printer`] ties the encoder, geometry checks, and the session together
//! behind motion-level methods. Connecting runs the full handshake: open,
//! settle, identify, then force absolute positioning and the configured
//! default feed rate so the tracked state starts from a known footing.
//!
//! Motion methods return `&mut Self` so short sequences chain:
//!
//! ```no_run
//! # use marlinkit_communication::Printer;
//! # use marlinkit_settings::Config;
//! # fn run() -> marlinkit_core::Result<()> {
//! let mut printer = Printer::connect(Config::default())?;
//! printer.home_all()?.move_xy(110.0, 110.0)?.rel_move_z(10.0)?;
//! printer.close()?;
//! # Ok(())
//! # }
//! ```

use crate::protocol::encoder::CommandEncoder;
use crate::protocol::{Command, DeviceInfo, Session};
use crate::transport::serial::SerialTransport;
use crate::transport::{pick_default_port, Transport};
use marlinkit_core::{
    validate_absolute, validate_relative, ArcDirection, Axis, AxisSet, AxisValues, BoundsCheck,
    CommandError, CoordinateMode, ListenerHandle, MachineState, Plane, ProtocolError,
    ProtocolListener, Result, SessionState, SoftLimits,
};
use marlinkit_settings::Config;
use std::fmt;
use std::sync::Arc;

/// Connected printer driven over the command/acknowledgment protocol
pub struct Printer {
    session: Session,
    encoder: CommandEncoder,
    limits: SoftLimits,
}

impl fmt::Debug for Printer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Printer")
            .field("state", &self.session.session_state())
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl Printer {
    /// Open the configured serial port and run the connect handshake
    ///
    /// When no port is configured the first detected printer-looking port
    /// is used.
    pub fn connect(config: Config) -> Result<Self> {
        let port = match &config.serial.port {
            Some(port) => port.clone(),
            None => pick_default_port()?,
        };
        let transport =
            SerialTransport::open(&port, config.serial.baud_rate, config.serial.timeout())?;
        Self::with_transport(Box::new(transport), config)
    }

    /// Run the connect handshake over an already opened transport
    ///
    /// Identifies the device, then establishes absolute positioning and the
    /// configured default feed rate.
    pub fn with_transport(transport: Box<dyn Transport>, config: Config) -> Result<Self> {
        let limits = config.motion.soft_limits;
        let default_feed = config.motion.default_feed_rate;
        let encoder = CommandEncoder::new(config.commands.clone());

        let mut session = Session::connect(transport, Arc::new(config))?;
        session.identify()?;

        let mut printer = Self {
            session,
            encoder,
            limits,
        };
        printer.set_absolute()?;
        printer.set_feed_rate(default_feed)?;
        Ok(printer)
    }

    /// Move to `target`, interpreted under the current coordinate mode
    pub fn move_to(&mut self, target: &AxisValues, feed: Option<f64>) -> Result<&mut Self> {
        let mode = self.session.machine_state().coordinate_mode;
        self.check_motion(target, mode)?;
        let command = self.encoder.linear_move(target, feed, mode)?;
        self.session.execute(command)?;
        Ok(self)
    }

    pub fn move_x(&mut self, x: f64) -> Result<&mut Self> {
        self.move_to(&AxisValues::x(x), None)
    }

    pub fn move_y(&mut self, y: f64) -> Result<&mut Self> {
        self.move_to(&AxisValues::y(y), None)
    }

    pub fn move_z(&mut self, z: f64) -> Result<&mut Self> {
        self.move_to(&AxisValues::z(z), None)
    }

    pub fn move_xy(&mut self, x: f64, y: f64) -> Result<&mut Self> {
        self.move_to(&AxisValues::xy(x, y), None)
    }

    pub fn move_xz(&mut self, x: f64, z: f64) -> Result<&mut Self> {
        self.move_to(&AxisValues::xz(x, z), None)
    }

    pub fn move_yz(&mut self, y: f64, z: f64) -> Result<&mut Self> {
        self.move_to(&AxisValues::yz(y, z), None)
    }

    pub fn move_xyz(&mut self, x: f64, y: f64, z: f64) -> Result<&mut Self> {
        self.move_to(&AxisValues::xyz(x, y, z), None)
    }

    /// Move by `delta` regardless of the current coordinate mode
    ///
    /// Encoded as a bracketed sequence that enters relative positioning,
    /// moves, and restores absolute positioning, acknowledged as one unit.
    /// The tracked feed rate is sent explicitly so the move never rides on
    /// whatever modal rate the device happens to hold.
    pub fn rel_move(&mut self, delta: &AxisValues) -> Result<&mut Self> {
        self.check_motion(delta, CoordinateMode::Relative)?;
        let feed = Some(self.session.machine_state().feed_rate);
        let command = self.encoder.relative_move(delta, feed)?;
        self.session.execute(command)?;
        Ok(self)
    }

    pub fn rel_move_x(&mut self, dx: f64) -> Result<&mut Self> {
        self.rel_move(&AxisValues::x(dx))
    }

    pub fn rel_move_y(&mut self, dy: f64) -> Result<&mut Self> {
        self.rel_move(&AxisValues::y(dy))
    }

    pub fn rel_move_z(&mut self, dz: f64) -> Result<&mut Self> {
        self.rel_move(&AxisValues::z(dz))
    }

    pub fn rel_move_xy(&mut self, dx: f64, dy: f64) -> Result<&mut Self> {
        self.rel_move(&AxisValues::xy(dx, dy))
    }

    pub fn rel_move_xyz(&mut self, dx: f64, dy: f64, dz: f64) -> Result<&mut Self> {
        self.rel_move(&AxisValues::xyz(dx, dy, dz))
    }

    /// Raise Z, move along `axis`, lower Z back
    ///
    /// Three relative moves acknowledged separately. A failure on the first
    /// step leaves the machine where it was and propagates plainly; a
    /// failure after that reports which step broke off and where the
    /// carriage is believed to be.
    pub fn hop(&mut self, axis: Axis, distance: f64, height: f64) -> Result<&mut Self> {
        if axis == Axis::Z {
            return Err(CommandError::InvalidAxis('Z').into());
        }
        if !height.is_finite() {
            return Err(CommandError::NonFiniteValue { axis: Axis::Z }.into());
        }
        if height <= 0.0 {
            return Err(CommandError::OutOfBounds {
                axis: Axis::Z,
                value: height,
                limit: 0.0,
            }
            .into());
        }

        let steps: [(&'static str, AxisValues); 3] = [
            ("raise", AxisValues::z(height)),
            ("move", AxisValues::single(axis, distance)),
            ("lower", AxisValues::z(-height)),
        ];
        for (index, (step, delta)) in steps.into_iter().enumerate() {
            let outcome = self.rel_move(&delta).map(|_| ());
            if let Err(source) = outcome {
                if index == 0 {
                    return Err(source);
                }
                return Err(ProtocolError::PartialComposite {
                    operation: "hop",
                    step,
                    position: self.session.machine_state().last_known_position,
                    source: Box::new(source),
                }
                .into());
            }
        }
        Ok(self)
    }

    /// Clockwise arc to `(x, y[, z])` with the given radius
    ///
    /// The endpoint is interpreted under the current coordinate mode and in
    /// the active plane. A negative radius selects the longer of the two
    /// arcs through the endpoint.
    pub fn arc_cw(&mut self, radius: f64, x: f64, y: f64, z: Option<f64>) -> Result<&mut Self> {
        self.arc(ArcDirection::Clockwise, radius, x, y, z)
    }

    /// Counter-clockwise arc to `(x, y[, z])` with the given radius
    pub fn arc_ccw(&mut self, radius: f64, x: f64, y: f64, z: Option<f64>) -> Result<&mut Self> {
        self.arc(ArcDirection::CounterClockwise, radius, x, y, z)
    }

    fn arc(
        &mut self,
        direction: ArcDirection,
        radius: f64,
        x: f64,
        y: f64,
        z: Option<f64>,
    ) -> Result<&mut Self> {
        let endpoint = AxisValues::new(Some(x), Some(y), z);
        let mode = self.session.machine_state().coordinate_mode;
        self.check_motion(&endpoint, mode)?;
        let command = self.encoder.arc(direction, x, y, z, radius, mode)?;
        self.session.execute(command)?;
        Ok(self)
    }

    /// Select the coordinate interpretation mode
    ///
    /// Always written to the wire, even when the tracked state already
    /// matches; the device is the authority and resending is harmless.
    pub fn set_mode(&mut self, mode: CoordinateMode) -> Result<&mut Self> {
        let command = self.encoder.set_mode(mode);
        self.session.execute(command)?;
        Ok(self)
    }

    pub fn set_absolute(&mut self) -> Result<&mut Self> {
        self.set_mode(CoordinateMode::Absolute)
    }

    pub fn set_relative(&mut self) -> Result<&mut Self> {
        self.set_mode(CoordinateMode::Relative)
    }

    /// Select the coordinate mode from text such as `abs` or `relative`
    pub fn set_mode_str(&mut self, text: &str) -> Result<&mut Self> {
        let mode: CoordinateMode = text.parse()?;
        self.set_mode(mode)
    }

    /// Select the arc interpolation plane
    pub fn set_plane(&mut self, plane: Plane) -> Result<&mut Self> {
        let command = self.encoder.set_plane(plane);
        self.session.execute(command)?;
        Ok(self)
    }

    pub fn set_plane_xy(&mut self) -> Result<&mut Self> {
        self.set_plane(Plane::Xy)
    }

    pub fn set_plane_zx(&mut self) -> Result<&mut Self> {
        self.set_plane(Plane::Zx)
    }

    pub fn set_plane_yz(&mut self) -> Result<&mut Self> {
        self.set_plane(Plane::Yz)
    }

    /// Select the arc plane from text such as `xy` or `zx`
    pub fn set_plane_str(&mut self, text: &str) -> Result<&mut Self> {
        let plane: Plane = text.parse()?;
        self.set_plane(plane)
    }

    /// Set the modal feed rate in units/min
    pub fn set_feed_rate(&mut self, rate: f64) -> Result<&mut Self> {
        let command = self.encoder.feed_rate(rate)?;
        self.session.execute(command)?;
        Ok(self)
    }

    /// Set the modal feed rate from a speed in units/second
    ///
    /// Converted to units/min and rounded to two decimals before encoding.
    pub fn set_speed(&mut self, speed: f64) -> Result<&mut Self> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(CommandError::InvalidFeedRate(speed).into());
        }
        let rate = (speed * 60.0 * 100.0).round() / 100.0;
        self.set_feed_rate(rate)
    }

    /// Home the axes named in `axes`; an empty string homes everything
    ///
    /// Accepts any spelling order, e.g. `"zx"`; the wire command always
    /// carries the letters in canonical X, Y, Z order.
    pub fn home(&mut self, axes: &str) -> Result<&mut Self> {
        let set: AxisSet = axes.parse()?;
        let command = self.encoder.home(set);
        self.session.execute(command)?;
        Ok(self)
    }

    pub fn home_all(&mut self) -> Result<&mut Self> {
        self.home("")
    }

    /// Energize the named stepper motors; an empty string addresses all
    pub fn enable_motors(&mut self, axes: &str) -> Result<&mut Self> {
        let set: AxisSet = axes.parse()?;
        let command = self.encoder.enable_motors(set);
        self.session.execute(command)?;
        Ok(self)
    }

    pub fn enable_all_motors(&mut self) -> Result<&mut Self> {
        self.enable_motors("")
    }

    /// De-energize the named stepper motors; an empty string addresses all
    pub fn disable_motors(&mut self, axes: &str) -> Result<&mut Self> {
        let set: AxisSet = axes.parse()?;
        let command = self.encoder.disable_motors(set);
        self.session.execute(command)?;
        Ok(self)
    }

    pub fn disable_all_motors(&mut self) -> Result<&mut Self> {
        self.disable_motors("")
    }

    /// Send raw G-code text and wait for its acknowledgment
    ///
    /// Blank input is a no-op. The tracked machine state is not updated.
    pub fn send_line(&mut self, text: &str) -> Result<&mut Self> {
        if text.trim().is_empty() {
            return Ok(self);
        }
        self.session.execute(Command::raw(text))?;
        Ok(self)
    }

    /// Halt the device immediately, without waiting for a response
    pub fn emergency_stop(&mut self) -> Result<&mut Self> {
        let command = self.encoder.emergency_stop();
        self.session.execute(command)?;
        Ok(self)
    }

    pub fn device_info(&self) -> Option<&DeviceInfo> {
        self.session.device_info()
    }

    pub fn machine_state(&self) -> &MachineState {
        self.session.machine_state()
    }

    pub fn session_state(&self) -> SessionState {
        self.session.session_state()
    }

    pub fn register_listener(&self, listener: Arc<dyn ProtocolListener>) -> ListenerHandle {
        self.session.register_listener(listener)
    }

    pub fn unregister_listener(&self, handle: &ListenerHandle) -> bool {
        self.session.unregister_listener(handle)
    }

    /// Close the underlying session and release the port
    pub fn close(mut self) -> Result<()> {
        self.session.close()
    }

    fn check_motion(&self, values: &AxisValues, mode: CoordinateMode) -> Result<()> {
        match mode {
            CoordinateMode::Absolute => validate_absolute(values, &self.limits)?,
            CoordinateMode::Relative => {
                let from = self.session.machine_state().last_known_position;
                if validate_relative(values, from, &self.limits)? == BoundsCheck::Unverified {
                    self.session.advise(
                        "Motion from an unknown position; destination not checked against limits",
                    );
                }
            }
        }
        Ok(())
    }
}
