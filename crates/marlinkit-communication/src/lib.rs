//! # MarlinKit Communication
//!
//! Serial transport and the command/acknowledgment protocol for driving
//! Marlin-flavoured G-code devices. The layers, bottom up:
//!
//! - [`transport`]: line-framed byte streams; serial port discovery and I/O
//! - [`protocol`]: command encoding, acknowledgment classification, and the
//!   strictly sequential session state machine
//! - [`printer`]: the motion-level facade most callers want
//!
//! ## Example
//!
//! ```no_run
//! use marlinkit_communication::Printer;
//! use marlinkit_settings::Config;
//!
//! fn main() -> marlinkit_core::Result<()> {
//!     let mut printer = Printer::connect(Config::default())?;
//!     printer.home_all()?;
//!     printer.move_xy(110.0, 110.0)?;
//!     printer.close()
//! }
//! ```

pub mod printer;
pub mod protocol;
pub mod transport;

pub use printer::Printer;

pub use protocol::{await_ack, is_ack, AckOutcome, ACK_TOKEN};
pub use protocol::{Command, CommandEncoder, DeviceInfo, Session};

pub use transport::serial::SerialTransport;
pub use transport::{list_ports, pick_default_port, SerialPortInfo, Transport};
