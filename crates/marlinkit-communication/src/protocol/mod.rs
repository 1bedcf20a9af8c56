//! Command encoding and the acknowledgment-driven session
//!
//! [`encoder`] turns motion requests into wire text, [`ack`] classifies
//! response lines, [`device_info`] parses the identification report, and
//! [`session`] sequences it all over a transport.

pub mod ack;
pub mod device_info;
pub mod encoder;
pub mod session;

pub use ack::{await_ack, is_ack, AckOutcome, ACK_TOKEN};
pub use device_info::DeviceInfo;
pub use encoder::{Command, CommandEncoder};
pub use session::Session;
