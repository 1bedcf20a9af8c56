//! # MarlinKit
//!
//! A command/acknowledgment G-code sender for Marlin 3D printers over
//! serial. MarlinKit keeps exactly one command in flight: every command is
//! written with a trailing disable-motors sentinel, and the next one waits
//! until the firmware answers with its `ok` line.
//!
//! ## Architecture
//!
//! MarlinKit is organized as a workspace with multiple crates:
//!
//! 1. **marlinkit-core** - Types, geometry validation, state tracking, errors
//! 2. **marlinkit-settings** - Configuration files and validation
//! 3. **marlinkit-communication** - Serial transport, protocol, printer facade
//! 4. **marlinkit** - The command-line binary tying it together
//!
//! ## Features
//!
//! - **Strict sequencing**: one command, one acknowledgment, in order
//! - **Soft limits**: every motion request is bounds-checked before sending
//! - **State mirror**: mode, plane, feed rate, and position tracked locally
//! - **Remappable commands**: the wire text lives in the configuration
//! - **Cross-Platform**: Linux, Windows, macOS support

pub mod cli;

pub use marlinkit_communication::{
    list_ports, pick_default_port, AckOutcome, Command, CommandEncoder, DeviceInfo, Printer,
    SerialPortInfo, SerialTransport, Session, Transport,
};

pub use marlinkit_core::{
    ArcDirection, Axis, AxisLimits, AxisSet, AxisValues, BoundsCheck, CommandError,
    ConnectionError, CoordinateMode, Error, ListenerHandle, MachineState, Plane, Position,
    ProtocolError, ProtocolListener, Result, SessionState, SoftLimits, StateEffect,
};

pub use marlinkit_settings::{CommandTable, Config, SettingsError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Honors the RUST_LOG environment variable. Log lines go to stderr so the
/// command output on stdout stays clean.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}
