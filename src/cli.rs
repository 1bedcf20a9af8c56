//! Command-line interface
//!
//! Each subcommand connects, runs one operation through [`Printer`], prints
//! the tracked machine state, and closes. `shell` keeps the connection open
//! and passes raw G-code lines through.

use clap::{Parser, Subcommand};
use marlinkit_communication::{list_ports, Printer};
use marlinkit_core::AxisValues;
use marlinkit_settings::Config;
use std::path::PathBuf;

/// MarlinKit - command/acknowledgment G-code sender for Marlin printers
#[derive(Parser, Debug)]
#[command(name = "marlinkit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to a JSON or TOML configuration file
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Serial port to use, overriding the configuration
    #[arg(long, global = true, value_name = "PORT")]
    pub port: Option<String>,

    /// Baud rate, overriding the configuration
    #[arg(long, global = true)]
    pub baud: Option<u32>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List serial ports that look like a printer
    Ports,

    /// Connect and show the device identification report
    Info,

    /// Run a homing cycle
    Home {
        /// Axis letters to home, e.g. "xy"; omit to home everything
        axes: Option<String>,
    },

    /// Linear move under the current coordinate mode
    #[command(allow_negative_numbers = true)]
    Move {
        /// Target X coordinate
        #[arg(short, long)]
        x: Option<f64>,

        /// Target Y coordinate
        #[arg(short, long)]
        y: Option<f64>,

        /// Target Z coordinate
        #[arg(short, long)]
        z: Option<f64>,

        /// Feed rate in units/min for this move
        #[arg(short, long)]
        feed: Option<f64>,
    },

    /// Relative move by the given deltas, restoring absolute mode after
    #[command(allow_negative_numbers = true)]
    Rel {
        /// Delta along X
        #[arg(short, long)]
        x: Option<f64>,

        /// Delta along Y
        #[arg(short, long)]
        y: Option<f64>,

        /// Delta along Z
        #[arg(short, long)]
        z: Option<f64>,
    },

    /// Arc move to an endpoint in the active plane
    #[command(allow_negative_numbers = true)]
    Arc {
        /// Arc radius; negative selects the longer arc
        #[arg(short, long)]
        radius: f64,

        /// Endpoint X coordinate
        x: f64,

        /// Endpoint Y coordinate
        y: f64,

        /// Optional endpoint Z for a helical arc
        z: Option<f64>,

        /// Counter-clockwise instead of clockwise
        #[arg(long)]
        ccw: bool,
    },

    /// Set the modal feed rate in units/min
    Feed {
        /// Feed rate in units/min
        rate: f64,
    },

    /// Set the modal feed rate from a speed in units/second
    Speed {
        /// Speed in units/second
        speed: f64,
    },

    /// Select the coordinate interpretation mode
    Mode {
        /// One of "abs" or "rel"
        mode: String,
    },

    /// Select the arc interpolation plane
    Plane {
        /// One of "xy", "zx" or "yz"
        plane: String,
    },

    /// Energize or de-energize stepper motors
    Motors {
        /// "on" or "off"
        #[arg(value_parser = ["on", "off"])]
        state: String,

        /// Axis letters to address; omit for all
        axes: Option<String>,
    },

    /// Interactive raw G-code shell
    Shell,
}

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if matches!(cli.command, Commands::Ports) {
        return cmd_ports();
    }

    let config = load_config(&cli)?;
    let mut printer = Printer::connect(config)?;

    let outcome = dispatch(&mut printer, cli.command);
    let closed = printer.close();
    outcome?;
    closed?;
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::load_default()?,
    };
    if let Some(port) = &cli.port {
        config.serial.port = Some(port.clone());
    }
    if let Some(baud) = cli.baud {
        config.serial.baud_rate = baud;
    }
    Ok(config)
}

fn cmd_ports() -> anyhow::Result<()> {
    let ports = list_ports()?;
    if ports.is_empty() {
        println!("No printer-looking serial ports detected");
        return Ok(());
    }
    for port in ports {
        println!("{}  {}", port.port_name, port.description);
    }
    Ok(())
}

fn dispatch(printer: &mut Printer, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Ports => unreachable!("handled before connecting"),
        Commands::Info => {
            match printer.device_info() {
                Some(info) => {
                    println!("{}", info);
                    for capability in &info.capabilities {
                        println!("  {}", capability);
                    }
                }
                None => println!("No identification report"),
            }
            return Ok(());
        }
        Commands::Home { axes } => {
            printer.home(axes.as_deref().unwrap_or(""))?;
        }
        Commands::Move { x, y, z, feed } => {
            printer.move_to(&AxisValues::new(x, y, z), feed)?;
        }
        Commands::Rel { x, y, z } => {
            printer.rel_move(&AxisValues::new(x, y, z))?;
        }
        Commands::Arc {
            radius,
            x,
            y,
            z,
            ccw,
        } => {
            if ccw {
                printer.arc_ccw(radius, x, y, z)?;
            } else {
                printer.arc_cw(radius, x, y, z)?;
            }
        }
        Commands::Feed { rate } => {
            printer.set_feed_rate(rate)?;
        }
        Commands::Speed { speed } => {
            printer.set_speed(speed)?;
        }
        Commands::Mode { mode } => {
            printer.set_mode_str(&mode)?;
        }
        Commands::Plane { plane } => {
            printer.set_plane_str(&plane)?;
        }
        Commands::Motors { state, axes } => {
            let axes = axes.as_deref().unwrap_or("");
            if state == "on" {
                printer.enable_motors(axes)?;
            } else {
                printer.disable_motors(axes)?;
            }
        }
        Commands::Shell => return shell(printer),
    }

    println!("{}", printer.machine_state());
    Ok(())
}

fn shell(printer: &mut Printer) -> anyhow::Result<()> {
    use std::io::{BufRead, Write};

    println!("Raw G-code shell; 'state' shows the tracked state, 'quit' leaves");
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        match line {
            "" => continue,
            "quit" | "exit" => break,
            "state" => println!("{}", printer.machine_state()),
            text => {
                if let Err(e) = printer.send_line(text) {
                    eprintln!("Error: {}", e);
                    if !e.is_recoverable() {
                        return Err(e.into());
                    }
                }
            }
        }
    }
    Ok(())
}
