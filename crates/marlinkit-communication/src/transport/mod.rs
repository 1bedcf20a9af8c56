//! Byte-stream transport abstraction
//!
//! The protocol layer talks to the device through the [`Transport`] trait:
//! a line-framed, single-owner byte stream. The serial implementation lives
//! in [`serial`]; tests substitute scripted implementations.

pub mod serial;

use marlinkit_core::{ConnectionError, Result};

/// A line-framed byte stream to a device
///
/// Implementations own the underlying handle. Reads are non-blocking in
/// spirit: `read_line` returns `Ok(None)` when no complete line is available
/// yet, and callers poll. One session owns one transport; nothing here is
/// shared.
pub trait Transport: Send {
    /// Read one complete line, without its terminator
    ///
    /// Returns `Ok(None)` when no full line has arrived. Carriage returns
    /// are left in place; the protocol layer trims whitespace when it
    /// decodes.
    fn read_line(&mut self) -> Result<Option<Vec<u8>>>;

    /// Write raw bytes to the device
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Drop any unread input
    fn flush_input(&mut self) -> Result<()>;

    /// Release the underlying handle
    fn close(&mut self) -> Result<()>;

    /// Human-readable name of the endpoint, e.g. the device path
    fn name(&self) -> &str;
}

/// Information about an available serial port
#[derive(Debug, Clone)]
pub struct SerialPortInfo {
    /// Port name (e.g., "/dev/ttyACM0", "COM3")
    pub port_name: String,

    /// Port description (e.g., "USB Ultimachine RAMBo")
    pub description: String,

    /// Manufacturer name if available
    pub manufacturer: Option<String>,

    /// Serial number if available
    pub serial_number: Option<String>,

    /// USB vendor ID if applicable
    pub vid: Option<u16>,

    /// USB product ID if applicable
    pub pid: Option<u16>,
}

impl SerialPortInfo {
    fn new(port_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            description: description.into(),
            manufacturer: None,
            serial_number: None,
            vid: None,
            pid: None,
        }
    }
}

/// List serial ports that could plausibly be a printer
///
/// Filters the system port list down to the device patterns printer control
/// boards enumerate as:
/// - Windows: COM* (e.g., COM1, COM3)
/// - Linux: /dev/ttyUSB*, /dev/ttyACM*
/// - macOS: /dev/cu.usbserial-*, /dev/cu.usbmodem*
pub fn list_ports() -> Result<Vec<SerialPortInfo>> {
    let ports = serialport::available_ports().map_err(|e| {
        tracing::error!("Failed to enumerate serial ports: {}", e);
        ConnectionError::EnumerationFailed {
            reason: e.to_string(),
        }
    })?;

    let infos = ports
        .iter()
        .filter(|port| is_printer_port(&port.port_name))
        .map(|port| {
            let mut info = SerialPortInfo::new(&port.port_name, describe_port(port));
            if let serialport::SerialPortType::UsbPort(usb) = &port.port_type {
                info.vid = Some(usb.vid);
                info.pid = Some(usb.pid);
                info.manufacturer = usb.manufacturer.clone();
                info.serial_number = usb.serial_number.clone();
            }
            info
        })
        .collect();

    Ok(infos)
}

/// Pick a port to use when none is configured
///
/// USB-CDC ports (`ttyACM`, `usbmodem`) are preferred since most 32-bit
/// printer boards enumerate that way; otherwise the first candidate wins.
pub fn pick_default_port() -> Result<String> {
    let ports = list_ports()?;
    let preferred = ports
        .iter()
        .find(|p| p.port_name.contains("ACM") || p.port_name.contains("usbmodem"))
        .or_else(|| ports.first());
    match preferred {
        Some(info) => {
            tracing::info!("Auto-selected port {} ({})", info.port_name, info.description);
            Ok(info.port_name.clone())
        }
        None => Err(ConnectionError::NoPortAvailable.into()),
    }
}

/// Check if a port name matches printer control board patterns
fn is_printer_port(port_name: &str) -> bool {
    // Windows COM ports
    if port_name.starts_with("COM") && port_name[3..].chars().all(|c| c.is_ascii_digit()) {
        return true;
    }

    // Linux USB and ACM devices
    if port_name.starts_with("/dev/ttyUSB") || port_name.starts_with("/dev/ttyACM") {
        return true;
    }

    // macOS serial and modem devices
    if port_name.starts_with("/dev/cu.usbserial-") || port_name.starts_with("/dev/cu.usbmodem") {
        return true;
    }

    false
}

/// A user-friendly description for a port
fn describe_port(port: &serialport::SerialPortInfo) -> String {
    match &port.port_type {
        serialport::SerialPortType::UsbPort(usb) => {
            format!(
                "USB {} {}",
                usb.manufacturer.as_deref().unwrap_or("Device"),
                usb.product.as_deref().unwrap_or("Serial Port")
            )
        }
        serialport::SerialPortType::BluetoothPort => "Bluetooth Serial".to_string(),
        serialport::SerialPortType::PciPort => "PCI Serial".to_string(),
        _ => "Serial Port".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_printer_port_patterns() {
        assert!(is_printer_port("COM3"));
        assert!(is_printer_port("/dev/ttyACM0"));
        assert!(is_printer_port("/dev/ttyUSB1"));
        assert!(is_printer_port("/dev/cu.usbmodem14201"));
        assert!(!is_printer_port("/dev/ttyS0"));
        assert!(!is_printer_port("COMX"));
        assert!(!is_printer_port("/dev/random"));
    }
}
