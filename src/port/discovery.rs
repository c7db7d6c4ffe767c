//! Serial port enumeration.

use super::error::PortError;
use serde::Serialize;

/// A port offered to the user for selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortInfo {
    /// Name passed to [`crate::session::SerialSession::init`].
    pub name: String,
    /// Human-readable description, when the platform reports one.
    pub description: Option<String>,
}

/// List serial ports that can host a target board.
///
/// On macOS only `usbserial` devices are offered since the built-in ports
/// there are never a Propeller link.
pub fn available_ports() -> Result<Vec<PortInfo>, PortError> {
    let ports = serialport::available_ports()?;
    let infos: Vec<PortInfo> = ports
        .into_iter()
        .map(|p| PortInfo {
            description: describe(&p.port_type),
            name: p.port_name,
        })
        .filter(|info| offered(&info.name))
        .collect();

    tracing::debug!(count = infos.len(), "enumerated serial ports");
    Ok(infos)
}

fn describe(port_type: &serialport::SerialPortType) -> Option<String> {
    match port_type {
        serialport::SerialPortType::UsbPort(usb) => Some(match (&usb.manufacturer, &usb.product) {
            (Some(m), Some(p)) => format!("{m} {p} ({:04x}:{:04x})", usb.vid, usb.pid),
            (Some(m), None) => format!("{m} ({:04x}:{:04x})", usb.vid, usb.pid),
            (None, Some(p)) => format!("{p} ({:04x}:{:04x})", usb.vid, usb.pid),
            (None, None) => format!("USB {:04x}:{:04x}", usb.vid, usb.pid),
        }),
        serialport::SerialPortType::BluetoothPort => Some("Bluetooth".to_string()),
        serialport::SerialPortType::PciPort => Some("PCI".to_string()),
        serialport::SerialPortType::Unknown => None,
    }
}

#[cfg(target_os = "macos")]
fn offered(name: &str) -> bool {
    name.contains("usbserial")
}

#[cfg(not(target_os = "macos"))]
fn offered(_name: &str) -> bool {
    true
}
