//! Serial port enumeration

use crate::hardware::{CommError, CommResult};
use log::debug;
use serde::{Deserialize, Serialize};
use serialport::SerialPortType;
use std::fmt;

/// FTDI's USB vendor id
pub const FTDI_VID: u16 = 0x0403;

/// Bus a port is attached through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortKind {
    Usb,
    Pci,
    Bluetooth,
    Unknown,
}

/// Description of one serial port present on the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortInfo {
    pub port_name: String,
    pub kind: PortKind,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

impl PortInfo {
    fn from_serialport(info: serialport::SerialPortInfo) -> Self {
        let mut port = PortInfo {
            port_name: info.port_name,
            kind: PortKind::Unknown,
            vid: None,
            pid: None,
            serial_number: None,
            manufacturer: None,
            product: None,
        };

        match info.port_type {
            SerialPortType::UsbPort(usb) => {
                port.kind = PortKind::Usb;
                port.vid = Some(usb.vid);
                port.pid = Some(usb.pid);
                port.serial_number = usb.serial_number;
                port.manufacturer = usb.manufacturer;
                port.product = usb.product;
            }
            SerialPortType::PciPort => port.kind = PortKind::Pci,
            SerialPortType::BluetoothPort => port.kind = PortKind::Bluetooth,
            SerialPortType::Unknown => {}
        }

        port
    }

    pub fn is_usb_device(&self, vid: u16, pid: Option<u16>) -> bool {
        self.vid == Some(vid) && pid.map_or(true, |pid| self.pid == Some(pid))
    }
}

impl fmt::Display for PortInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.port_name)?;
        match (self.vid, self.pid) {
            (Some(vid), Some(pid)) => write!(f, " [USB {:04x}:{:04x}]", vid, pid)?,
            _ => write!(f, " [{:?}]", self.kind)?,
        }
        if let Some(product) = &self.product {
            write!(f, " {}", product)?;
        }
        if let Some(serial) = &self.serial_number {
            write!(f, " (serial {})", serial)?;
        }
        Ok(())
    }
}

/// List every serial port the OS knows about
pub fn list_ports() -> CommResult<Vec<PortInfo>> {
    let ports = serialport::available_ports().map_err(|e| CommError::Enumeration {
        reason: e.to_string(),
    })?;

    debug!("Found {} serial port(s)", ports.len());
    Ok(ports.into_iter().map(PortInfo::from_serialport).collect())
}

/// First port in `ports` matching a USB vendor id and optional product id
pub fn select_usb_port(ports: &[PortInfo], vid: u16, pid: Option<u16>) -> Option<&PortInfo> {
    ports.iter().find(|port| port.is_usb_device(vid, pid))
}

/// Name of the first attached port matching the USB ids
pub fn find_usb_port(vid: u16, pid: Option<u16>) -> CommResult<Option<String>> {
    let ports = list_ports()?;
    Ok(select_usb_port(&ports, vid, pid).map(|port| port.port_name.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usb_port(name: &str, vid: u16, pid: u16) -> PortInfo {
        PortInfo {
            port_name: name.to_string(),
            kind: PortKind::Usb,
            vid: Some(vid),
            pid: Some(pid),
            serial_number: Some("FT8J2K1A".to_string()),
            manufacturer: Some("FTDI".to_string()),
            product: Some("C232HM-DDHSL-0".to_string()),
        }
    }

    #[test]
    fn test_select_usb_port() {
        let ports = vec![
            PortInfo {
                port_name: "/dev/ttyS0".to_string(),
                kind: PortKind::Unknown,
                vid: None,
                pid: None,
                serial_number: None,
                manufacturer: None,
                product: None,
            },
            usb_port("/dev/ttyUSB0", 0x10c4, 0xea60),
            usb_port("/dev/ttyUSB1", FTDI_VID, 0x6014),
        ];

        let found = select_usb_port(&ports, FTDI_VID, None).unwrap();
        assert_eq!(found.port_name, "/dev/ttyUSB1");
        assert!(select_usb_port(&ports, FTDI_VID, Some(0x6001)).is_none());
    }

    #[test]
    fn test_port_display() {
        let port = usb_port("COM11", FTDI_VID, 0x6014);
        assert_eq!(
            port.to_string(),
            "COM11 [USB 0403:6014] C232HM-DDHSL-0 (serial FT8J2K1A)"
        );
    }

    #[test]
    fn test_find_agrees_with_listing() {
        // Enumeration may be unavailable in sandboxed environments
        if let Ok(ports) = list_ports() {
            let expected = select_usb_port(&ports, FTDI_VID, None).map(|p| p.port_name.clone());
            assert_eq!(find_usb_port(FTDI_VID, None).unwrap(), expected);
        }
    }
}
