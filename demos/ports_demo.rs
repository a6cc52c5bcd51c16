//! Lists serial ports and picks the first FTDI adapter

use serial_ack::hardware::{list_ports, select_usb_port, FTDI_VID};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Serial Ports ===\n");

    let ports = list_ports()?;
    if ports.is_empty() {
        println!("No serial ports found");
        return Ok(());
    }

    for (index, port) in ports.iter().enumerate() {
        println!("Dev: {}", index);
        println!("  {}", port);
        if let Some(manufacturer) = &port.manufacturer {
            println!("  Manufacturer: {}", manufacturer);
        }
    }

    match select_usb_port(&ports, FTDI_VID, None) {
        Some(port) => println!("\nFTDI adapter on {}", port.port_name),
        None => println!("\nNo FTDI adapter attached"),
    }
    Ok(())
}
