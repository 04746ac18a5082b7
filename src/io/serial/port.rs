// src/io/serial/port.rs
//
// Serial link to the ESP8266.
//
// The port is opened with a 1 ms timeout and only read when the driver
// reports buffered bytes, so `read_byte` never blocks the control loop.

use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serialport::SerialPort;

use super::utils::{
    parity_letter, parity_str_to_serialport, to_serialport_data_bits, to_serialport_stop_bits,
};
use crate::io::{IoError, Transport};
use crate::settings::SerialSettings;

/// Upper bound on a single driver read
const READ_CHUNK: usize = 256;

/// A port as shown by `--list-ports`
#[derive(Clone, Debug)]
pub struct SerialPortInfo {
    pub port_name: String,
    pub port_type: &'static str,
    pub product: Option<String>,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
}

impl From<serialport::SerialPortInfo> for SerialPortInfo {
    fn from(port: serialport::SerialPortInfo) -> Self {
        let mut info = SerialPortInfo {
            port_name: port.port_name,
            port_type: "Unknown",
            product: None,
            vid: None,
            pid: None,
        };
        match port.port_type {
            serialport::SerialPortType::UsbPort(usb) => {
                info.port_type = "USB";
                info.product = usb.product;
                info.vid = Some(usb.vid);
                info.pid = Some(usb.pid);
            }
            serialport::SerialPortType::BluetoothPort => info.port_type = "Bluetooth",
            serialport::SerialPortType::PciPort => info.port_type = "PCI",
            serialport::SerialPortType::Unknown => {}
        }
        info
    }
}

pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    name: String,
    rx: VecDeque<u8>,
}

impl SerialTransport {
    pub fn open(settings: &SerialSettings) -> Result<Self, IoError> {
        if settings.port.trim().is_empty() {
            return Err(IoError::configuration("no serial port given"));
        }

        let parity = parity_str_to_serialport(&settings.parity);
        let port = serialport::new(&settings.port, settings.baud_rate)
            .data_bits(to_serialport_data_bits(settings.data_bits))
            .stop_bits(to_serialport_stop_bits(settings.stop_bits))
            .parity(parity)
            .timeout(Duration::from_millis(1))
            .open()
            .map_err(|e| IoError::connection(&settings.port, e.to_string()))?;

        tlog!(
            "[serial] Opened {} at {} baud ({}-{}-{})",
            settings.port,
            settings.baud_rate,
            settings.data_bits,
            parity_letter(parity),
            settings.stop_bits
        );

        Ok(Self {
            port,
            name: settings.port.clone(),
            rx: VecDeque::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn fill(&mut self) -> Result<(), IoError> {
        let available = self
            .port
            .bytes_to_read()
            .map_err(|e| IoError::read(&self.name, e.to_string()))? as usize;
        if available == 0 {
            return Ok(());
        }

        let mut buf = [0u8; READ_CHUNK];
        let want = available.min(READ_CHUNK);
        match self.port.read(&mut buf[..want]) {
            Ok(n) => {
                self.rx.extend(&buf[..n]);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => Ok(()),
            Err(e) => Err(IoError::read(&self.name, e.to_string())),
        }
    }
}

impl Transport for SerialTransport {
    fn read_byte(&mut self) -> Result<Option<u8>, IoError> {
        if self.rx.is_empty() {
            self.fill()?;
        }
        Ok(self.rx.pop_front())
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), IoError> {
        self.port
            .write_all(data)
            .map_err(|e| IoError::write(&self.name, e.to_string()))
    }

    fn flush(&mut self) -> Result<(), IoError> {
        self.port
            .flush()
            .map_err(|e| IoError::write(&self.name, e.to_string()))
    }
}

/// macOS lists every device twice; the /dev/tty.* twin waits for carrier.
fn is_dial_in_twin(name: &str) -> bool {
    cfg!(target_os = "macos") && name.starts_with("/dev/tty.")
}

/// Ports the ESP8266 could be attached to
pub fn list_serial_ports() -> Result<Vec<SerialPortInfo>, String> {
    let ports =
        serialport::available_ports().map_err(|e| format!("Failed to enumerate ports: {}", e))?;
    Ok(ports
        .into_iter()
        .filter(|p| !is_dial_in_twin(&p.port_name))
        .map(SerialPortInfo::from)
        .collect())
}
