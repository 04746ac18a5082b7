// src/io/serial/mod.rs
//
// Serial port transport for the AT engine.

pub mod port;
pub(crate) mod utils;

pub use port::{list_serial_ports, SerialPortInfo, SerialTransport};
