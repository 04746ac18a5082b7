// src/io/serial/utils.rs
//
// Conversion functions from configuration values to the serialport crate's
// types.

use serialport::{DataBits, Parity, StopBits};

/// Convert a parity string ("none", "odd", "even") to serialport crate's Parity type
pub fn parity_str_to_serialport(s: &str) -> Parity {
    match s.to_lowercase().as_str() {
        "odd" => Parity::Odd,
        "even" => Parity::Even,
        _ => Parity::None,
    }
}

/// Short form used in log lines: 'N', 'O' or 'E'
pub fn parity_letter(p: Parity) -> char {
    match p {
        Parity::None => 'N',
        Parity::Odd => 'O',
        Parity::Even => 'E',
    }
}

/// Convert data bits count to serialport crate's DataBits type
pub fn to_serialport_data_bits(bits: u8) -> DataBits {
    match bits {
        5 => DataBits::Five,
        6 => DataBits::Six,
        7 => DataBits::Seven,
        _ => DataBits::Eight,
    }
}

/// Convert stop bits count to serialport crate's StopBits type
pub fn to_serialport_stop_bits(bits: u8) -> StopBits {
    match bits {
        2 => StopBits::Two,
        _ => StopBits::One,
    }
}
