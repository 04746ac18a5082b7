// src/io/error.rs
//
// Error type shared by the transport drivers.
//
// Only transport and configuration failures are errors. A reply that never
// arrives is an ordinary protocol outcome and is reported as a ReplyOutcome.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    /// Port could not be opened or went away
    #[error("{device}: connection failed: {message}")]
    Connection { device: String, message: String },

    #[error("{device}: read failed: {message}")]
    Read { device: String, message: String },

    #[error("{device}: write failed: {message}")]
    Write { device: String, message: String },

    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl IoError {
    pub fn connection(device: impl Into<String>, message: impl Into<String>) -> Self {
        IoError::Connection {
            device: device.into(),
            message: message.into(),
        }
    }

    pub fn read(device: impl Into<String>, message: impl Into<String>) -> Self {
        IoError::Read {
            device: device.into(),
            message: message.into(),
        }
    }

    pub fn write(device: impl Into<String>, message: impl Into<String>) -> Self {
        IoError::Write {
            device: device.into(),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        IoError::Configuration(message.into())
    }
}
