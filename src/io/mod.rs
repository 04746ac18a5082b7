// src/io/mod.rs
//
// Transport layer for the AT engine.
//
// The engine never touches a serial port directly. It talks to a `Transport`
// (non-blocking byte source/sink) and measures time through a `Clock`, so the
// same code drives real hardware and the scripted mocks used in tests.

pub mod console;
pub mod error;
pub mod esp_at;
pub mod serial;

#[cfg(test)]
pub(crate) mod mock;

use std::time::Instant;

pub use error::IoError;

// ============================================================================
// Traits
// ============================================================================

/// Byte-oriented, half-duplex link to a device (or to the debug console).
pub trait Transport {
    /// Read one byte if one is already buffered. Never blocks.
    fn read_byte(&mut self) -> Result<Option<u8>, IoError>;

    /// Write every byte of `data` to the link.
    fn write_all(&mut self, data: &[u8]) -> Result<(), IoError>;

    fn flush(&mut self) -> Result<(), IoError> {
        Ok(())
    }
}

/// Monotonic millisecond clock used for every deadline in the engine.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

// ============================================================================
// System Clock
// ============================================================================

/// Wall clock backed by `std::time::Instant`, counting from construction.
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Milliseconds elapsed since `since`, saturating if the clock is behind.
pub(crate) fn elapsed_ms<C: Clock + ?Sized>(clock: &C, since: u64) -> u64 {
    clock.now_ms().saturating_sub(since)
}
