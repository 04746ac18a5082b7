// src/io/esp_at/framer.rs
//
// Timed line framer for the AT link.
//
// Bytes are consumed in bursts: a burst starts with the first available byte
// and lasts while further bytes keep arriving within CHAR_GAP_MS of each other.
// In line mode every CR or LF closes the current line and hands it to a
// `LineHandler`. In raw mode (device bring-up) bytes simply accumulate so the
// best-effort reply wait can search them.

use crate::io::{elapsed_ms, Clock, IoError, Transport};

// ============================================================================
// Constants
// ============================================================================

/// Capacity of the shared line buffer
pub const LINE_CAPACITY: usize = 1024;

/// Maximum gap between two characters of the same burst
pub const CHAR_GAP_MS: u64 = 2;

/// Prompt the device sends (without a line ending) before accepting send data
const SEND_PROMPT: u8 = b'>';

// ============================================================================
// Types
// ============================================================================

/// How received bytes are treated
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FramerMode {
    /// No line interpretation, bytes are accumulated for substring search
    Raw,
    /// Normal operation, complete lines go to the interpreter
    Line,
}

/// What the framer should do after handing over a line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Keep draining the transport
    Continue,
    /// Stop consuming for this poll, remaining bytes are read on the next one
    Yield,
}

/// Receives every completed line in line mode.
pub trait LineHandler {
    fn handle_line(&mut self, line: &[u8]) -> Flow;
}

/// Fixed-capacity byte buffer with a bounds-checked write cursor.
pub struct LineBuffer {
    data: [u8; LINE_CAPACITY],
    len: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self {
            data: [0; LINE_CAPACITY],
            len: 0,
        }
    }

    /// Append a byte. Returns false (and stores nothing) when full.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.len >= LINE_CAPACITY {
            return false;
        }
        self.data[self.len] = byte;
        self.len += 1;
        true
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Framer
// ============================================================================

pub struct Framer {
    mode: FramerMode,
    line: LineBuffer,
    /// Set after an overflow until the next terminator
    discarding: bool,
}

impl Framer {
    pub fn new(mode: FramerMode) -> Self {
        Self {
            mode,
            line: LineBuffer::new(),
            discarding: false,
        }
    }

    pub fn mode(&self) -> FramerMode {
        self.mode
    }

    /// Switch mode. Whatever was buffered belongs to the old mode and is dropped.
    pub fn set_mode(&mut self, mode: FramerMode) {
        if self.mode != mode {
            self.mode = mode;
            self.reset();
        }
    }

    /// Bytes accumulated since the last reset (raw mode), or the partial line.
    pub fn buffered(&self) -> &[u8] {
        self.line.as_bytes()
    }

    pub fn reset(&mut self) {
        self.line.clear();
        self.discarding = false;
    }

    /// Consume one burst from the transport.
    ///
    /// Returns immediately when nothing is available. Otherwise reads until the
    /// link has been idle for CHAR_GAP_MS, or until the handler asks to yield.
    /// Returns the number of bytes consumed.
    pub fn poll<T, C, H>(&mut self, transport: &mut T, clock: &C, handler: &mut H) -> Result<usize, IoError>
    where
        T: Transport + ?Sized,
        C: Clock + ?Sized,
        H: LineHandler + ?Sized,
    {
        let mut next = transport.read_byte()?;
        if next.is_none() {
            return Ok(0);
        }

        let mut consumed = 0;
        let mut last_rx = clock.now_ms();
        loop {
            if let Some(byte) = next {
                last_rx = clock.now_ms();
                consumed += 1;
                if self.accept(byte, handler) == Flow::Yield {
                    break;
                }
            } else if elapsed_ms(clock, last_rx) >= CHAR_GAP_MS {
                break;
            }
            next = transport.read_byte()?;
        }
        Ok(consumed)
    }

    /// Feed a single byte through the framing rules.
    pub fn accept<H: LineHandler + ?Sized>(&mut self, byte: u8, handler: &mut H) -> Flow {
        match self.mode {
            FramerMode::Raw => {
                if byte >= b' ' {
                    // Full buffer: the cursor stays put and the byte is lost
                    let _ = self.line.push(byte);
                }
                Flow::Continue
            }
            FramerMode::Line => self.accept_line_byte(byte, handler),
        }
    }

    fn accept_line_byte<H: LineHandler + ?Sized>(&mut self, byte: u8, handler: &mut H) -> Flow {
        let terminator = match byte {
            b'\r' | b'\n' => true,
            // "> " arrives without a line ending
            b' ' if self.line.as_bytes() == [SEND_PROMPT] => true,
            b if b < b' ' => return Flow::Continue,
            _ => false,
        };

        if terminator {
            if self.discarding {
                self.discarding = false;
                self.line.clear();
                return Flow::Continue;
            }
            return self.emit(handler);
        }

        if self.discarding {
            return Flow::Continue;
        }

        if self.line.push(byte) {
            return Flow::Continue;
        }

        tlog!(
            "[framer] Line exceeds {} bytes, truncating and discarding the rest",
            LINE_CAPACITY
        );
        let flow = self.emit(handler);
        self.discarding = true;
        flow
    }

    fn emit<H: LineHandler + ?Sized>(&mut self, handler: &mut H) -> Flow {
        let flow = handler.handle_line(self.line.as_bytes());
        self.line.clear();
        flow
    }
}
