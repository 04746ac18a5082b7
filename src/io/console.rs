// src/io/console.rs
//
// Standard input as a non-blocking transport, for the debug pass-through.
//
// Stdin has no portable non-blocking read, so a background thread reads it
// and hands bytes over a channel. At end-of-file the thread raises the stop
// flag it was given and exits.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;

use super::{IoError, Transport};

pub struct ConsoleTransport {
    rx: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    pos: usize,
}

impl ConsoleTransport {
    /// Start the stdin reader thread; `on_eof` is set when stdin ends.
    pub fn spawn(on_eof: Arc<AtomicBool>) -> Result<Self, IoError> {
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("console-stdin".to_string())
            .spawn(move || {
                let mut stdin = std::io::stdin();
                let mut buf = [0u8; 256];
                loop {
                    match stdin.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            if tx.send(buf[..n].to_vec()).is_err() {
                                return;
                            }
                        }
                    }
                }
                on_eof.store(true, Ordering::Relaxed);
            })
            .map_err(|e| IoError::connection("stdin", e.to_string()))?;

        Ok(Self::from_receiver(rx))
    }

    fn from_receiver(rx: Receiver<Vec<u8>>) -> Self {
        Self {
            rx,
            pending: Vec::new(),
            pos: 0,
        }
    }
}

impl Transport for ConsoleTransport {
    fn read_byte(&mut self) -> Result<Option<u8>, IoError> {
        if self.pos >= self.pending.len() {
            match self.rx.try_recv() {
                Ok(chunk) => {
                    self.pending = chunk;
                    self.pos = 0;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return Ok(None),
            }
        }

        let byte = self.pending.get(self.pos).copied();
        self.pos += 1;
        Ok(byte)
    }

    /// Echo back to the console
    fn write_all(&mut self, data: &[u8]) -> Result<(), IoError> {
        std::io::stdout()
            .write_all(data)
            .map_err(|e| IoError::write("stdout", e.to_string()))
    }

    fn flush(&mut self) -> Result<(), IoError> {
        std::io::stdout()
            .flush()
            .map_err(|e| IoError::write("stdout", e.to_string()))
    }
}
