// src/io/esp_at/scheduler.rs
//
// Transmit scheduler: one pass over the socket table per control-loop tick,
// sending whatever response each connected socket has pending.

use super::engine::AtEngine;
use super::sender::ResponseSink;
use super::sockets::{DispatchMode, MAX_SOCKETS};
use crate::http::content::{HEADER_HTML, HEADER_ICON, HEADER_NOT_FOUND};
use crate::io::{Clock, IoError, Transport};

/// Application hook that answers `DispatchMode::Custom` requests.
///
/// The generic 200 header has already been sent when `produce` is called.
/// The producer is responsible for closing the socket (pass `close = true`
/// on its last `send_data`).
pub trait CustomContent {
    fn produce(&mut self, slot: usize, sink: &mut dyn ResponseSink) -> Result<(), IoError>;
}

impl<T: Transport, C: Clock> AtEngine<T, C> {
    /// Send pending responses, lowest socket first.
    ///
    /// The pending mode is cleared before sending, so a request arriving
    /// while the response is in flight is kept for the next pass.
    pub fn service_sockets(&mut self) -> Result<(), IoError> {
        for slot in 0..MAX_SOCKETS {
            if !self.interpreter.sockets.is_connected(slot) {
                self.interpreter.sockets.take_pending(slot);
                continue;
            }

            let mode = self.interpreter.sockets.take_pending(slot);
            if mode == DispatchMode::None {
                continue;
            }

            if mode > DispatchMode::Favicon {
                tlog!("[esp_at] Tx {}: OK header", slot);
                if !self.send_data(slot, HEADER_HTML, false)? {
                    continue;
                }
            }

            match mode {
                DispatchMode::Favicon => {
                    tlog!("[esp_at] Tx {}: favicon", slot);
                    if self.send_data(slot, HEADER_ICON, false)? {
                        let icon = self.content.favicon();
                        self.send_data(slot, &icon, true)?;
                    }
                }
                DispatchMode::IndexPage => {
                    tlog!("[esp_at] Tx {}: index page", slot);
                    let page = self.content.index_page();
                    self.send_data(slot, &page, true)?;
                }
                DispatchMode::Custom => self.produce_custom(slot)?,
                DispatchMode::NotFound | DispatchMode::None => {
                    tlog!("[esp_at] Tx {}: not found", slot);
                    self.send_data(slot, HEADER_NOT_FOUND, true)?;
                }
            }
        }
        Ok(())
    }

    fn produce_custom(&mut self, slot: usize) -> Result<(), IoError> {
        if !self.interpreter.sockets.is_connected(slot) {
            tlog!("[esp_at] Tx {}: closed before custom content", slot);
            return Ok(());
        }
        let Some(mut producer) = self.custom.take() else {
            tlog!("[esp_at] Tx {}: custom request with no content producer", slot);
            return Ok(());
        };
        tlog!("[esp_at] Tx {}: custom content", slot);
        let result = producer.produce(slot, self);
        self.custom = Some(producer);
        result
    }
}
