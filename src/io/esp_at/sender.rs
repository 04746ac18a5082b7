// src/io/esp_at/sender.rs
//
// Chunked outbound sender.
//
// The device buffers at most TX_SEGMENT_SIZE bytes per AT+CIPSEND, so a
// response is sent as a series of segments, each one a three-step exchange:
//   AT+CIPSEND=<id>,<len>   ->  ">"
//   <len raw bytes>         ->  "SEND OK"
// Any failed step abandons the remaining segments and closes the socket, so
// no socket is left half-sent.

use super::command::AtCommand;
use super::engine::AtEngine;
use super::reply::ReplyToken;
use crate::io::{Clock, IoError, Transport};

/// Largest segment accepted by one AT+CIPSEND
pub const TX_SEGMENT_SIZE: usize = 2048;

/// Number of payload bytes shown when tracing a segment
const TRACE_PREVIEW: usize = 16;

/// Public entry point for transmitting on a socket.
///
/// Implemented by the engine and handed to custom-content producers.
pub trait ResponseSink {
    /// Send `data` on `slot`, closing the socket afterwards if `close` is set.
    ///
    /// Returns false when any segment failed; the socket has then been closed.
    fn send_data(&mut self, slot: usize, data: &[u8], close: bool) -> Result<bool, IoError>;
}

impl<T: Transport, C: Clock> AtEngine<T, C> {
    pub fn send_data(&mut self, slot: usize, data: &[u8], close: bool) -> Result<bool, IoError> {
        let previous = self.interpreter.reply.set_active_slot(Some(slot));
        let result = self.send_segments(slot, data, close);
        self.interpreter.reply.set_active_slot(previous);
        result
    }

    fn send_segments(&mut self, slot: usize, data: &[u8], close: bool) -> Result<bool, IoError> {
        let mut delivered = true;

        for segment in data.chunks(TX_SEGMENT_SIZE) {
            if !self.interpreter.sockets.is_connected(slot) {
                tlog!("[esp_at] Socket {}: closed by peer, abandoning response", slot);
                delivered = false;
                break;
            }

            let begin = AtCommand::BeginSend {
                slot,
                len: segment.len(),
            };
            if !self.send_command(&begin, ReplyToken::SendPrompt)?.is_success() {
                tlog!("[esp_at] Socket {}: no send prompt, abandoning response", slot);
                delivered = false;
                break;
            }

            if self.trace {
                let preview = &segment[..segment.len().min(TRACE_PREVIEW)];
                tlog!(
                    "[esp_at] Socket {}: {} bytes [{}...]",
                    slot,
                    segment.len(),
                    hex::encode(preview)
                );
            }
            self.transport.write_all(segment)?;
            self.transport.flush()?;

            if !self.wait_reply(ReplyToken::SendComplete)?.is_success() {
                tlog!("[esp_at] Socket {}: segment not acknowledged, abandoning response", slot);
                delivered = false;
                break;
            }
        }

        if close || !delivered {
            self.send_command(&AtCommand::Close(slot), ReplyToken::Ok)?;
        }
        Ok(delivered)
    }
}

impl<T: Transport, C: Clock> ResponseSink for AtEngine<T, C> {
    fn send_data(&mut self, slot: usize, data: &[u8], close: bool) -> Result<bool, IoError> {
        AtEngine::send_data(self, slot, data, close)
    }
}
