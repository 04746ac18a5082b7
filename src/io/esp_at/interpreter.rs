// src/io/esp_at/interpreter.rs
//
// Classification of framed lines received from the device.
//
// Line shapes, first match wins:
//   ""                          empty, no-op
//   <id>,CONNECT                socket opened
//   <id>,CLOSED                 socket closed
//   <expected reply>            completes the in-flight command
//   +IPD,<id>,<len>:<payload>   data received on a socket
//   +...                        other notifications, ignored
//   anything else               noise

use super::framer::{Flow, LineHandler};
use super::reply::{ReplyCorrelator, ReplyToken};
use super::sockets::{DispatchMode, SocketTable};

/// Turns the payload of an inbound data notification into a response mode.
/// Called synchronously while a line is being interpreted; must not block.
pub trait RequestParser {
    fn parse(&mut self, slot: usize, payload: &str) -> DispatchMode;
}

/// What a line turned out to be
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineKind {
    Empty,
    /// `None` when the index was out of range
    Connected(Option<usize>),
    Closed(Option<usize>),
    Reply(ReplyToken),
    Request { slot: usize, mode: DispatchMode },
    /// Data notification rejected: malformed or socket not connected
    Dropped(&'static str),
    Notification,
    Noise,
}

pub struct LineInterpreter {
    pub(crate) sockets: SocketTable,
    pub(crate) reply: ReplyCorrelator,
    /// Socket of the most recent connect or data notification
    rx_slot: Option<usize>,
    /// False while the lines following a request are being skipped
    echo: bool,
    trace: bool,
    parser: Box<dyn RequestParser>,
}

impl LineInterpreter {
    pub fn new(parser: Box<dyn RequestParser>) -> Self {
        Self {
            sockets: SocketTable::new(),
            reply: ReplyCorrelator::new(),
            rx_slot: None,
            echo: true,
            trace: false,
            parser,
        }
    }

    pub fn set_trace(&mut self, trace: bool) {
        self.trace = trace;
    }

    pub fn rx_slot(&self) -> Option<usize> {
        self.rx_slot
    }

    /// Whether received lines are currently echoed to the log
    pub fn echo(&self) -> bool {
        self.echo
    }

    pub fn interpret(&mut self, line: &str) -> LineKind {
        if line.is_empty() {
            // End of a request's header block
            if self.rx_slot.is_some() {
                self.echo = true;
            }
            return LineKind::Empty;
        }

        let bytes = line.as_bytes();
        if bytes.len() > 1 && bytes[1] == b',' {
            return self.socket_event(bytes[0], &line[2..]);
        }

        if self.reply.offer(line) {
            return LineKind::Reply(self.reply.expected());
        }

        if let Some(rest) = line.strip_prefix('+') {
            return self.notification(rest);
        }

        LineKind::Noise
    }

    fn socket_event(&mut self, id: u8, event: &str) -> LineKind {
        let index = (id as char).to_digit(10).map(|d| d as usize);
        match event {
            "CONNECT" => match index.filter(|&i| SocketTable::in_range(i)) {
                Some(i) => {
                    self.sockets.connect(i);
                    self.rx_slot = Some(i);
                    tlog!("[esp_at] Socket {} connected", i);
                    LineKind::Connected(Some(i))
                }
                None => {
                    self.rx_slot = None;
                    tlog!("[esp_at] Connect on invalid socket '{}'", id as char);
                    LineKind::Connected(None)
                }
            },
            "CLOSED" => {
                if index.is_some() && index == self.rx_slot {
                    self.rx_slot = None;
                }
                match index.filter(|&i| SocketTable::in_range(i)) {
                    Some(i) => {
                        self.sockets.close(i);
                        tlog!("[esp_at] Socket {} closed", i);
                        LineKind::Closed(Some(i))
                    }
                    None => {
                        tlog!("[esp_at] Close on invalid socket '{}'", id as char);
                        LineKind::Closed(None)
                    }
                }
            }
            _ => LineKind::Noise,
        }
    }

    fn notification(&mut self, body: &str) -> LineKind {
        // tag, socket id, length, then the payload with its own delimiters intact
        let mut fields = body.splitn(4, [',', ':']);
        if !fields.next().is_some_and(|tag| tag.starts_with("IPD")) {
            return LineKind::Notification;
        }

        let Some(slot_text) = fields.next() else {
            tlog!("[esp_at] Dropping +IPD: missing socket id");
            return LineKind::Dropped("missing socket id");
        };
        let Ok(slot) = slot_text.trim().parse::<usize>() else {
            tlog!("[esp_at] Dropping +IPD: bad socket id '{}'", slot_text);
            return LineKind::Dropped("bad socket id");
        };
        if SocketTable::in_range(slot) {
            self.rx_slot = Some(slot);
        }
        if !self.sockets.is_connected(slot) {
            tlog!("[esp_at] Dropping +IPD: socket {} not connected", slot);
            return LineKind::Dropped("socket not connected");
        }

        let Some(length_text) = fields.next() else {
            tlog!("[esp_at] Dropping +IPD: missing data length");
            return LineKind::Dropped("missing data length");
        };
        let payload = match fields.next() {
            Some(p) if !p.is_empty() => p,
            _ => {
                tlog!("[esp_at] Dropping +IPD: missing payload");
                return LineKind::Dropped("missing payload");
            }
        };
        // The declared length covers the whole request, not just this line
        if self.trace {
            tlog!(
                "[esp_at] +IPD socket {} declares {} bytes",
                slot,
                length_text.trim().parse::<usize>().unwrap_or(0)
            );
        }

        let mode = self.parser.parse(slot, payload);
        self.sockets.set_pending(slot, mode);
        self.echo = false;
        LineKind::Request { slot, mode }
    }
}

impl LineHandler for LineInterpreter {
    fn handle_line(&mut self, line: &[u8]) -> Flow {
        let text = String::from_utf8_lossy(line);
        if self.trace && self.echo && !text.is_empty() {
            tlog!("[esp_at] rx: {}", text);
        }
        self.interpret(&text);
        if self.echo {
            Flow::Continue
        } else {
            Flow::Yield
        }
    }
}
