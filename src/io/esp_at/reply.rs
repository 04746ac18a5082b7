// src/io/esp_at/reply.rs
//
// Reply correlation for the single outstanding AT command.
//
// The device accepts one command at a time, so one global expectation is
// enough: which token is awaited, whether it has been seen, and which socket
// (if any) the command concerns.

/// Reply texts the device sends in answer to a command
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ReplyToken {
    #[default]
    None,
    Ok,
    Ready,
    SendPrompt,
    SendComplete,
    GotIp,
    Error,
    Fail,
    /// Either ERROR or FAIL
    GenericNotOk,
}

impl ReplyToken {
    /// Canonical reply text
    pub fn text(self) -> &'static str {
        match self {
            ReplyToken::None => "",
            ReplyToken::Ok => "OK",
            ReplyToken::Ready => "ready",
            ReplyToken::SendPrompt => ">",
            ReplyToken::SendComplete => "SEND OK",
            ReplyToken::GotIp => "WIFI GOT IP",
            ReplyToken::Error | ReplyToken::GenericNotOk => "ERROR",
            ReplyToken::Fail => "FAIL",
        }
    }

    /// Does a complete line satisfy this token?
    pub fn matches_line(self, line: &str) -> bool {
        match self {
            ReplyToken::None => false,
            ReplyToken::Ok => line.starts_with("OK"),
            ReplyToken::GenericNotOk => line == "ERROR" || line == "FAIL",
            other => line == other.text(),
        }
    }

    /// Does the token text appear anywhere in raw received bytes?
    pub fn found_in(self, received: &[u8]) -> bool {
        match self {
            ReplyToken::None => true,
            ReplyToken::GenericNotOk => contains(received, b"ERROR") || contains(received, b"FAIL"),
            other => contains(received, other.text().as_bytes()),
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}

/// Progress of the current expectation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ReplyState {
    #[default]
    Pending,
    Matched,
    TimedOut,
}

/// How a reply wait ended, as seen by the caller
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplyOutcome {
    Matched,
    TimedOut,
    /// The socket the command concerned was closed while waiting
    Aborted,
}

impl ReplyOutcome {
    pub fn is_success(self) -> bool {
        self == ReplyOutcome::Matched
    }
}

#[derive(Debug, Default)]
pub struct ReplyCorrelator {
    expected: ReplyToken,
    state: ReplyState,
    active_slot: Option<usize>,
}

impl ReplyCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start waiting for `token`.
    pub fn expect(&mut self, token: ReplyToken) {
        self.expected = token;
        self.state = ReplyState::Pending;
    }

    pub fn expected(&self) -> ReplyToken {
        self.expected
    }

    pub fn state(&self) -> ReplyState {
        self.state
    }

    pub fn is_waiting(&self) -> bool {
        self.expected != ReplyToken::None && self.state == ReplyState::Pending
    }

    /// Offer a received line. Returns true if it satisfied the expectation.
    pub fn offer(&mut self, line: &str) -> bool {
        if self.is_waiting() && self.expected.matches_line(line) {
            self.state = ReplyState::Matched;
            return true;
        }
        false
    }

    pub fn time_out(&mut self) {
        if self.state == ReplyState::Pending {
            self.state = ReplyState::TimedOut;
        }
    }

    /// Back to "nothing expected", ready for the next command.
    pub fn reset(&mut self) {
        self.expected = ReplyToken::None;
    }

    pub fn active_slot(&self) -> Option<usize> {
        self.active_slot
    }

    /// Set the socket the next commands concern, returning the previous one.
    pub fn set_active_slot(&mut self, slot: Option<usize>) -> Option<usize> {
        std::mem::replace(&mut self.active_slot, slot)
    }
}
