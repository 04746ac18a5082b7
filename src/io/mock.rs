// src/io/mock.rs
//
// Scripted transport and stepping clock for unit tests.
//
// `StepClock` advances one millisecond every time it is read, which makes the
// 2 ms framing gap and the 5 s reply deadline finite and deterministic.
// `MockTransport` answers written commands from a list of scripted rules.

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use super::{Clock, IoError, Transport};

// ============================================================================
// Clock
// ============================================================================

#[derive(Clone, Debug)]
pub(crate) struct StepClock {
    now: Rc<Cell<u64>>,
}

impl StepClock {
    pub(crate) fn new() -> Self {
        Self::starting_at(0)
    }

    pub(crate) fn starting_at(ms: u64) -> Self {
        Self {
            now: Rc::new(Cell::new(ms)),
        }
    }

    /// Current time without advancing
    pub(crate) fn peek(&self) -> u64 {
        self.now.get()
    }
}

impl Clock for StepClock {
    fn now_ms(&self) -> u64 {
        let t = self.now.get();
        self.now.set(t + 1);
        t
    }
}

// ============================================================================
// Transport
// ============================================================================

enum Trigger {
    /// Write starting with this text
    Command(Vec<u8>),
    /// Any write that is not an AT command (segment payload)
    Payload,
}

struct Rule {
    trigger: Trigger,
    response: Vec<u8>,
    repeat: bool,
}

impl Rule {
    fn matches(&self, data: &[u8]) -> bool {
        match &self.trigger {
            Trigger::Command(prefix) => data.starts_with(prefix),
            Trigger::Payload => !data.starts_with(b"AT"),
        }
    }
}

pub(crate) struct MockTransport {
    clock: StepClock,
    incoming: VecDeque<(u64, u8)>,
    rules: Vec<Rule>,
    writes: Vec<Vec<u8>>,
    fail_writes: bool,
}

impl MockTransport {
    pub(crate) fn new(clock: &StepClock) -> Self {
        Self {
            clock: clock.clone(),
            incoming: VecDeque::new(),
            rules: Vec::new(),
            writes: Vec::new(),
            fail_writes: false,
        }
    }

    /// Queue bytes that are readable immediately.
    pub(crate) fn push_incoming(&mut self, bytes: &[u8]) {
        let now = self.clock.peek();
        self.push_incoming_at(now, bytes);
    }

    /// Queue bytes that become readable once the clock reaches `due_ms`.
    pub(crate) fn push_incoming_at(&mut self, due_ms: u64, bytes: &[u8]) {
        self.incoming.extend(bytes.iter().map(|&b| (due_ms, b)));
    }

    /// Answer the next write starting with `prefix` once.
    pub(crate) fn reply_to(&mut self, prefix: &str, response: &str) {
        self.add_rule(Trigger::Command(prefix.as_bytes().to_vec()), response, false);
    }

    /// Answer every write starting with `prefix`.
    pub(crate) fn always_reply_to(&mut self, prefix: &str, response: &str) {
        self.add_rule(Trigger::Command(prefix.as_bytes().to_vec()), response, true);
    }

    /// Answer the next raw payload write once.
    pub(crate) fn reply_to_payload(&mut self, response: &str) {
        self.add_rule(Trigger::Payload, response, false);
    }

    /// Answer every raw payload write.
    pub(crate) fn always_reply_to_payload(&mut self, response: &str) {
        self.add_rule(Trigger::Payload, response, true);
    }

    pub(crate) fn fail_writes(&mut self) {
        self.fail_writes = true;
    }

    fn add_rule(&mut self, trigger: Trigger, response: &str, repeat: bool) {
        self.rules.push(Rule {
            trigger,
            response: response.as_bytes().to_vec(),
            repeat,
        });
    }

    /// AT commands written so far, without their line terminator
    pub(crate) fn commands(&self) -> Vec<String> {
        self.writes
            .iter()
            .filter(|w| w.starts_with(b"AT"))
            .map(|w| String::from_utf8_lossy(w).trim_end().to_string())
            .collect()
    }

    /// Raw (non-command) writes in order
    pub(crate) fn payloads(&self) -> Vec<Vec<u8>> {
        self.writes
            .iter()
            .filter(|w| !w.starts_with(b"AT"))
            .cloned()
            .collect()
    }

    pub(crate) fn written(&self) -> Vec<u8> {
        self.writes.concat()
    }

    pub(crate) fn pending_incoming(&self) -> usize {
        self.incoming.len()
    }
}

impl Transport for MockTransport {
    fn read_byte(&mut self) -> Result<Option<u8>, IoError> {
        match self.incoming.front() {
            Some(&(due, byte)) if due <= self.clock.peek() => {
                self.incoming.pop_front();
                Ok(Some(byte))
            }
            _ => Ok(None),
        }
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), IoError> {
        if self.fail_writes {
            return Err(IoError::write("mock", "port unplugged"));
        }
        self.writes.push(data.to_vec());

        if let Some(pos) = self.rules.iter().position(|r| r.matches(data)) {
            let response = if self.rules[pos].repeat {
                self.rules[pos].response.clone()
            } else {
                self.rules.remove(pos).response
            };
            self.push_incoming(&response);
        }
        Ok(())
    }
}
