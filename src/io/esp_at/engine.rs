// src/io/esp_at/engine.rs
//
// The AT engine aggregate and its command/reply driver.
//
// One engine owns the transport, the framer, the interpreter (socket table +
// reply correlator) and the response content. Every wait is a busy poll of the
// framer with an explicit deadline; while a command is in flight the whole
// control loop waits with it, because the device handles one command at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::command::AtCommand;
use super::framer::{Framer, FramerMode};
use super::interpreter::{LineInterpreter, RequestParser};
use super::passthrough;
use super::reply::{ReplyOutcome, ReplyToken};
use super::scheduler::CustomContent;
use super::sockets::SocketTable;
use crate::http::content::StaticContent;
use crate::io::{elapsed_ms, Clock, IoError, Transport};

/// Deadline for any single reply
pub const REPLY_TIMEOUT_MS: u64 = 5_000;

/// Pause between control-loop ticks in `run`
const IDLE_TICK: Duration = Duration::from_millis(1);

pub struct AtEngine<T: Transport, C: Clock> {
    pub(crate) transport: T,
    pub(crate) clock: C,
    pub(crate) framer: Framer,
    pub(crate) interpreter: LineInterpreter,
    pub(crate) content: StaticContent,
    pub(crate) custom: Option<Box<dyn CustomContent>>,
    pub(crate) trace: bool,
}

impl<T: Transport, C: Clock> AtEngine<T, C> {
    /// Engine in line mode with all sockets closed and nothing expected.
    pub fn new(transport: T, clock: C, parser: Box<dyn RequestParser>) -> Self {
        Self {
            transport,
            clock,
            framer: Framer::new(FramerMode::Line),
            interpreter: LineInterpreter::new(parser),
            content: StaticContent::default(),
            custom: None,
            trace: false,
        }
    }

    pub fn with_content(mut self, content: StaticContent) -> Self {
        self.content = content;
        self
    }

    pub fn with_custom_content(mut self, custom: Box<dyn CustomContent>) -> Self {
        self.custom = Some(custom);
        self
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self.interpreter.set_trace(trace);
        self
    }

    pub fn mode(&self) -> FramerMode {
        self.framer.mode()
    }

    pub fn set_mode(&mut self, mode: FramerMode) {
        self.framer.set_mode(mode);
    }

    pub fn sockets(&self) -> &SocketTable {
        &self.interpreter.sockets
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Token currently awaited, `None` between commands
    pub fn expected_reply(&self) -> ReplyToken {
        self.interpreter.reply.expected()
    }

    // ========================================================================
    // Receive path
    // ========================================================================

    /// Consume whatever the device has sent, interpreting complete lines.
    pub fn check_rx(&mut self) -> Result<usize, IoError> {
        self.framer
            .poll(&mut self.transport, &self.clock, &mut self.interpreter)
    }

    // ========================================================================
    // Command/Reply Driver
    // ========================================================================

    /// Send a command and wait for `expect`.
    ///
    /// In line mode this is the blocking, correlated wait; in raw mode (bring-up)
    /// it is the best-effort substring wait.
    pub fn send_command(&mut self, command: &AtCommand, expect: ReplyToken) -> Result<ReplyOutcome, IoError> {
        let text = command.encode();
        if self.trace || self.framer.mode() == FramerMode::Line {
            tlog!("[esp_at] cmd: {}", command.label());
        }
        self.transport.write_all(text.as_bytes())?;
        self.transport.flush()?;

        match self.framer.mode() {
            FramerMode::Line => self.wait_reply(expect),
            FramerMode::Raw => self.await_text(expect),
        }
    }

    /// Blocking wait: poll until the interpreter matches `expect`, the deadline
    /// passes, or the socket the command concerns is closed.
    pub fn wait_reply(&mut self, expect: ReplyToken) -> Result<ReplyOutcome, IoError> {
        self.interpreter.reply.expect(expect);
        let started = self.clock.now_ms();

        let outcome = loop {
            if elapsed_ms(&self.clock, started) > REPLY_TIMEOUT_MS {
                self.interpreter.reply.time_out();
                tlog!("[esp_at] Timeout waiting for '{}'", expect.text());
                break ReplyOutcome::TimedOut;
            }

            if let Err(e) = self.check_rx() {
                self.interpreter.reply.reset();
                return Err(e);
            }

            if !self.interpreter.reply.is_waiting() {
                break ReplyOutcome::Matched;
            }

            if let Some(slot) = self.interpreter.reply.active_slot() {
                if !self.interpreter.sockets.is_connected(slot) {
                    tlog!("[esp_at] Socket {} closed while waiting for '{}'", slot, expect.text());
                    break ReplyOutcome::Aborted;
                }
            }
        };

        self.interpreter.reply.reset();
        Ok(outcome)
    }

    /// Best-effort wait used before line interpretation is trusted.
    ///
    /// Succeeds as soon as the expected text shows up anywhere in the received
    /// bytes. The deadline restarts whenever new bytes arrive, so a slow but
    /// talkative device is never cut off.
    pub fn await_text(&mut self, expect: ReplyToken) -> Result<ReplyOutcome, IoError> {
        self.framer.reset();
        let mut seen = 0;
        let mut last_progress = self.clock.now_ms();
        let mut outcome = ReplyOutcome::TimedOut;

        while elapsed_ms(&self.clock, last_progress) < REPLY_TIMEOUT_MS {
            self.check_rx()?;
            let received = self.framer.buffered();
            if received.len() != seen {
                seen = received.len();
                last_progress = self.clock.now_ms();
                if expect.found_in(received) {
                    outcome = ReplyOutcome::Matched;
                    break;
                }
            }
        }

        if seen == 0 {
            tlog!("[esp_at] No response waiting for '{}'", expect.text());
        } else if self.trace {
            tlog!("[esp_at] raw: {}", String::from_utf8_lossy(self.framer.buffered()));
        }
        self.interpreter.reply.reset();
        Ok(outcome)
    }

    // ========================================================================
    // Control loop
    // ========================================================================

    /// One control-loop iteration: receive, then transmit.
    pub fn tick(&mut self) -> Result<(), IoError> {
        self.check_rx()?;
        self.service_sockets()
    }

    /// Control-loop iteration that first forwards pending console input.
    pub fn tick_with_console<K: Transport + ?Sized>(&mut self, console: &mut K) -> Result<(), IoError> {
        passthrough::forward(console, &mut self.transport, &self.clock)?;
        self.tick()
    }

    /// Tick until `stop` is raised or the transport fails.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<(), IoError> {
        tlog!("[esp_at] Serving");
        while !stop.load(Ordering::Relaxed) {
            self.tick()?;
            std::thread::sleep(IDLE_TICK);
        }
        tlog!("[esp_at] Stopped");
        Ok(())
    }

    /// As `run`, with the debug console forwarded to the device.
    pub fn run_with_console<K: Transport + ?Sized>(&mut self, console: &mut K, stop: &AtomicBool) -> Result<(), IoError> {
        tlog!("[esp_at] Serving with console pass-through");
        while !stop.load(Ordering::Relaxed) {
            self.tick_with_console(console)?;
            std::thread::sleep(IDLE_TICK);
        }
        tlog!("[esp_at] Stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::HttpRouter;
    use crate::io::mock::{MockTransport, StepClock};

    fn engine() -> (AtEngine<MockTransport, StepClock>, StepClock) {
        let clock = StepClock::new();
        let transport = MockTransport::new(&clock);
        let engine = AtEngine::new(transport, clock.clone(), Box::new(HttpRouter::new()));
        (engine, clock)
    }

    #[test]
    fn test_starts_at_baseline() {
        let (e, _) = engine();
        assert_eq!(e.mode(), FramerMode::Line);
        assert_eq!(e.expected_reply(), ReplyToken::None);
        assert_eq!(e.sockets().connected_count(), 0);
    }

    #[test]
    fn test_command_matched() {
        let (mut e, _) = engine();
        e.transport.reply_to("AT+CIPMUX=1", "\r\nOK\r\n");
        let outcome = e.send_command(&AtCommand::EnableMux, ReplyToken::Ok).unwrap();
        assert_eq!(outcome, ReplyOutcome::Matched);
        assert_eq!(e.expected_reply(), ReplyToken::None);
        assert_eq!(e.transport.commands(), vec!["AT+CIPMUX=1"]);
    }

    #[test]
    fn test_reply_timeout_resets_expectation() {
        let (mut e, clock) = engine();
        let outcome = e.send_command(&AtCommand::EnableMux, ReplyToken::Ok).unwrap();
        assert_eq!(outcome, ReplyOutcome::TimedOut);
        assert_eq!(e.expected_reply(), ReplyToken::None);
        assert!(clock.peek() > REPLY_TIMEOUT_MS);
    }

    #[test]
    fn test_wrong_reply_times_out() {
        let (mut e, _) = engine();
        e.transport.reply_to("AT+CIPSERVER", "ERROR\r\n");
        let outcome = e.send_command(&AtCommand::StartServer(80), ReplyToken::Ok).unwrap();
        assert_eq!(outcome, ReplyOutcome::TimedOut);
    }

    #[test]
    fn test_late_reply_within_deadline() {
        let (mut e, _) = engine();
        e.transport.push_incoming_at(4_000, b"OK\r\n");
        let outcome = e.wait_reply(ReplyToken::Ok).unwrap();
        assert_eq!(outcome, ReplyOutcome::Matched);
    }

    #[test]
    fn test_slot_closed_aborts_wait() {
        let (mut e, clock) = engine();
        e.interpreter.sockets.connect(1);
        e.interpreter.reply.set_active_slot(Some(1));
        e.transport.push_incoming(b"1,CLOSED\r\n");

        let outcome = e.wait_reply(ReplyToken::SendComplete).unwrap();
        assert_eq!(outcome, ReplyOutcome::Aborted);
        assert!(!outcome.is_success());
        assert!(clock.peek() < REPLY_TIMEOUT_MS);
        assert_eq!(e.expected_reply(), ReplyToken::None);
    }

    #[test]
    fn test_unsolicited_lines_processed_while_waiting() {
        let (mut e, _) = engine();
        e.transport.reply_to("AT+CIPSTO", "0,CONNECT\r\n+IPD,0,18:GET / HTTP/1.1 \r\n\r\nOK\r\n");
        let outcome = e.send_command(&AtCommand::ServerTimeout(5), ReplyToken::Ok).unwrap();
        assert_eq!(outcome, ReplyOutcome::Matched);
        assert!(e.sockets().is_connected(0));
        assert_eq!(
            e.sockets().pending(0),
            Some(crate::io::esp_at::sockets::DispatchMode::IndexPage)
        );
    }

    #[test]
    fn test_raw_mode_best_effort_substring() {
        let (mut e, _) = engine();
        e.set_mode(FramerMode::Raw);
        e.transport.reply_to("AT+RST", "\r\nets Jan  8 2013,rst cause:2\r\n\r\nready\r\n");
        let outcome = e.send_command(&AtCommand::Reset, ReplyToken::Ready).unwrap();
        assert_eq!(outcome, ReplyOutcome::Matched);
        assert_eq!(e.expected_reply(), ReplyToken::None);
    }

    #[test]
    fn test_raw_mode_deadline_restarts_on_new_bytes() {
        let (mut e, _) = engine();
        e.set_mode(FramerMode::Raw);
        // Trickle of progress output spaced 3 s apart, reply after 9 s total
        e.transport.push_incoming_at(3_000, b"WIFI CONNECTED\r\n");
        e.transport.push_incoming_at(6_000, b".");
        e.transport.push_incoming_at(9_000, b"WIFI GOT IP\r\n");
        let outcome = e.await_text(ReplyToken::GotIp).unwrap();
        assert_eq!(outcome, ReplyOutcome::Matched);
    }

    #[test]
    fn test_raw_mode_silence_times_out() {
        let (mut e, clock) = engine();
        e.set_mode(FramerMode::Raw);
        let outcome = e.await_text(ReplyToken::Ready).unwrap();
        assert_eq!(outcome, ReplyOutcome::TimedOut);
        assert!(clock.peek() >= REPLY_TIMEOUT_MS);
    }

    #[test]
    fn test_raw_mode_ignores_socket_notifications() {
        let (mut e, _) = engine();
        e.set_mode(FramerMode::Raw);
        e.transport.push_incoming(b"0,CONNECT\r\n");
        e.check_rx().unwrap();
        assert!(!e.sockets().is_connected(0));
    }

    #[test]
    fn test_write_failure_propagates() {
        let (mut e, _) = engine();
        e.transport.fail_writes();
        assert!(e.send_command(&AtCommand::EnableMux, ReplyToken::Ok).is_err());
        assert_eq!(e.expected_reply(), ReplyToken::None);
    }

    #[test]
    fn test_run_returns_when_stopped() {
        let (mut e, _) = engine();
        let stop = AtomicBool::new(true);
        e.run(&stop).unwrap();
    }
}
