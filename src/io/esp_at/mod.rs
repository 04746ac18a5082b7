// src/io/esp_at/mod.rs
//
// ESP8266 AT-command engine.
//
// Drives an ESP8266 running the stock AT firmware as a small multi-socket
// TCP server over a serial link:
// - framer: bytes to lines, with a 2 ms inter-character gap
// - interpreter: socket events, command replies and inbound requests
// - engine: command/reply driver and control loop
// - sender: chunked AT+CIPSEND transmission
// - scheduler: per-socket response dispatch
// - bringup: reset and server start-up sequence

pub mod bringup;
pub mod command;
pub mod engine;
pub mod framer;
pub mod interpreter;
pub mod passthrough;
pub mod reply;
pub mod scheduler;
pub mod sender;
pub mod sockets;

pub use bringup::{BringUpPlan, BringUpReport};
pub use command::AtCommand;
pub use engine::AtEngine;
pub use framer::FramerMode;
pub use interpreter::RequestParser;
pub use reply::{ReplyOutcome, ReplyToken};
pub use scheduler::CustomContent;
pub use sender::ResponseSink;
pub use sockets::DispatchMode;
