// src/lib.rs
//
// Web server for an ESP8266 driven over its serial AT-command interface.

#[macro_use]
pub mod logging;

pub mod http;
pub mod io;
pub mod settings;

pub use http::{HttpRouter, StaticContent, StatusPage};
pub use io::esp_at::{AtEngine, BringUpPlan, BringUpReport, DispatchMode, FramerMode};
pub use io::{Clock, IoError, SystemClock, Transport};
pub use settings::{load_settings, ServerSettings};
