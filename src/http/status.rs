// src/http/status.rs
//
// Demo custom page: any path other than `/` and the icon is answered with a
// short HTML fragment naming the path and counting the requests served.

use std::cell::RefCell;
use std::rc::Rc;

use super::request::CustomRoute;
use crate::io::esp_at::scheduler::CustomContent;
use crate::io::esp_at::sender::ResponseSink;
use crate::io::IoError;

#[derive(Debug, Default)]
struct StatusState {
    requests: u64,
    last_path: String,
}

/// Shared state behind the route and the content producer.
#[derive(Clone, Default)]
pub struct StatusPage {
    state: Rc<RefCell<StatusState>>,
}

impl StatusPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self) -> Box<dyn CustomRoute> {
        Box::new(self.clone())
    }

    pub fn content(&self) -> Box<dyn CustomContent> {
        Box::new(self.clone())
    }

    pub fn requests(&self) -> u64 {
        self.state.borrow().requests
    }

    fn render(&self) -> String {
        let state = self.state.borrow();
        format!(
            "<html><body><p>Path: {}</p><p>Requests: {}</p></body></html>\r\n",
            escape_html(&state.last_path),
            state.requests
        )
    }
}

impl CustomRoute for StatusPage {
    fn accept(&mut self, path: &str) {
        let mut state = self.state.borrow_mut();
        state.requests += 1;
        state.last_path = path.to_string();
    }
}

impl CustomContent for StatusPage {
    fn produce(&mut self, slot: usize, sink: &mut dyn ResponseSink) -> Result<(), IoError> {
        let body = self.render();
        sink.send_data(slot, body.as_bytes(), true)?;
        Ok(())
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
