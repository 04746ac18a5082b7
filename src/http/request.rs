// src/http/request.rs
//
// Maps the first line of an HTTP request to the response the socket should
// get. Only GET is served; the rest of the request (headers, body) is ignored.

use crate::io::esp_at::interpreter::RequestParser;
use crate::io::esp_at::sockets::DispatchMode;

/// Application hook for paths that are neither the index page nor the icon.
pub trait CustomRoute {
    /// Called with the request path, leading `/` removed.
    fn accept(&mut self, path: &str);
}

#[derive(Default)]
pub struct HttpRouter {
    custom: Option<Box<dyn CustomRoute>>,
}

impl HttpRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_custom_route(mut self, route: Box<dyn CustomRoute>) -> Self {
        self.custom = Some(route);
        self
    }

    /// Classify a request line such as `GET /favicon.ico HTTP/1.1`.
    pub fn route(&mut self, request: &str) -> DispatchMode {
        if !request.starts_with("GET") {
            return DispatchMode::None;
        }

        let Some(target) = request
            .get(4..)
            .and_then(|rest| rest.split(' ').find(|token| !token.is_empty()))
        else {
            tlog!("[http] Malformed request: '{}'", request);
            return DispatchMode::None;
        };

        // Drop the leading '/'
        let mut chars = target.chars();
        chars.next();
        let path = chars.as_str();

        if path.is_empty() {
            DispatchMode::IndexPage
        } else if path.contains("favicon.ico") {
            DispatchMode::Favicon
        } else if let Some(route) = self.custom.as_mut() {
            route.accept(path);
            DispatchMode::Custom
        } else {
            tlog!("[http] Unknown path: {}", path);
            DispatchMode::NotFound
        }
    }
}

impl RequestParser for HttpRouter {
    fn parse(&mut self, _slot: usize, payload: &str) -> DispatchMode {
        self.route(payload)
    }
}
