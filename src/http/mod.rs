// src/http/mod.rs
//
// Minimal HTTP layer on top of the AT engine: request routing, the fixed
// response texts, and the demo status page.

pub mod content;
pub mod request;
pub mod status;

pub use content::StaticContent;
pub use request::{CustomRoute, HttpRouter};
pub use status::StatusPage;
