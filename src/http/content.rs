// src/http/content.rs
//
// Fixed response texts and the static payloads served by the scheduler.

use std::path::Path;
use std::sync::Arc;

pub const HEADER_NOT_FOUND: &[u8] = b"HTTP/1.1 404 Not Found\r\n\
Content-type: text/plain\r\n\
Connection: close\r\n\r\n\
page not found.\r\n";

pub const HEADER_ICON: &[u8] = b"HTTP/1.1 200 OK\r\n\
Content-type: image/x-icon\r\n\r\n";

/// Sent ahead of every HTML response, including custom content
pub const HEADER_HTML: &[u8] = b"HTTP/1.1 200 OK\r\n\
Content-type: text/html\r\n\
Connection: close\r\n\r\n";

const DEFAULT_INDEX_PAGE: &[u8] = b"<!DOCTYPE html>\n\
<html>\n\
<head><title>ESP8266 web server</title></head>\n\
<body>\n\
<h1>ESP8266 web server</h1>\n\
<p>Served over the AT command interface.</p>\n\
</body>\n\
</html>\n";

/// 1x1 32-bit ICO
const DEFAULT_FAVICON: [u8; 70] = [
    // ICONDIR
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00,
    // ICONDIRENTRY: 1x1, 32 bpp, 48 bytes at offset 22
    0x01, 0x01, 0x00, 0x00, 0x01, 0x00, 0x20, 0x00,
    0x30, 0x00, 0x00, 0x00, 0x16, 0x00, 0x00, 0x00,
    // BITMAPINFOHEADER, height doubled for the AND mask
    0x28, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00,
    0x02, 0x00, 0x00, 0x00, 0x01, 0x00, 0x20, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x08, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    // BGRA pixel
    0xd0, 0x80, 0x20, 0xff,
    // AND mask row
    0x00, 0x00, 0x00, 0x00,
];

/// Icon and index page bytes. Cloning shares the payloads.
#[derive(Clone, Debug)]
pub struct StaticContent {
    favicon: Arc<[u8]>,
    index_page: Arc<[u8]>,
}

impl Default for StaticContent {
    fn default() -> Self {
        Self::new(DEFAULT_FAVICON.to_vec(), DEFAULT_INDEX_PAGE.to_vec())
    }
}

impl StaticContent {
    pub fn new(favicon: Vec<u8>, index_page: Vec<u8>) -> Self {
        Self {
            favicon: favicon.into(),
            index_page: index_page.into(),
        }
    }

    /// Built-in payloads, replaced by whichever files are given.
    pub fn load(index_page: Option<&Path>, favicon: Option<&Path>) -> Result<Self, String> {
        let mut content = Self::default();
        if let Some(path) = index_page {
            content.index_page = read_payload(path)?;
        }
        if let Some(path) = favicon {
            content.favicon = read_payload(path)?;
        }
        Ok(content)
    }

    pub fn favicon(&self) -> Arc<[u8]> {
        Arc::clone(&self.favicon)
    }

    pub fn index_page(&self) -> Arc<[u8]> {
        Arc::clone(&self.index_page)
    }
}

fn read_payload(path: &Path) -> Result<Arc<[u8]>, String> {
    let bytes = std::fs::read(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    tlog!("[http] Loaded {} ({} bytes)", path.display(), bytes.len());
    Ok(bytes.into())
}
