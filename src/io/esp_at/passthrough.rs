// src/io/esp_at/passthrough.rs
//
// Debug console pass-through: whatever is typed on the console goes to the
// device unchanged, so AT commands can be tried by hand while the server runs.
// Console bytes never reach the framer.

use super::framer::CHAR_GAP_MS;
use crate::io::{elapsed_ms, Clock, IoError, Transport};

/// Forward one burst of console input to the device.
///
/// Returns the number of bytes forwarded; zero (without waiting) when the
/// console has nothing pending.
pub fn forward<K, T, C>(console: &mut K, device: &mut T, clock: &C) -> Result<usize, IoError>
where
    K: Transport + ?Sized,
    T: Transport + ?Sized,
    C: Clock + ?Sized,
{
    let mut next = console.read_byte()?;
    if next.is_none() {
        return Ok(0);
    }

    let mut burst = Vec::new();
    let mut last_rx = clock.now_ms();
    loop {
        match next {
            Some(byte) => {
                last_rx = clock.now_ms();
                burst.push(byte);
            }
            None if elapsed_ms(clock, last_rx) >= CHAR_GAP_MS => break,
            None => {}
        }
        next = console.read_byte()?;
    }

    device.write_all(&burst)?;
    device.flush()?;
    Ok(burst.len())
}
