// src/io/esp_at/sockets.rs
//
// Per-connection state for the device's multiplexed TCP server.

/// Number of link IDs the device multiplexes (0..=4)
pub const MAX_SOCKETS: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SocketStatus {
    #[default]
    Closed,
    Connected,
}

/// Response queued for a socket.
///
/// The ordering is significant: every mode above `Favicon` is preceded by the
/// generic 200 header when transmitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum DispatchMode {
    #[default]
    None,
    NotFound,
    Favicon,
    IndexPage,
    Custom,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SocketSlot {
    pub status: SocketStatus,
    pub pending: DispatchMode,
}

/// Fixed table of socket slots indexed by link ID.
///
/// Out-of-range indices are never stored; mutators report them by returning false.
#[derive(Debug, Default)]
pub struct SocketTable {
    slots: [SocketSlot; MAX_SOCKETS],
}

impl SocketTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_range(index: usize) -> bool {
        index < MAX_SOCKETS
    }

    pub fn status(&self, index: usize) -> Option<SocketStatus> {
        self.slots.get(index).map(|s| s.status)
    }

    pub fn is_connected(&self, index: usize) -> bool {
        self.status(index) == Some(SocketStatus::Connected)
    }

    pub fn pending(&self, index: usize) -> Option<DispatchMode> {
        self.slots.get(index).map(|s| s.pending)
    }

    pub fn connect(&mut self, index: usize) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) => {
                slot.status = SocketStatus::Connected;
                true
            }
            None => false,
        }
    }

    pub fn close(&mut self, index: usize) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) => {
                slot.status = SocketStatus::Closed;
                true
            }
            None => false,
        }
    }

    pub fn set_pending(&mut self, index: usize, mode: DispatchMode) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) => {
                slot.pending = mode;
                true
            }
            None => false,
        }
    }

    /// Hand out the pending mode and clear it, so a new request can be
    /// recorded while the previous response is still being sent.
    pub fn take_pending(&mut self, index: usize) -> DispatchMode {
        self.slots
            .get_mut(index)
            .map(|slot| std::mem::take(&mut slot.pending))
            .unwrap_or_default()
    }

    pub fn connected_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.status == SocketStatus::Connected)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_starts_closed() {
        let table = SocketTable::new();
        for i in 0..MAX_SOCKETS {
            assert_eq!(table.status(i), Some(SocketStatus::Closed));
            assert_eq!(table.pending(i), Some(DispatchMode::None));
        }
        assert_eq!(table.connected_count(), 0);
    }

    #[test]
    fn test_connect_and_close() {
        let mut table = SocketTable::new();
        assert!(table.connect(3));
        assert!(table.connect(3)); // idempotent
        assert!(table.is_connected(3));
        assert!(table.close(3));
        assert!(!table.is_connected(3));
    }

    #[test]
    fn test_out_of_range_is_never_stored() {
        let mut table = SocketTable::new();
        assert!(!table.connect(MAX_SOCKETS));
        assert!(!table.set_pending(7, DispatchMode::IndexPage));
        assert_eq!(table.status(MAX_SOCKETS), None);
        assert_eq!(table.take_pending(9), DispatchMode::None);
        assert_eq!(table.connected_count(), 0);
    }

    #[test]
    fn test_take_pending_clears() {
        let mut table = SocketTable::new();
        table.set_pending(1, DispatchMode::Favicon);
        assert_eq!(table.take_pending(1), DispatchMode::Favicon);
        assert_eq!(table.pending(1), Some(DispatchMode::None));
    }

    #[test]
    fn test_dispatch_mode_ordering() {
        assert!(DispatchMode::IndexPage > DispatchMode::Favicon);
        assert!(DispatchMode::Custom > DispatchMode::Favicon);
        assert!(DispatchMode::NotFound < DispatchMode::Favicon);
    }
}
