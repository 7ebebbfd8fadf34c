//! Identifiers for the successive channels a transporter adopts.
//!
//! A transporter holds at most one live channel, but channels are replaced
//! over its lifetime: a dial after a close, or an inbound channel from the
//! remote peer. Each adopted channel gets a fresh [`ConnectionId`] so late
//! events from a replaced channel can be told apart from the current one.

use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier assigned to a channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl From<u64> for ConnectionId {
    fn from(value: u64) -> Self { Self(value) }
}

impl ConnectionId {
    /// Create a new [`ConnectionId`] with the provided value.
    #[must_use]
    pub fn new(id: u64) -> Self { Self(id) }

    /// Return the inner `u64` representation.
    #[must_use]
    pub fn as_u64(&self) -> u64 { self.0 }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ConnectionId({})", self.0)
    }
}

/// Monotonic source of [`ConnectionId`]s.
#[derive(Debug, Default)]
pub struct ConnectionIds(AtomicU64);

impl ConnectionIds {
    /// Create a generator starting at 1.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Allocate the next identifier.
    pub fn next_id(&self) -> ConnectionId { ConnectionId(self.0.fetch_add(1, Ordering::Relaxed) + 1) }

    /// Number of identifiers handed out so far.
    #[must_use]
    pub fn issued(&self) -> u64 { self.0.load(Ordering::Relaxed) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_and_increasing() {
        let ids = ConnectionIds::new();
        let first = ids.next_id();
        let second = ids.next_id();
        assert_eq!(first, ConnectionId::new(1));
        assert!(second > first);
        assert_eq!(ids.issued(), 2);
        assert_eq!(second.to_string(), "ConnectionId(2)");
    }
}
