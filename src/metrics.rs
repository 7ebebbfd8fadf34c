//! Metric helpers for `peerframe`.
//!
//! This module defines metric names and simple helper functions
//! wrapping the [`metrics`](https://docs.rs/metrics) crate. With the
//! `metrics` feature disabled the helpers compile to nothing.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Name of the gauge tracking open channels.
pub const CONNECTIONS_ACTIVE: &str = "peerframe_connections_active";
/// Name of the counter tracking whole envelopes sent or received.
pub const ENVELOPES_TOTAL: &str = "peerframe_envelopes_total";
/// Name of the counter tracking parts sent or received.
pub const FRAGMENTS_TOTAL: &str = "peerframe_fragments_total";
/// Name of the counter tracking error occurrences.
pub const ERRORS_TOTAL: &str = "peerframe_errors_total";

/// Direction of message processing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Messages received from the remote peer.
    Inbound,
    /// Messages sent to the remote peer.
    Outbound,
}

impl Direction {
    /// Label value used on directional metrics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// Increment the open channels gauge.
pub fn inc_connections() {
    #[cfg(feature = "metrics")]
    gauge!(CONNECTIONS_ACTIVE).increment(1.0);
}

/// Decrement the open channels gauge.
pub fn dec_connections() {
    #[cfg(feature = "metrics")]
    gauge!(CONNECTIONS_ACTIVE).decrement(1.0);
}

/// Record a complete envelope for the given direction.
pub fn inc_envelopes(direction: Direction) {
    #[cfg(feature = "metrics")]
    counter!(ENVELOPES_TOTAL, "direction" => direction.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = direction;
}

/// Record `parts` parts for the given direction.
pub fn inc_fragments(direction: Direction, parts: u64) {
    #[cfg(feature = "metrics")]
    counter!(FRAGMENTS_TOTAL, "direction" => direction.as_str()).increment(parts);
    #[cfg(not(feature = "metrics"))]
    let _ = (direction, parts);
}

/// Record an error occurrence.
pub fn inc_errors() {
    #[cfg(feature = "metrics")]
    counter!(ERRORS_TOTAL).increment(1);
}
