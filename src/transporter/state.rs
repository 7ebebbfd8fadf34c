//! Connection lifecycle states.

use std::fmt;

/// Lifecycle of the transporter's channel.
///
/// ```text
/// Disconnected --connect/inbound--> Connecting --open--> Open
///                                       |                 |
///                                       +--close/error--> Closed --connect--> Connecting
/// ```
///
/// `Closed` is not terminal: the next send dials again.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No channel has been attempted yet.
    #[default]
    Disconnected,
    /// A channel exists but has not reported `open`.
    Connecting,
    /// The channel is ready for sends.
    Open,
    /// The last channel closed or failed.
    Closed,
}

impl ConnectionState {
    /// Lower-case label used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closed => "closed",
        }
    }

    /// Whether sends can proceed immediately.
    #[must_use]
    pub const fn is_open(self) -> bool { matches!(self, ConnectionState::Open) }

    /// Whether the readiness barrier can stop waiting in this state.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        matches!(self, ConnectionState::Open | ConnectionState::Closed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}
