//! Transport configuration.
//!
//! [`TransportConfig`] gathers the tunables of a [`Transporter`](crate::Transporter):
//! the fragment size bound, the reassembly limits, and the optional waits on
//! connection establishment. Values are plain numbers so they can come from
//! flags or files; [`TransportConfig::validate`] converts them into the
//! non-zero forms the fragment layer needs.

use std::{
    num::{NonZeroU32, NonZeroUsize},
    time::Duration,
};

use thiserror::Error;

/// Default upper bound on an unfragmented message, in characters.
pub const DEFAULT_MAX_PAYLOAD_LEN: usize = 200_000;
/// Default cap on the part count accepted for one inbound transmission.
pub const DEFAULT_MAX_PARTS: u32 = 4096;
/// Default age after which a partial transmission is discarded.
pub const DEFAULT_REASSEMBLY_TIMEOUT: Duration = Duration::from_secs(30);

/// Tunables for a transporter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransportConfig {
    /// Largest serialized envelope sent unfragmented, and the largest chunk
    /// carried by one part.
    pub max_payload_len: usize,
    /// Largest part count accepted from the remote peer.
    pub max_parts: u32,
    /// Age after which a partial inbound transmission is evicted.
    pub reassembly_timeout: Duration,
    /// Bound on waiting for an outbound connection to open.
    pub connect_timeout: Option<Duration>,
    /// Bound on waiting at the readiness barrier before a send.
    pub open_timeout: Option<Duration>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
            max_parts: DEFAULT_MAX_PARTS,
            reassembly_timeout: DEFAULT_REASSEMBLY_TIMEOUT,
            connect_timeout: None,
            open_timeout: None,
        }
    }
}

/// Validated view of a [`TransportConfig`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Limits {
    pub max_payload_len: NonZeroUsize,
    pub max_parts: NonZeroU32,
}

impl TransportConfig {
    /// Check every tunable is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the first zero-valued setting.
    pub fn validate(&self) -> Result<(), ConfigError> { self.limits().map(|_| ()) }

    pub(crate) fn limits(&self) -> Result<Limits, ConfigError> {
        let max_payload_len =
            NonZeroUsize::new(self.max_payload_len).ok_or(ConfigError::Zero("max_payload_len"))?;
        let max_parts = NonZeroU32::new(self.max_parts).ok_or(ConfigError::Zero("max_parts"))?;
        if self.reassembly_timeout.is_zero() {
            return Err(ConfigError::Zero("reassembly_timeout"));
        }
        if self.connect_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::Zero("connect_timeout"));
        }
        if self.open_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::Zero("open_timeout"));
        }
        Ok(Limits {
            max_payload_len,
            max_parts,
        })
    }
}

/// Errors raised by [`TransportConfig::validate`].
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A setting that must be positive was zero.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = TransportConfig::default();
        assert_eq!(config.max_payload_len, 200_000);
        assert!(config.connect_timeout.is_none());
        assert_eq!(config.validate(), Ok(()));
    }

    #[rstest]
    #[case(TransportConfig { max_payload_len: 0, ..TransportConfig::default() }, "max_payload_len")]
    #[case(TransportConfig { max_parts: 0, ..TransportConfig::default() }, "max_parts")]
    #[case(
        TransportConfig { reassembly_timeout: Duration::ZERO, ..TransportConfig::default() },
        "reassembly_timeout"
    )]
    #[case(
        TransportConfig { connect_timeout: Some(Duration::ZERO), ..TransportConfig::default() },
        "connect_timeout"
    )]
    #[case(
        TransportConfig { open_timeout: Some(Duration::ZERO), ..TransportConfig::default() },
        "open_timeout"
    )]
    fn zero_settings_are_rejected(#[case] config: TransportConfig, #[case] field: &'static str) {
        assert_eq!(config.validate(), Err(ConfigError::Zero(field)));
    }
}
