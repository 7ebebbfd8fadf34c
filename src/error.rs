//! Top-level error type for transporter operations.

use std::time::Duration;

use thiserror::Error;

use crate::{channel::ChannelError, config::ConfigError, fragment::FragmentationError};

/// Errors surfaced by [`Transporter`](crate::Transporter) operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer library reported a failure.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),
    /// The envelope could not be serialized.
    #[error("failed to serialize envelope: {0}")]
    Serialize(#[from] serde_json::Error),
    /// The serialized envelope could not be split.
    #[error(transparent)]
    Fragmentation(#[from] FragmentationError),
    /// The transporter was configured with unusable settings.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    /// The connection closed before it reached the open state.
    #[error("connection closed before opening")]
    ConnectionClosed,
    /// The connection did not open within the configured bound.
    #[error("connection did not open within {0:?}")]
    Timeout(Duration),
}

/// Result type used throughout the crate.
pub type Result<T, E = TransportError> = std::result::Result<T, E>;
