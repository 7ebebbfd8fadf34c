//! Error types emitted by the fragmentation layer.
//!
//! Outbound splitting, header decoding and inbound reassembly fail for
//! different reasons, so each gets its own enum. Reassembly errors wrap the
//! other two where the inbound path can trip over them.

use std::num::NonZeroU32;

use thiserror::Error;

/// Errors produced while splitting outbound envelopes.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum FragmentationError {
    /// The envelope needs more parts than a `u32` index can address.
    #[error("envelope of {chars} chars needs more than u32::MAX parts")]
    TooManyParts { chars: usize },
}

/// Errors produced while decoding a part header.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PartDecodeError {
    /// The text between the prefix and the delimiter is not `<index>-<count>`.
    #[error("malformed part header {header:?}")]
    MalformedHeader { header: String },
    /// The header names index zero or a zero count.
    #[error("part header {header:?} uses a zero index or count")]
    Zero { header: String },
    /// The index lies beyond the advertised count.
    #[error("part index {index} exceeds count {count}")]
    IndexOutOfRange { index: u32, count: u32 },
}

/// Errors produced while reassembling inbound messages.
#[derive(Debug, Error)]
pub enum ReassemblyError {
    /// The part header could not be decoded.
    #[error(transparent)]
    Decode(#[from] PartDecodeError),
    /// The advertised count exceeds the configured cap.
    #[error("part count {count} exceeds limit {limit}")]
    TooManyParts { count: NonZeroU32, limit: NonZeroU32 },
    /// The complete text is not a valid envelope.
    #[error("invalid envelope: {0}")]
    Envelope(#[from] serde_json::Error),
}
