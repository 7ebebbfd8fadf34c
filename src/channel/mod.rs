//! Capability interface required from the underlying peer library.
//!
//! The transport never talks to a signalling service or a concrete data
//! channel itself. It consumes a [`Peer`], which can register a local id and
//! listen for inbound channels, and dial a remote id. Each [`RawChannel`]
//! pairs a [`ChannelSink`] for outbound messages with a queue of
//! [`ChannelEvent`]s reporting `open`, `data`, `close`, and `error`.
//!
//! [`memory::MemoryNetwork`] implements the interface in-process.

pub mod memory;

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::identity::PeerId;

pub use memory::MemoryNetwork;

/// Message as carried by a channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RawMessage {
    /// UTF-8 text; envelopes and parts travel this way.
    Text(String),
    /// Opaque bytes; decoded as a JSON envelope when received.
    Binary(Bytes),
}

impl RawMessage {
    /// Length in the unit the channel bounds: characters for text, bytes
    /// otherwise.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            RawMessage::Text(text) => text.chars().count(),
            RawMessage::Binary(bytes) => bytes.len(),
        }
    }

    /// Whether the message carries no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            RawMessage::Text(text) => text.is_empty(),
            RawMessage::Binary(bytes) => bytes.is_empty(),
        }
    }
}

impl From<String> for RawMessage {
    fn from(value: String) -> Self { Self::Text(value) }
}

impl From<Bytes> for RawMessage {
    fn from(value: Bytes) -> Self { Self::Binary(value) }
}

/// Lifecycle and data notifications emitted by a channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The channel is ready to carry data.
    Open,
    /// A message arrived from the remote end.
    Data(RawMessage),
    /// The channel closed; no further events follow.
    Close,
    /// The channel failed; no further events follow.
    Error(ChannelError),
}

/// Errors reported by channel implementations.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ChannelError {
    /// No peer is registered under the dialled id.
    #[error("peer {0} is unavailable")]
    PeerUnavailable(PeerId),
    /// Another live peer already registered the id.
    #[error("peer id {0} is already taken")]
    IdTaken(PeerId),
    /// The message exceeds the channel's payload bound.
    #[error("payload of {len} exceeds channel limit {limit}")]
    PayloadTooLarge { len: usize, limit: usize },
    /// The channel was closed.
    #[error("channel closed")]
    Closed,
    /// Any other transport failure.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Outbound half of a channel.
pub trait ChannelSink: Send + Sync + fmt::Debug {
    /// Queue `message` for delivery to the remote end.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] when the channel is closed or rejects the
    /// message.
    fn send(&self, message: RawMessage) -> Result<(), ChannelError>;

    /// Close the channel. Both ends observe [`ChannelEvent::Close`].
    fn close(&self);
}

/// A point-to-point channel to one remote peer.
#[derive(Debug)]
pub struct RawChannel {
    remote: PeerId,
    sink: Arc<dyn ChannelSink>,
    events: mpsc::UnboundedReceiver<ChannelEvent>,
}

impl RawChannel {
    /// Assemble a channel from its parts.
    #[must_use]
    pub fn new(
        remote: PeerId,
        sink: Arc<dyn ChannelSink>,
        events: mpsc::UnboundedReceiver<ChannelEvent>,
    ) -> Self {
        Self {
            remote,
            sink,
            events,
        }
    }

    /// Identifier of the remote end.
    #[must_use]
    pub fn remote(&self) -> &PeerId { &self.remote }

    /// Shared handle to the outbound half.
    #[must_use]
    pub fn sink(&self) -> Arc<dyn ChannelSink> { Arc::clone(&self.sink) }

    /// Receive the next channel event.
    pub async fn next_event(&mut self) -> Option<ChannelEvent> { self.events.recv().await }

    /// Consume the channel, returning its components.
    #[must_use]
    pub fn into_parts(
        self,
    ) -> (
        PeerId,
        Arc<dyn ChannelSink>,
        mpsc::UnboundedReceiver<ChannelEvent>,
    ) {
        (self.remote, self.sink, self.events)
    }
}

/// Stream of channels opened towards a listening peer.
pub type Incoming = mpsc::UnboundedReceiver<RawChannel>;

/// Top-level peer object supplied by the underlying library.
#[async_trait]
pub trait Peer: Send + Sync + 'static {
    /// Register `local` and return the stream of inbound channels.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::IdTaken`] when another live peer holds the id,
    /// or any implementation-specific registration failure.
    async fn listen(&self, local: &PeerId) -> Result<Incoming, ChannelError>;

    /// Dial `remote` on behalf of `local`.
    ///
    /// The returned channel reports [`ChannelEvent::Open`] once usable, or
    /// [`ChannelEvent::Error`] when the remote cannot be reached.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] when the dial cannot even be attempted.
    async fn connect_to(&self, local: &PeerId, remote: &PeerId)
    -> Result<RawChannel, ChannelError>;
}
