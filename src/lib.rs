#![doc(html_root_url = "https://docs.rs/peerframe/latest")]
//! Public API for the `peerframe` library.
//!
//! This crate provides an event-typed, bidirectional message transport
//! between the two roles of a session, carried over a peer-to-peer data
//! channel. Envelopes larger than the channel's payload bound are split into
//! numbered parts and reassembled on the other side.

pub mod bus;
pub mod channel;
pub mod config;
pub mod error;
pub mod event;
pub mod fragment;
pub mod identity;
pub mod metrics;
pub mod session;
pub mod transporter;

pub use bus::{DispatchError, EventBus, Handler, HandlerError};
pub use channel::{
    ChannelError,
    ChannelEvent,
    ChannelSink,
    MemoryNetwork,
    Peer,
    RawChannel,
    RawMessage,
};
pub use config::{ConfigError, DEFAULT_MAX_PAYLOAD_LEN, TransportConfig};
/// Result type alias re-exported for convenience when working with the
/// transporter.
pub use error::{Result, TransportError};
pub use event::{EnvelopeError, Event, EventKind};
pub use fragment::{
    FragmentationError,
    Fragmenter,
    Part,
    PartDecodeError,
    PartHeader,
    PartIndex,
    ReassemblyError,
    Reassembler,
    decode_part,
    encode_part,
    fragment,
};
pub use identity::{Identity, PeerId, Role};
pub use metrics::{CONNECTIONS_ACTIVE, Direction, ENVELOPES_TOTAL, ERRORS_TOTAL, FRAGMENTS_TOTAL};
pub use session::ConnectionId;
pub use transporter::{ConnectionState, Transporter, TransporterBuilder};
