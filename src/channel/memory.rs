//! In-process [`Peer`] implementation.
//!
//! `MemoryNetwork` plays the part of the signalling service: peers register
//! an id with [`Peer::listen`] and dial each other with [`Peer::connect_to`].
//! Channels are pairs of unbounded queues, so message order is preserved and
//! sends never block. Clones share the same registry.

use std::{
    num::NonZeroUsize,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};
use log::debug;
use tokio::sync::mpsc;

use super::{ChannelError, ChannelEvent, ChannelSink, Incoming, Peer, RawChannel, RawMessage};
use crate::identity::PeerId;

/// Shared in-memory registry of listening peers.
#[derive(Clone, Debug, Default)]
pub struct MemoryNetwork {
    listeners: Arc<DashMap<PeerId, mpsc::UnboundedSender<RawChannel>>>,
    max_payload: Option<NonZeroUsize>,
    open_delay: Option<Duration>,
}

impl MemoryNetwork {
    /// Create an empty network with unbounded payloads and immediate opens.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Reject any message longer than `limit` with
    /// [`ChannelError::PayloadTooLarge`].
    #[must_use]
    pub fn with_max_payload(mut self, limit: NonZeroUsize) -> Self {
        self.max_payload = Some(limit);
        self
    }

    /// Delay `open` notifications on new channels by `delay`.
    #[must_use]
    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = Some(delay);
        self
    }

    /// Whether `id` is currently registered.
    #[must_use]
    pub fn is_registered(&self, id: &PeerId) -> bool {
        self.listeners
            .get(id)
            .is_some_and(|listener| !listener.is_closed())
    }

    /// Remove `id` from the registry. Existing channels stay open.
    pub fn unregister(&self, id: &PeerId) -> bool { self.listeners.remove(id).is_some() }
}

#[async_trait]
impl Peer for MemoryNetwork {
    async fn listen(&self, local: &PeerId) -> Result<Incoming, ChannelError> {
        let (tx, rx) = mpsc::unbounded_channel();
        match self.listeners.entry(local.clone()) {
            Entry::Occupied(mut entry) => {
                if !entry.get().is_closed() {
                    return Err(ChannelError::IdTaken(local.clone()));
                }
                entry.insert(tx);
            }
            Entry::Vacant(entry) => {
                entry.insert(tx);
            }
        }
        debug!("peer registered: id={local}");
        Ok(rx)
    }

    async fn connect_to(
        &self,
        local: &PeerId,
        remote: &PeerId,
    ) -> Result<RawChannel, ChannelError> {
        let (local_tx, local_rx) = mpsc::unbounded_channel();
        let (remote_tx, remote_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));

        let local_sink = Arc::new(MemorySink {
            own: local_tx.clone(),
            peer: remote_tx.clone(),
            closed: Arc::clone(&closed),
            max_payload: self.max_payload,
        });
        let remote_sink = Arc::new(MemorySink {
            own: remote_tx.clone(),
            peer: local_tx.clone(),
            closed,
            max_payload: self.max_payload,
        });

        let accepted = self
            .listeners
            .get(remote)
            .is_some_and(|listener| {
                listener
                    .send(RawChannel::new(local.clone(), remote_sink, remote_rx))
                    .is_ok()
            });

        if !accepted {
            debug!("dial failed: local={local}, remote={remote}");
            let _ = local_tx.send(ChannelEvent::Error(ChannelError::PeerUnavailable(
                remote.clone(),
            )));
            let _ = local_tx.send(ChannelEvent::Close);
            return Ok(RawChannel::new(remote.clone(), local_sink, local_rx));
        }

        debug!("dial accepted: local={local}, remote={remote}");
        match self.open_delay {
            Some(delay) => {
                let closed = Arc::clone(&local_sink.closed);
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    if !closed.load(Ordering::Acquire) {
                        announce_open(&remote_tx, &local_tx);
                    }
                });
            }
            None => announce_open(&remote_tx, &local_tx),
        }

        Ok(RawChannel::new(remote.clone(), local_sink, local_rx))
    }
}

fn announce_open(
    responder: &mpsc::UnboundedSender<ChannelEvent>,
    initiator: &mpsc::UnboundedSender<ChannelEvent>,
) {
    let _ = responder.send(ChannelEvent::Open);
    let _ = initiator.send(ChannelEvent::Open);
}

#[derive(Debug)]
struct MemorySink {
    own: mpsc::UnboundedSender<ChannelEvent>,
    peer: mpsc::UnboundedSender<ChannelEvent>,
    closed: Arc<AtomicBool>,
    max_payload: Option<NonZeroUsize>,
}

impl ChannelSink for MemorySink {
    fn send(&self, message: RawMessage) -> Result<(), ChannelError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ChannelError::Closed);
        }
        if let Some(limit) = self.max_payload
            && message.len() > limit.get()
        {
            return Err(ChannelError::PayloadTooLarge {
                len: message.len(),
                limit: limit.get(),
            });
        }
        self.peer
            .send(ChannelEvent::Data(message))
            .map_err(|_| ChannelError::Closed)
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.own.send(ChannelEvent::Close);
        let _ = self.peer.send(ChannelEvent::Close);
    }
}
