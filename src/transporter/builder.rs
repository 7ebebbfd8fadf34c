//! Builder for [`Transporter`].

use std::{
    marker::PhantomData,
    sync::{Arc, Mutex},
    time::Duration,
};

use log::info;
use tokio::sync::watch;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use super::{ConnectionState, Shared, Transporter, pump};
use crate::{
    bus::{EventBus, Handler, HandlerError},
    channel::Peer,
    config::TransportConfig,
    error::Result,
    event::{Event, EventKind},
    fragment::{Fragmenter, Reassembler},
    identity::Identity,
    session::ConnectionIds,
};

/// Configures and starts a [`Transporter`].
///
/// Handlers registered here are in place before the peer starts listening,
/// so no early inbound event can be missed. The peer type is fixed by the
/// argument to [`build`](Self::build).
///
/// ```no_run
/// use peerframe::{EventKind, Identity, MemoryNetwork, Role, Transporter};
///
/// # async fn demo() -> peerframe::Result<()> {
/// let transporter = Transporter::builder(Identity::new("room", Role::Embed))
///     .max_payload_len(64_000)
///     .on(EventKind::Start, |_| Ok(()))
///     .build(MemoryNetwork::new())
///     .await?;
/// transporter.send_mirror_ready().await?;
/// # Ok(())
/// # }
/// ```
pub struct TransporterBuilder<P> {
    identity: Identity,
    config: TransportConfig,
    handlers: Vec<(EventKind, Handler)>,
    peer: PhantomData<fn() -> P>,
}

impl<P> std::fmt::Debug for TransporterBuilder<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransporterBuilder")
            .field("identity", &self.identity)
            .field("config", &self.config)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl<P: Peer> TransporterBuilder<P> {
    /// Start from the default configuration.
    #[must_use]
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            config: TransportConfig::default(),
            handlers: Vec::new(),
            peer: PhantomData,
        }
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, config: TransportConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the unfragmented size bound and chunk size, in characters.
    #[must_use]
    pub fn max_payload_len(mut self, len: usize) -> Self {
        self.config.max_payload_len = len;
        self
    }

    /// Cap the part count accepted for one inbound transmission.
    #[must_use]
    pub fn max_parts(mut self, parts: u32) -> Self {
        self.config.max_parts = parts;
        self
    }

    /// Evict partial inbound transmissions older than `timeout`.
    #[must_use]
    pub fn reassembly_timeout(mut self, timeout: Duration) -> Self {
        self.config.reassembly_timeout = timeout;
        self
    }

    /// Bound the wait for a dialled channel to open.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = Some(timeout);
        self
    }

    /// Bound the wait at the readiness barrier before each send.
    #[must_use]
    pub fn open_timeout(mut self, timeout: Duration) -> Self {
        self.config.open_timeout = Some(timeout);
        self
    }

    /// Register a handler for `kind` before the transporter starts.
    #[must_use]
    pub fn on<F>(mut self, kind: EventKind, handler: F) -> Self
    where
        F: Fn(&Event) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.handlers.push((kind, Arc::new(handler)));
        self
    }

    /// Register `{uid}-{role}` with `peer` and start accepting channels.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Config`](crate::TransportError::Config) for
    /// unusable settings, or
    /// [`TransportError::Channel`](crate::TransportError::Channel) if the
    /// local id cannot be registered.
    pub async fn build(self, peer: P) -> Result<Transporter<P>> {
        let limits = self.config.limits()?;
        let local = self.identity.peer_id();
        let incoming = peer.listen(&local).await?;

        let bus = EventBus::new();
        for (kind, handler) in self.handlers {
            bus.subscribe(kind, move |event| handler(event));
        }

        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let shared = Arc::new(Shared {
            fragmenter: Fragmenter::new(limits.max_payload_len),
            reassembler: Mutex::new(Reassembler::new(
                limits.max_parts,
                self.config.reassembly_timeout,
            )),
            identity: self.identity,
            peer,
            config: self.config,
            bus,
            state,
            link: Mutex::new(None),
            ids: ConnectionIds::new(),
            tasks: TaskTracker::new(),
            shutdown: CancellationToken::new(),
            dial: tokio::sync::Mutex::new(()),
        });
        pump::spawn_accept_loop(&shared, incoming);
        info!(
            "transporter listening: id={local}, role={}",
            shared.identity.role()
        );

        Ok(Transporter { shared })
    }
}
