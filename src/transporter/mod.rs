//! Bidirectional event transport between the two roles of a session.
//!
//! A [`Transporter`] registers `{uid}-{role}` with its [`Peer`] when built and
//! listens for inbound channels for as long as it lives. Sends connect
//! lazily to `{uid}-{complement}`, wait at a readiness barrier until the
//! channel reports `open`, then write the envelope whole or as parts.
//! Inbound messages from any adopted channel are reassembled and dispatched
//! to the handlers registered with [`Transporter::on`].
//!
//! Each adopted channel is driven by a pump task on a shared
//! [`TaskTracker`](tokio_util::task::TaskTracker). Pumps hold only weak
//! references, so dropping the last `Transporter` handle stops them.

mod builder;
mod helpers;
mod pump;
mod state;

use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

pub use builder::TransporterBuilder;
use log::{debug, info, warn};
pub use state::ConnectionState;
use tokio::{
    sync::{oneshot, watch},
    time::timeout,
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use crate::{
    bus::{EventBus, HandlerError},
    channel::{ChannelSink, Peer, RawMessage},
    config::TransportConfig,
    error::{Result, TransportError},
    event::{Event, EventKind},
    fragment::{Fragmenter, Reassembler},
    identity::{Identity, PeerId},
    metrics::{self, Direction},
    session::{ConnectionId, ConnectionIds},
};

/// Handle to one side of a session.
///
/// Cloning is cheap; all clones share the same channel, handlers, and state.
pub struct Transporter<P: Peer> {
    shared: Arc<Shared<P>>,
}

impl<P: Peer> Clone for Transporter<P> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<P: Peer> fmt::Debug for Transporter<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transporter")
            .field("identity", &self.shared.identity)
            .field("state", &self.state())
            .field("bus", &self.shared.bus)
            .finish_non_exhaustive()
    }
}

struct Shared<P> {
    identity: Identity,
    peer: P,
    config: TransportConfig,
    fragmenter: Fragmenter,
    bus: EventBus,
    state: watch::Sender<ConnectionState>,
    link: Mutex<Option<Link>>,
    reassembler: Mutex<Reassembler>,
    ids: ConnectionIds,
    tasks: TaskTracker,
    shutdown: CancellationToken,
    dial: tokio::sync::Mutex<()>,
}

impl<P> Drop for Shared<P> {
    fn drop(&mut self) { self.shutdown.cancel(); }
}

/// The channel sends currently go to.
#[derive(Clone, Debug)]
struct Link {
    id: ConnectionId,
    remote: PeerId,
    sink: Arc<dyn ChannelSink>,
}

impl<P: Peer> Transporter<P> {
    /// Start configuring a transporter for `identity`.
    #[must_use]
    pub fn builder(identity: Identity) -> TransporterBuilder<P> {
        TransporterBuilder::new(identity)
    }

    /// Build a transporter with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Channel`] if the peer cannot register the
    /// local id.
    pub async fn new(identity: Identity, peer: P) -> Result<Self> {
        TransporterBuilder::new(identity).build(peer).await
    }

    /// Local identity.
    #[must_use]
    pub fn identity(&self) -> &Identity { &self.shared.identity }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &TransportConfig { &self.shared.config }

    /// Underlying peer object.
    #[must_use]
    pub fn peer(&self) -> &P { &self.shared.peer }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState { *self.shared.state.borrow() }

    /// Whether sends would proceed without waiting.
    #[must_use]
    pub fn is_open(&self) -> bool { self.state().is_open() }

    /// Observe connection state changes.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> { self.shared.state.subscribe() }

    /// Remote end of the channel sends currently go to.
    #[must_use]
    pub fn remote(&self) -> Option<PeerId> { self.shared.current_link().map(|link| link.remote) }

    /// Authenticate the session. Always succeeds.
    ///
    /// # Errors
    ///
    /// Never fails; the `Result` leaves room for peers that authenticate.
    #[expect(
        clippy::unused_async,
        reason = "callers await login alongside other session setup"
    )]
    pub async fn login(&self) -> Result<bool> { Ok(true) }

    /// Append `handler` to the list for `kind`.
    ///
    /// Handlers run on the pump task of the channel the event arrived on, in
    /// subscription order. A handler returning `Err` stops the remaining
    /// handlers for that event; the error is logged and later events are
    /// still dispatched.
    pub fn on<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&Event) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.shared.bus.subscribe(kind, handler);
    }

    /// Number of handlers registered for `kind`.
    #[must_use]
    pub fn handler_count(&self, kind: EventKind) -> usize { self.shared.bus.handler_count(kind) }

    /// Dial the complementary role and wait until the channel opens.
    ///
    /// Returns immediately if a channel is already open. Concurrent calls
    /// share one dial.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Channel`] if the remote cannot be reached,
    /// [`TransportError::ConnectionClosed`] if the channel closes before
    /// opening, or [`TransportError::Timeout`] when `connect_timeout` elapses.
    pub async fn connect(&self) -> Result<()> {
        let _dialling = self.shared.dial.lock().await;
        if self.is_open() {
            return Ok(());
        }

        let local = self.shared.identity.peer_id();
        let remote = self.shared.identity.remote_peer_id();
        info!("connecting: local={local}, remote={remote}");
        self.shared.set_state(ConnectionState::Connecting);

        let channel = match self.shared.peer.connect_to(&local, &remote).await {
            Ok(channel) => channel,
            Err(err) => {
                metrics::inc_errors();
                warn!("dial failed: remote={remote}, error={err}");
                self.shared.settle_failed_dial();
                return Err(err.into());
            }
        };

        let (opened_tx, opened_rx) = oneshot::channel();
        let (id, sink) = pump::spawn_pump(&self.shared, channel, Some(opened_tx));
        let outcome = match self.shared.config.connect_timeout {
            Some(limit) => {
                if let Ok(outcome) = timeout(limit, opened_rx).await {
                    outcome
                } else {
                    warn!("connection did not open in time: remote={remote}, id={id}, limit={limit:?}");
                    sink.close();
                    return Err(TransportError::Timeout(limit));
                }
            }
            None => opened_rx.await,
        };
        outcome.unwrap_or(Err(TransportError::ConnectionClosed))
    }

    /// Wait until the current channel is open.
    ///
    /// This is the readiness barrier every send passes through. It resolves
    /// once the state is `Open`, and fails if it becomes `Closed` first.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ConnectionClosed`] if the channel closes, or
    /// [`TransportError::Timeout`] when `open_timeout` elapses.
    pub async fn wait_open(&self) -> Result<()> {
        let mut state = self.shared.state.subscribe();
        let settled = state.wait_for(|state| state.is_settled());
        let reached = match self.shared.config.open_timeout {
            Some(limit) => timeout(limit, settled)
                .await
                .map_err(|_| TransportError::Timeout(limit))?,
            None => settled.await,
        };
        match reached.map(|state| *state) {
            Ok(ConnectionState::Open) => Ok(()),
            _ => Err(TransportError::ConnectionClosed),
        }
    }

    /// Send `event` to the remote peer.
    ///
    /// Connects first if no channel exists, then waits for it to open. The
    /// envelope is serialized once; if it exceeds `max_payload_len`
    /// characters it is written as consecutive parts with no await point in
    /// between, so concurrent sends never interleave their parts.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Transporter::connect`] or
    /// [`Transporter::wait_open`], [`TransportError::Serialize`] if the
    /// payload cannot be encoded, or [`TransportError::Channel`] if the
    /// channel rejects a write.
    pub async fn send(&self, event: &Event) -> Result<()> {
        let link = self.ready_link().await?;
        let serialized = serde_json::to_string(event)?;
        let parts = self.shared.fragmenter.fragment(&serialized)?;
        let kind = event.kind();

        if parts.is_empty() {
            self.shared.write(&link, RawMessage::Text(serialized))?;
            tracing::debug!(%kind, remote = %link.remote, "envelope sent");
        } else {
            debug!(
                "sending fragmented envelope: kind={kind}, parts={}, remote={}",
                parts.len(),
                link.remote
            );
            for part in &parts {
                self.shared.write(&link, RawMessage::Text(part.encode()))?;
            }
            metrics::inc_fragments(
                Direction::Outbound,
                u64::try_from(parts.len()).unwrap_or(u64::MAX),
            );
        }
        metrics::inc_envelopes(Direction::Outbound);
        Ok(())
    }

    /// Close the current channel and discard partial inbound state.
    ///
    /// The transporter keeps listening; the next send dials again.
    pub fn close(&self) {
        if let Some(link) = self.shared.take_link() {
            info!("closing connection: remote={}, id={}", link.remote, link.id);
            link.sink.close();
        }
        self.shared.set_state(ConnectionState::Closed);
        self.shared.discard_partial();
    }

    /// Close the channel, stop listening, and wait for every pump to finish.
    pub async fn shutdown(&self) {
        self.close();
        self.shared.shutdown.cancel();
        self.shared.tasks.close();
        self.shared.tasks.wait().await;
        info!("transporter stopped: id={}", self.shared.identity.peer_id());
    }

    async fn ready_link(&self) -> Result<Link> {
        if self.shared.current_link().is_none() {
            self.connect().await?;
        }
        self.wait_open().await?;
        self.shared
            .current_link()
            .ok_or(TransportError::ConnectionClosed)
    }
}

impl<P> Shared<P> {
    fn set_state(&self, next: ConnectionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!("connection state changed: from={previous}, to={next}");
        }
    }

    fn lock_link(&self) -> std::sync::MutexGuard<'_, Option<Link>> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_link(&self) -> Option<Link> { self.lock_link().clone() }

    fn is_current(&self, id: ConnectionId) -> bool {
        self.lock_link().as_ref().is_some_and(|link| link.id == id)
    }

    fn adopt(&self, link: Link) {
        let previous = self.lock_link().replace(link);
        if let Some(previous) = previous {
            debug!(
                "connection superseded: remote={}, id={}",
                previous.remote, previous.id
            );
        }
        self.set_state(ConnectionState::Connecting);
    }

    fn take_link(&self) -> Option<Link> { self.lock_link().take() }

    /// Clear the link if it is `id`; returns whether it was.
    fn release(&self, id: ConnectionId) -> bool {
        let mut link = self.lock_link();
        if link.as_ref().is_some_and(|current| current.id != id) {
            return false;
        }
        *link = None;
        drop(link);
        self.set_state(ConnectionState::Closed);
        self.discard_partial();
        true
    }

    fn settle_failed_dial(&self) {
        if self.lock_link().is_none() {
            self.set_state(ConnectionState::Closed);
        }
    }

    fn discard_partial(&self) {
        let dropped = self
            .reassembler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reset();
        if dropped > 0 {
            debug!("discarded partial transmission: parts={dropped}");
        }
    }

    fn write(&self, link: &Link, message: RawMessage) -> Result<()> {
        link.sink.send(message).map_err(|err| {
            metrics::inc_errors();
            warn!(
                "channel write failed: remote={}, id={}, error={err}",
                link.remote, link.id
            );
            TransportError::from(err)
        })
    }
}
