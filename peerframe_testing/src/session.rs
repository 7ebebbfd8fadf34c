//! Helpers for running both roles of a session in one test.

use std::time::Duration;

use peerframe::{
    Event,
    EventKind,
    Identity,
    MemoryNetwork,
    Peer,
    Result,
    Role,
    Transporter,
    TransporterBuilder,
};
use serde_json::{Value, json};
use tokio::{sync::mpsc, time::timeout};

/// How long [`EventRecorder::next`] waits before giving up.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Transporter over the in-memory network.
pub type TestTransporter = Transporter<MemoryNetwork>;

/// Builder for a [`TestTransporter`].
pub type TestBuilder = TransporterBuilder<MemoryNetwork>;

/// Both roles of one session sharing a [`MemoryNetwork`].
#[derive(Debug)]
pub struct SessionPair {
    pub network: MemoryNetwork,
    pub app: TestTransporter,
    pub embed: TestTransporter,
}

impl SessionPair {
    /// Start both roles of `uid` with the default configuration.
    ///
    /// # Errors
    ///
    /// Propagates any failure to register either peer id.
    pub async fn start(uid: &str) -> Result<Self> {
        Self::start_with(uid, MemoryNetwork::new(), |builder| builder).await
    }

    /// Start both roles of `uid` on `network`, applying `configure` to each
    /// builder.
    ///
    /// # Errors
    ///
    /// Propagates any failure to register either peer id.
    pub async fn start_with<F>(uid: &str, network: MemoryNetwork, configure: F) -> Result<Self>
    where
        F: Fn(TestBuilder) -> TestBuilder,
    {
        let app = configure(Transporter::builder(Identity::new(uid, Role::App)))
            .build(network.clone())
            .await?;
        let embed = configure(Transporter::builder(Identity::new(uid, Role::Embed)))
            .build(network.clone())
            .await?;
        Ok(Self {
            network,
            app,
            embed,
        })
    }

    /// Shut both sides down.
    pub async fn shutdown(self) {
        self.app.shutdown().await;
        self.embed.shutdown().await;
    }
}

/// Collects dispatched events into a queue tests can await.
#[derive(Debug)]
pub struct EventRecorder {
    rx: mpsc::UnboundedReceiver<Event>,
}

impl EventRecorder {
    /// Subscribe to each of `kinds` on `transporter`.
    pub fn attach<P: Peer>(transporter: &Transporter<P>, kinds: &[EventKind]) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        for &kind in kinds {
            let tx = tx.clone();
            transporter.on(kind, move |event| {
                tx.send(event.clone())?;
                Ok(())
            });
        }
        Self { rx }
    }

    /// Subscribe to every kind.
    pub fn all<P: Peer>(transporter: &Transporter<P>) -> Self {
        Self::attach(transporter, &EventKind::ALL)
    }

    /// Wait up to [`RECV_TIMEOUT`] for the next event.
    pub async fn next(&mut self) -> Option<Event> {
        timeout(RECV_TIMEOUT, self.rx.recv()).await.ok().flatten()
    }

    /// Whether no event arrives within `window`.
    pub async fn is_quiet_for(&mut self, window: Duration) -> bool {
        timeout(window, self.rx.recv()).await.is_err()
    }

    /// Take every event already recorded.
    pub fn drain(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}

/// A record whose serialized envelope exceeds `chars` characters.
#[must_use]
pub fn oversized_record(chars: usize) -> Value { json!({ "type": 3, "data": "x".repeat(chars) }) }
