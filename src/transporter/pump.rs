//! Tasks driving the listener and each adopted channel.

use std::{
    any::Any,
    panic::AssertUnwindSafe,
    sync::{Arc, PoisonError, Weak},
};

use futures::FutureExt;
use log::{debug, error, info, warn};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use super::{ConnectionState, Link, Shared};
use crate::{
    channel::{ChannelError, ChannelEvent, ChannelSink, Incoming, Peer, RawChannel, RawMessage},
    error::{Result, TransportError},
    event::Event,
    fragment::PART_PREFIX,
    identity::PeerId,
    metrics::{self, Direction},
    session::ConnectionId,
};

/// Accept inbound channels until the listener closes or the transporter
/// shuts down.
pub(super) fn spawn_accept_loop<P: Peer>(shared: &Arc<Shared<P>>, mut incoming: Incoming) {
    let weak = Arc::downgrade(shared);
    let shutdown = shared.shutdown.clone();
    shared.tasks.spawn(async move {
        loop {
            let channel = tokio::select! {
                () = shutdown.cancelled() => break,
                channel = incoming.recv() => channel,
            };
            let Some(channel) = channel else {
                debug!("inbound listener closed");
                break;
            };
            let Some(shared) = weak.upgrade() else { break };
            info!("inbound connection: remote={}", channel.remote());
            spawn_pump(&shared, channel, None);
        }
    });
}

/// Adopt `channel` as the current link and spawn its pump.
///
/// `opened` resolves when the channel opens, closes, or fails, whichever
/// comes first.
pub(super) fn spawn_pump<P: Peer>(
    shared: &Arc<Shared<P>>,
    channel: RawChannel,
    opened: Option<oneshot::Sender<Result<()>>>,
) -> (ConnectionId, Arc<dyn ChannelSink>) {
    let id = shared.ids.next_id();
    let (remote, sink, events) = channel.into_parts();
    shared.adopt(Link {
        id,
        remote: remote.clone(),
        sink: Arc::clone(&sink),
    });

    let pump = Pump {
        shared: Arc::downgrade(shared),
        id,
        remote: remote.clone(),
        events,
        opened,
        gauge: None,
    };
    let weak = Arc::downgrade(shared);
    let shutdown = shared.shutdown.clone();
    let task_sink = Arc::clone(&sink);
    shared.tasks.spawn(async move {
        let outcome = AssertUnwindSafe(pump.run(shutdown)).catch_unwind().await;
        if let Err(panic) = outcome {
            metrics::inc_errors();
            let panic_msg = panic_message(panic.as_ref());
            // Emit via both `log` and `tracing` for tests that capture either.
            error!("connection pump panicked: panic={panic_msg}, remote={remote}, id={id}");
            tracing::error!(panic = %panic_msg, %remote, %id, "connection pump panicked");
            task_sink.close();
            if let Some(shared) = weak.upgrade() {
                shared.release(id);
            }
        }
    });
    (id, sink)
}

/// Text of a caught panic payload, for the log line.
fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&'static str>().copied())
        .unwrap_or("non-string panic payload")
}

/// Holds the open-channels gauge up while a channel is open.
struct OpenGauge;

impl OpenGauge {
    fn raise() -> Self {
        metrics::inc_connections();
        Self
    }
}

impl Drop for OpenGauge {
    fn drop(&mut self) { metrics::dec_connections(); }
}

struct Pump<P> {
    shared: Weak<Shared<P>>,
    id: ConnectionId,
    remote: PeerId,
    events: mpsc::UnboundedReceiver<ChannelEvent>,
    opened: Option<oneshot::Sender<Result<()>>>,
    gauge: Option<OpenGauge>,
}

impl<P: Peer> Pump<P> {
    async fn run(mut self, shutdown: CancellationToken) {
        loop {
            let event = tokio::select! {
                () = shutdown.cancelled() => {
                    debug!("connection pump cancelled: id={}", self.id);
                    return;
                }
                event = self.events.recv() => event,
            };
            let Some(shared) = self.shared.upgrade() else { return };
            match event {
                Some(ChannelEvent::Open) => self.on_open(&shared),
                Some(ChannelEvent::Data(message)) => shared.on_data(self.id, &message),
                Some(ChannelEvent::Error(err)) => {
                    self.on_error(&shared, err);
                    return;
                }
                Some(ChannelEvent::Close) | None => {
                    self.on_close(&shared);
                    return;
                }
            }
        }
    }

    fn on_open(&mut self, shared: &Shared<P>) {
        if self.gauge.is_none() {
            self.gauge = Some(OpenGauge::raise());
        }
        if shared.is_current(self.id) {
            shared.set_state(ConnectionState::Open);
            info!("connection open: remote={}, id={}", self.remote, self.id);
        } else {
            debug!("superseded connection opened: remote={}, id={}", self.remote, self.id);
        }
        self.resolve(Ok(()));
    }

    fn on_error(&mut self, shared: &Shared<P>, err: ChannelError) {
        metrics::inc_errors();
        warn!("channel error: remote={}, id={}, error={err}", self.remote, self.id);
        shared.release(self.id);
        self.resolve(Err(err.into()));
    }

    fn on_close(&mut self, shared: &Shared<P>) {
        info!("connection closed: remote={}, id={}", self.remote, self.id);
        shared.release(self.id);
        self.resolve(Err(TransportError::ConnectionClosed));
    }

    fn resolve(&mut self, outcome: Result<()>) {
        if let Some(opened) = self.opened.take() {
            let _ = opened.send(outcome);
        }
    }
}

impl<P> Shared<P> {
    /// Reassemble one inbound message and dispatch any completed envelope.
    fn on_data(&self, id: ConnectionId, message: &RawMessage) {
        if matches!(message, RawMessage::Text(text) if text.starts_with(PART_PREFIX)) {
            metrics::inc_fragments(Direction::Inbound, 1);
        }
        let decoded = self
            .reassembler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .on_message(message);
        match decoded {
            Ok(Some(event)) => self.deliver(&event),
            Ok(None) => {}
            Err(err) => {
                metrics::inc_errors();
                warn!("dropping undecodable message: id={id}, error={err}");
            }
        }
    }

    fn deliver(&self, event: &Event) {
        metrics::inc_envelopes(Direction::Inbound);
        match self.bus.dispatch(event) {
            Ok(0) => debug!("no handlers registered: kind={}", event.kind()),
            Ok(_) => {}
            Err(err) => {
                metrics::inc_errors();
                error!("event handler failed: error={err}");
            }
        }
    }
}
