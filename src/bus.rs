//! Synchronous pub/sub dispatch keyed by [`EventKind`].
//!
//! [`EventBus`] keeps one handler list per kind in a fixed table. Handlers
//! are appended in subscription order and never removed. Dispatch runs every
//! handler registered for the event's kind on the caller's task, in order;
//! the first handler to fail stops the dispatch and its error is returned to
//! the caller, so later handlers in the same list are not invoked.

use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;

use crate::event::{Event, EventKind};

/// Error type handlers may return.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Callback invoked for every dispatched event of its kind.
pub type Handler = Arc<dyn Fn(&Event) -> Result<(), HandlerError> + Send + Sync>;

/// A handler failed while an event was being dispatched.
#[derive(Debug, Error)]
#[error("handler {position} for {kind} failed: {source}")]
pub struct DispatchError {
    /// Kind of the event being dispatched.
    pub kind: EventKind,
    /// Zero-based position of the failing handler in the kind's list.
    pub position: usize,
    /// Error returned by the handler.
    #[source]
    pub source: HandlerError,
}

/// Subscription table mapping each kind to its ordered handler list.
#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<[Vec<Handler>; EventKind::COUNT]>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        let mut map = f.debug_map();
        for kind in EventKind::ALL {
            map.entry(&kind.as_str(), &handlers[kind.index()].len());
        }
        map.finish()
    }
}

impl EventBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Append `handler` to the list for `kind`.
    ///
    /// The same closure may be registered more than once; each registration
    /// is invoked separately.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&Event) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let mut handlers = self
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        handlers[kind.index()].push(Arc::new(handler));
    }

    /// Number of handlers registered for `kind`.
    #[must_use]
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)[kind.index()]
        .len()
    }

    /// Invoke every handler registered for the event's kind, in order.
    ///
    /// The handler list is snapshotted before the first call, so handlers may
    /// subscribe further handlers without deadlocking; those only see later
    /// events. Returns the number of handlers invoked.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] for the first handler that fails. Handlers
    /// after it are skipped.
    pub fn dispatch(&self, event: &Event) -> Result<usize, DispatchError> {
        let kind = event.kind();
        let snapshot: Vec<Handler> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)[kind.index()]
        .clone();

        for (position, handler) in snapshot.iter().enumerate() {
            handler(event).map_err(|source| DispatchError {
                kind,
                position,
                source,
            })?;
        }
        tracing::trace!(%kind, handlers = snapshot.len(), "event dispatched");
        Ok(snapshot.len())
    }
}
