//! Utilities for exercising [`peerframe`] transporters in tests.
//!
//! [`SessionPair`] starts both roles of a session over one
//! [`MemoryNetwork`](peerframe::MemoryNetwork), and [`EventRecorder`] turns
//! handler callbacks into an awaitable queue.
//!
//! ```rust
//! use peerframe::EventKind;
//! use peerframe_testing::{EventRecorder, SessionPair};
//!
//! # async fn example() -> peerframe::Result<()> {
//! let pair = SessionPair::start("room").await?;
//! let mut started = EventRecorder::attach(&pair.embed, &[EventKind::Start]);
//! pair.app.send_start().await?;
//! assert!(started.next().await.is_some());
//! # Ok(())
//! # }
//! ```

pub mod logging;
pub mod session;

pub use logging::{LoggerHandle, logger};
pub use session::{
    EventRecorder,
    RECV_TIMEOUT,
    SessionPair,
    TestBuilder,
    TestTransporter,
    oversized_record,
};
