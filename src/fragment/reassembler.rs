//! Inbound helper that stitches parts back into complete envelopes.
//!
//! [`ReassemblyBuffer`] is the per-connection slot array: chunks land in the
//! slot named by their index, and the buffer flushes the moment every slot
//! of the advertised count is filled. [`Reassembler`] wraps the buffer with
//! the policy around it: parsing channel messages, capping the part count,
//! evicting stale partial transmissions, and decoding the finished text into
//! an [`Event`].

use std::{
    num::NonZeroU32,
    time::{Duration, Instant},
};

use log::{debug, warn};

use super::{PartHeader, PartIndex, ReassemblyError, decode_part};
use crate::{channel::RawMessage, event::Event};

/// Slot array for a single in-flight fragmented transmission.
///
/// The buffer holds state for at most one transmission. A part advertising a
/// different count than the buffered ones starts a new transmission and
/// discards the old partial state. A part landing on an occupied slot
/// replaces the chunk without counting towards completion, so duplicates
/// cannot trigger an early flush.
///
/// The chunks of the last flushed transmission are remembered until the next
/// transmission starts. While the buffer is empty, a part repeating one of
/// those chunks at the same index and count is a late duplicate and is
/// dropped, so it never joins the next transmission. A repeat of the first
/// part is still accepted: it starts a new transmission, and a real first
/// part arriving next replaces it without being counted.
#[derive(Debug, Default)]
pub struct ReassemblyBuffer {
    slots: Vec<Option<String>>,
    received: usize,
    count: Option<NonZeroU32>,
    started_at: Option<Instant>,
    flushed: Option<Flushed>,
}

/// Chunks of the most recently completed transmission.
#[derive(Debug)]
struct Flushed {
    count: NonZeroU32,
    chunks: Vec<String>,
}

impl ReassemblyBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Store a chunk, returning the joined text once every slot is filled.
    ///
    /// `now` stamps the start of a new transmission for eviction purposes.
    pub fn push(&mut self, header: PartHeader, chunk: &str, now: Instant) -> Option<String> {
        if self.is_late_repeat(header, chunk) {
            debug!(
                "late duplicate of a flushed part dropped: index={}, count={}",
                header.index(),
                header.count()
            );
            return None;
        }

        if let Some(count) = self.count
            && count != header.count()
        {
            warn!(
                "part count changed mid-transmission; discarding partial state: buffered={}, \
                 expected={count}, found={}",
                self.received,
                header.count()
            );
            self.reset();
        }

        if self.count.is_none() {
            self.count = Some(header.count());
            self.started_at = Some(now);
            self.flushed = None;
        }

        let slot = header.index().slot();
        if self.slots.len() <= slot {
            self.slots.resize(slot + 1, None);
        }
        let previous = self.slots[slot].replace(chunk.to_owned());
        if previous.is_some() {
            debug!("duplicate part replaced without counting: index={}", header.index());
        } else {
            self.received += 1;
        }

        if self.received < header.count().get() as usize {
            return None;
        }

        let chunks: Vec<String> = self.slots.drain(..).flatten().collect();
        let joined = chunks.concat();
        self.reset();
        self.flushed = Some(Flushed {
            count: header.count(),
            chunks,
        });
        Some(joined)
    }

    fn is_late_repeat(&self, header: PartHeader, chunk: &str) -> bool {
        self.count.is_none()
            && header.index() != PartIndex::first()
            && self.flushed.as_ref().is_some_and(|flushed| {
                flushed.count == header.count()
                    && flushed
                        .chunks
                        .get(header.index().slot())
                        .is_some_and(|previous| previous == chunk)
            })
    }

    /// Discard all buffered state, returning how many parts were dropped.
    ///
    /// This also forgets the last flushed transmission.
    pub fn reset(&mut self) -> usize {
        let dropped = self.received;
        self.slots.clear();
        self.received = 0;
        self.count = None;
        self.started_at = None;
        self.flushed = None;
        dropped
    }

    /// Number of distinct parts currently buffered.
    #[must_use]
    pub fn received(&self) -> usize { self.received }

    /// Count advertised by the buffered transmission, if any.
    #[must_use]
    pub fn expected(&self) -> Option<NonZeroU32> { self.count }

    /// Whether no transmission is in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.received == 0 }

    /// When the buffered transmission received its first part.
    #[must_use]
    pub fn started_at(&self) -> Option<Instant> { self.started_at }
}

/// Stateful inbound reassembler for one connection.
#[derive(Debug)]
pub struct Reassembler {
    buffer: ReassemblyBuffer,
    max_parts: NonZeroU32,
    timeout: Duration,
}

impl Reassembler {
    /// Create a reassembler accepting at most `max_parts` parts per
    /// transmission and evicting partial state older than `timeout`.
    #[must_use]
    pub fn new(max_parts: NonZeroU32, timeout: Duration) -> Self {
        Self {
            buffer: ReassemblyBuffer::new(),
            max_parts,
            timeout,
        }
    }

    /// Process a channel message using the current time.
    ///
    /// Returns `Ok(Some(_))` when the message is a complete envelope or the
    /// part that completes one, and `Ok(None)` while more parts are needed.
    ///
    /// # Errors
    ///
    /// Returns [`ReassemblyError`] when a part header is malformed or exceeds
    /// the part cap, or when the complete text is not a valid envelope.
    pub fn on_message(&mut self, message: &RawMessage) -> Result<Option<Event>, ReassemblyError> {
        self.on_message_at(message, Instant::now())
    }

    /// Process a channel message using an explicit clock reading.
    ///
    /// Binary messages are never parts; they are decoded as JSON directly.
    ///
    /// # Errors
    ///
    /// See [`Reassembler::on_message`].
    pub fn on_message_at(
        &mut self,
        message: &RawMessage,
        now: Instant,
    ) -> Result<Option<Event>, ReassemblyError> {
        match message {
            RawMessage::Text(text) => self.on_text_at(text, now),
            RawMessage::Binary(bytes) => Ok(Some(serde_json::from_slice(bytes)?)),
        }
    }

    /// Process a text message using an explicit clock reading.
    ///
    /// # Errors
    ///
    /// See [`Reassembler::on_message`].
    pub fn on_text_at(&mut self, text: &str, now: Instant) -> Result<Option<Event>, ReassemblyError> {
        let Some((header, chunk)) = decode_part(text)? else {
            return Ok(Some(serde_json::from_str(text)?));
        };

        if header.count() > self.max_parts {
            return Err(ReassemblyError::TooManyParts {
                count: header.count(),
                limit: self.max_parts,
            });
        }

        self.purge_expired_at(now);
        match self.buffer.push(header, chunk, now) {
            Some(joined) => Ok(Some(serde_json::from_str(&joined)?)),
            None => Ok(None),
        }
    }

    /// Drop the partial transmission if it started at least `timeout` ago.
    ///
    /// Returns the number of parts evicted.
    pub fn purge_expired_at(&mut self, now: Instant) -> usize {
        let expired = self
            .buffer
            .started_at()
            .is_some_and(|started| now.saturating_duration_since(started) >= self.timeout);
        if !expired {
            return 0;
        }
        let dropped = self.buffer.reset();
        warn!("evicted stale partial transmission: parts={dropped}");
        dropped
    }

    /// Discard any partial transmission, returning the number of parts dropped.
    pub fn reset(&mut self) -> usize { self.buffer.reset() }

    /// Borrow the underlying buffer.
    #[must_use]
    pub fn buffer(&self) -> &ReassemblyBuffer { &self.buffer }
}
