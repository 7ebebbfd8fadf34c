//! Outbound helper that splits serialized envelopes into parts.
//!
//! [`Fragmenter`] caps each chunk at a fixed number of characters. Text that
//! already fits yields no parts at all and is sent unfragmented by the
//! caller. Chunks are cut on `char` boundaries so every part is valid UTF-8
//! on its own.

use std::num::{NonZeroU32, NonZeroUsize};

use super::{FragmentationError, PartHeader, PartIndex, encode_part};

/// Splits serialized envelopes into size-bounded parts.
#[derive(Clone, Copy, Debug)]
pub struct Fragmenter {
    max_len: NonZeroUsize,
}

impl Fragmenter {
    /// Create a fragmenter whose chunks hold at most `max_len` characters.
    #[must_use]
    pub const fn new(max_len: NonZeroUsize) -> Self { Self { max_len } }

    /// Return the chunk size bound in characters.
    #[must_use]
    pub const fn max_len(&self) -> NonZeroUsize { self.max_len }

    /// Split `serialized` into parts.
    ///
    /// Returns an empty vector when `serialized` holds at most `max_len`
    /// characters. Otherwise returns `ceil(chars / max_len)` parts in index
    /// order, all sharing the same count.
    ///
    /// # Errors
    ///
    /// Returns [`FragmentationError::TooManyParts`] if the part count does
    /// not fit in a `u32`.
    pub fn fragment<'a>(&self, serialized: &'a str) -> Result<Vec<Part<'a>>, FragmentationError> {
        let max = self.max_len.get();
        let chars = serialized.chars().count();
        if chars <= max {
            return Ok(Vec::new());
        }

        let count = u32::try_from(chars.div_ceil(max))
            .ok()
            .and_then(NonZeroU32::new)
            .ok_or(FragmentationError::TooManyParts { chars })?;

        let mut parts = Vec::with_capacity(count.get() as usize);
        let mut index = PartIndex::first();
        let mut rest = serialized;
        while !rest.is_empty() {
            let end = rest
                .char_indices()
                .nth(max)
                .map_or(rest.len(), |(offset, _)| offset);
            let (chunk, tail) = rest.split_at(end);
            let header =
                PartHeader::new(index, count).ok_or(FragmentationError::TooManyParts { chars })?;
            parts.push(Part { header, chunk });
            rest = tail;
            if let Some(next) = index.checked_increment() {
                index = next;
            }
        }

        debug_assert_eq!(parts.len(), count.get() as usize);
        Ok(parts)
    }
}

/// Split `serialized` into parts of at most `max_len` characters.
///
/// Convenience wrapper around [`Fragmenter::fragment`].
///
/// # Examples
///
/// ```
/// use std::num::NonZeroUsize;
///
/// use peerframe::fragment::fragment;
/// let max = NonZeroUsize::new(4).expect("non-zero");
/// assert!(fragment("abcd", max).expect("fits").is_empty());
///
/// let parts = fragment("abcdefghij", max).expect("split");
/// let encoded: Vec<String> = parts.iter().map(|part| part.encode()).collect();
/// assert_eq!(
///     encoded,
///     ["part1-3endpart;abcd", "part2-3endpart;efgh", "part3-3endpart;ij"]
/// );
/// ```
///
/// # Errors
///
/// See [`Fragmenter::fragment`].
pub fn fragment(serialized: &str, max_len: NonZeroUsize) -> Result<Vec<Part<'_>>, FragmentationError> {
    Fragmenter::new(max_len).fragment(serialized)
}

/// One outbound part borrowing its chunk from the serialized envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Part<'a> {
    header: PartHeader,
    chunk: &'a str,
}

impl<'a> Part<'a> {
    /// Return the part header.
    #[must_use]
    pub const fn header(&self) -> PartHeader { self.header }

    /// Return the chunk text.
    #[must_use]
    pub const fn chunk(&self) -> &'a str { self.chunk }

    /// Encode the part as a channel message.
    #[must_use]
    pub fn encode(&self) -> String { encode_part(self.header, self.chunk) }
}
