use std::{fmt, num::NonZeroU32};

use super::{PART_DELIMITER, PART_PREFIX, PartIndex};

/// Positional metadata carried in front of every part.
///
/// `count` is shared by all parts of one transmission; `index` is unique
/// within it and never exceeds `count`.
///
/// # Examples
///
/// ```
/// use std::num::NonZeroU32;
///
/// use peerframe::fragment::{PartHeader, PartIndex};
/// let count = NonZeroU32::new(3).expect("non-zero");
/// let header = PartHeader::new(PartIndex::first(), count).expect("index within count");
/// assert_eq!(header.to_string(), "part1-3endpart;");
/// assert!(!header.is_last());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PartHeader {
    index: PartIndex,
    count: NonZeroU32,
}

impl PartHeader {
    /// Create a header, returning `None` when `index` exceeds `count`.
    #[must_use]
    pub fn new(index: PartIndex, count: NonZeroU32) -> Option<Self> {
        (index.get() <= count.get()).then_some(Self { index, count })
    }

    /// Position of this part.
    #[must_use]
    pub const fn index(&self) -> PartIndex { self.index }

    /// Total number of parts in the transmission.
    #[must_use]
    pub const fn count(&self) -> NonZeroU32 { self.count }

    /// Report whether this is the final part by position.
    #[must_use]
    pub fn is_last(&self) -> bool { self.index.get() == self.count.get() }
}

impl fmt::Display for PartHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PART_PREFIX}{}-{}{PART_DELIMITER}", self.index, self.count)
    }
}
