//! One-based part positioning within a fragmented transmission.
//!
//! Provides [`PartIndex`], a type-safe wrapper around a non-zero `u32` so a
//! zero index can never be constructed.

use std::num::NonZeroU32;

use derive_more::{Display, From};

/// One-based ordinal describing a part's position within its transmission.
///
/// # Examples
///
/// ```
/// use peerframe::fragment::PartIndex;
/// let index = PartIndex::first();
/// assert_eq!(index.get(), 1);
/// assert_eq!(index.slot(), 0);
/// assert_eq!(PartIndex::new(0), None);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From)]
#[display("{_0}")]
pub struct PartIndex(NonZeroU32);

impl PartIndex {
    /// Construct an index, rejecting zero.
    #[must_use]
    pub const fn new(value: u32) -> Option<Self> {
        match NonZeroU32::new(value) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }

    /// Return the first valid part index.
    #[must_use]
    pub const fn first() -> Self { Self(NonZeroU32::MIN) }

    /// Return the underlying numeric value.
    #[must_use]
    pub const fn get(self) -> u32 { self.0.get() }

    /// Zero-based slot this part occupies in a reassembly buffer.
    #[must_use]
    pub const fn slot(self) -> usize { (self.0.get() - 1) as usize }

    /// Increment the index, returning `None` on overflow.
    #[must_use]
    pub fn checked_increment(self) -> Option<Self> { self.0.checked_add(1).map(Self) }
}

impl From<PartIndex> for u32 {
    fn from(value: PartIndex) -> Self { value.get() }
}
