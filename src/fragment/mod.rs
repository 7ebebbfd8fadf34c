//! Splitting oversized envelopes into parts and stitching them back together.
//!
//! A serialized envelope longer than the channel's payload bound is cut into
//! consecutive chunks. Each chunk travels as one text message of the form
//! `part{index}-{count}endpart;{chunk}` with a 1-based `index`. The receiving
//! side slots chunks by index, so parts may arrive in any order, and rebuilds
//! the envelope once every slot is filled.
//!
//! Each sub-module focuses on a single concept: positional metadata, the text
//! codec, the outbound [`Fragmenter`] and the inbound [`Reassembler`].

pub mod codec;
pub mod error;
pub mod fragmenter;
pub mod header;
pub mod index;
pub mod reassembler;

pub use codec::{PART_DELIMITER, PART_PREFIX, decode_part, encode_part};
pub use error::{FragmentationError, PartDecodeError, ReassemblyError};
pub use fragmenter::{Fragmenter, Part, fragment};
pub use header::PartHeader;
pub use index::PartIndex;
pub use reassembler::{ReassemblyBuffer, Reassembler};

#[cfg(test)]
mod tests;
