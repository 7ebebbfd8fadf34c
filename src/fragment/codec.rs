//! Text encoding for parts carried over the channel.
//!
//! A part is the header text `part{index}-{count}endpart;` immediately
//! followed by the raw chunk. Decoding splits on the first delimiter only:
//! the header grammar is restricted to ASCII digits and a dash, so the first
//! `endpart;` always terminates the header and the chunk may contain the
//! delimiter text without corrupting reassembly.

use std::num::NonZeroU32;

use super::{PartDecodeError, PartHeader, PartIndex};

/// Literal that opens every part.
pub const PART_PREFIX: &str = "part";

/// Literal that terminates the part header.
pub const PART_DELIMITER: &str = "endpart;";

/// Encode a part for transport.
///
/// # Examples
///
/// ```
/// use std::num::NonZeroU32;
///
/// use peerframe::fragment::{PartHeader, PartIndex, encode_part};
/// let header = PartHeader::new(PartIndex::first(), NonZeroU32::new(2).expect("non-zero"))
///     .expect("index within count");
/// assert_eq!(encode_part(header, "{\"ev"), "part1-2endpart;{\"ev");
/// ```
#[must_use]
pub fn encode_part(header: PartHeader, chunk: &str) -> String {
    let header = header.to_string();
    let mut buf = String::with_capacity(header.len() + chunk.len());
    buf.push_str(&header);
    buf.push_str(chunk);
    buf
}

/// Attempt to decode a part.
///
/// Returns `Ok(Some((header, chunk)))` when `text` starts with
/// [`PART_PREFIX`] and contains [`PART_DELIMITER`], `Ok(None)` when it does
/// not look like a part at all, or an error when it looks like a part but the
/// header is invalid.
///
/// # Errors
///
/// Returns [`PartDecodeError`] when the header is not `<index>-<count>`, uses
/// zero, or places the index beyond the count.
pub fn decode_part(text: &str) -> Result<Option<(PartHeader, &str)>, PartDecodeError> {
    let Some(rest) = text.strip_prefix(PART_PREFIX) else {
        return Ok(None);
    };
    let Some((raw_header, chunk)) = rest.split_once(PART_DELIMITER) else {
        return Ok(None);
    };

    let malformed = || PartDecodeError::MalformedHeader {
        header: raw_header.to_owned(),
    };
    let (index, count) = raw_header.split_once('-').ok_or_else(malformed)?;
    let index = parse_decimal(index).ok_or_else(malformed)?;
    let count = parse_decimal(count).ok_or_else(malformed)?;

    let zero = || PartDecodeError::Zero {
        header: raw_header.to_owned(),
    };
    let index = PartIndex::new(index).ok_or_else(zero)?;
    let count = NonZeroU32::new(count).ok_or_else(zero)?;

    let header = PartHeader::new(index, count).ok_or(PartDecodeError::IndexOutOfRange {
        index: index.get(),
        count: count.get(),
    })?;
    Ok(Some((header, chunk)))
}

/// Parse ASCII decimal digits only; signs and whitespace are rejected.
fn parse_decimal(text: &str) -> Option<u32> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}
