//! Tests for outbound fragmentation.

use std::num::NonZeroUsize;

use rstest::rstest;

use crate::fragment::{Fragmenter, Part, PartIndex, fragment};

fn max(len: usize) -> NonZeroUsize { NonZeroUsize::new(len).expect("non-zero") }

fn assert_part(parts: &[Part<'_>], position: usize, chunk: &str, count: u32) {
    let part = parts.get(position).expect("part missing at requested position");
    assert_eq!(part.chunk(), chunk);
    assert_eq!(part.header().count().get(), count);
    assert_eq!(
        part.header().index(),
        PartIndex::new(u32::try_from(position + 1).expect("position fits u32"))
            .expect("non-zero index")
    );
}

#[rstest]
#[case("")]
#[case("abc")]
#[case("abcd")]
fn text_within_bound_yields_no_parts(#[case] text: &str) {
    let parts = fragment(text, max(4)).expect("fragment text");
    assert!(parts.is_empty());
}

#[test]
fn fragmenter_splits_into_consecutive_chunks() {
    let parts = Fragmenter::new(max(3))
        .fragment("abcdefgh")
        .expect("fragment text");

    assert_eq!(parts.len(), 3);
    assert_part(&parts, 0, "abc", 3);
    assert_part(&parts, 1, "def", 3);
    assert_part(&parts, 2, "gh", 3);
    assert!(parts.last().expect("last part").header().is_last());
}

#[test]
fn exact_multiple_has_no_empty_trailing_part() {
    let parts = fragment("abcdef", max(3)).expect("fragment text");
    assert_eq!(parts.len(), 2);
    assert_part(&parts, 1, "def", 2);
}

#[test]
fn chunks_are_cut_on_char_boundaries() {
    let text = "héllo wörld ✓✓";
    let parts = fragment(text, max(4)).expect("fragment text");

    let chunks: Vec<&str> = parts.iter().map(Part::chunk).collect();
    assert_eq!(chunks, ["héll", "o wö", "rld ", "✓✓"]);
    assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 4));
}

#[test]
fn large_envelope_splits_into_three_parts() {
    let text = "x".repeat(500_000);
    let parts = fragment(&text, max(200_000)).expect("fragment text");

    assert_eq!(parts.len(), 3);
    assert!(parts.iter().all(|part| part.header().count().get() == 3));
    let joined: String = parts.iter().map(Part::chunk).collect();
    assert_eq!(joined, text);
    assert_eq!(parts[2].chunk().len(), 100_000);
}

#[test]
fn encoded_parts_carry_the_header() {
    let parts = fragment("abcdefg", max(4)).expect("fragment text");
    let encoded: Vec<String> = parts.iter().map(Part::encode).collect();
    assert_eq!(encoded, ["part1-2endpart;abcd", "part2-2endpart;efg"]);
}
