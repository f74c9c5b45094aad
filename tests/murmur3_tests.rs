//! Reference values and properties of the murmur3 hash helpers.

use lisp_hamt::hash::HashEq;
use lisp_hamt::hash::murmur3::{
    fmix, hash_int, hash_long, hash_ordered, hash_unencoded_chars, hash_unordered, mix_coll_hash,
    mix_h1, mix_k1,
};
use proptest::prelude::*;
use rstest::rstest;

// =============================================================================
// Reference values
// =============================================================================

#[rstest]
#[case(0, 0)]
#[case(1, 4_226_891_818)]
fn test_hash_int_reference(#[case] input: i32, #[case] expected: u32) {
    assert_eq!(hash_int(input), expected);
}

#[rstest]
#[case(0, 0)]
#[case(1, 1_392_991_556)]
#[case(-1, 1_651_860_712)]
#[case(42, 1_871_679_806)]
fn test_hash_long_reference(#[case] input: i64, #[case] expected: u32) {
    assert_eq!(hash_long(input), expected);
}

#[rstest]
#[case("", 0)]
#[case("a", 1_867_108_634)]
#[case("ab", 374_890_698)]
#[case("abc", 1_118_836_419)]
fn test_hash_unencoded_chars_reference(#[case] input: &str, #[case] expected: u32) {
    assert_eq!(hash_unencoded_chars(input), expected);
}

#[rstest]
fn test_collection_combinators_reference() {
    let empty: [u32; 0] = [];
    assert_eq!(hash_ordered(empty, |hash| hash), 2_277_397_642);
    assert_eq!(hash_unordered(empty, |hash| hash), 4_279_838_538);
    assert_eq!(
        hash_ordered([1_i64, 2], |value| hash_long(value)),
        156_247_261
    );
}

// =============================================================================
// Building blocks
// =============================================================================

#[rstest]
fn test_building_blocks_compose_into_hash_int() {
    let expected = fmix(mix_h1(0, mix_k1(7)), 4);
    assert_eq!(hash_int(7), expected);
}

#[rstest]
fn test_mix_coll_hash_depends_on_count() {
    assert_ne!(mix_coll_hash(12_345, 1), mix_coll_hash(12_345, 2));
}

#[rstest]
fn test_fmix_of_zero_is_zero() {
    assert_eq!(fmix(0, 0), 0);
}

#[rstest]
fn test_string_hash_uses_utf16_units() {
    // One astral character is two UTF-16 units, hashed as a single block.
    let astral = "\u{1F600}";
    let units: Vec<u16> = astral.encode_utf16().collect();
    let block = u32::from(units[0]) | (u32::from(units[1]) << 16);
    assert_eq!(hash_unencoded_chars(astral), fmix(mix_h1(0, mix_k1(block)), 4));
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn prop_unordered_ignores_order(mut hashes in prop::collection::vec(any::<u32>(), 0..40)) {
        let before = hash_unordered(hashes.iter().copied(), |hash| hash);
        hashes.reverse();
        let after = hash_unordered(hashes.iter().copied(), |hash| hash);
        prop_assert_eq!(before, after);
    }

    #[test]
    fn prop_integer_widths_agree(value in any::<i32>()) {
        prop_assert_eq!(value.hash_eq(), i64::from(value).hash_eq());
        prop_assert_eq!(value.hash_eq(), hash_long(i64::from(value)));
    }

    #[test]
    fn prop_string_and_str_agree(text in ".{0,20}") {
        prop_assert_eq!(text.hash_eq(), text.as_str().hash_eq());
        prop_assert_eq!(text.hash_eq(), hash_unencoded_chars(&text));
    }
}
