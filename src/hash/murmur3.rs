//! Murmur3-style 32-bit hashing.
//!
//! The runtime needs hashes whose low 5-bit slices are well distributed
//! even for poorly hashed inputs such as small sequential integers, since
//! each trie level consumes one slice. Every scalar and collection hash in
//! the crate therefore goes through the same `mix_k1` / `mix_h1` / `fmix`
//! chain with a zero seed.
//!
//! # Examples
//!
//! ```rust
//! use lisp_hamt::hash::murmur3;
//!
//! assert_eq!(murmur3::hash_long(0), 0);
//! assert_eq!(murmur3::hash_long(1), 1_392_991_556);
//!
//! // Unordered hashing ignores element order
//! let forward = murmur3::hash_unordered([1_u32, 2, 3], |hash| hash);
//! let backward = murmur3::hash_unordered([3_u32, 2, 1], |hash| hash);
//! assert_eq!(forward, backward);
//! ```

const SEED: u32 = 0;
const C1: u32 = 0xcc9e_2d51;
const C2: u32 = 0x1b87_3593;

/// Scrambles one 32-bit block before it is folded into the running hash.
#[inline]
#[must_use]
pub const fn mix_k1(k1: u32) -> u32 {
    let k1 = k1.wrapping_mul(C1);
    let k1 = k1.rotate_left(15);
    k1.wrapping_mul(C2)
}

/// Folds a scrambled block into the running hash.
#[inline]
#[must_use]
pub const fn mix_h1(h1: u32, k1: u32) -> u32 {
    let h1 = h1 ^ k1;
    let h1 = h1.rotate_left(13);
    h1.wrapping_mul(5).wrapping_add(0xe654_6b64)
}

/// Final avalanche, mixing in the input length.
#[inline]
#[must_use]
pub const fn fmix(h1: u32, length: u32) -> u32 {
    let mut h1 = h1 ^ length;
    h1 ^= h1 >> 16;
    h1 = h1.wrapping_mul(0x85eb_ca6b);
    h1 ^= h1 >> 13;
    h1 = h1.wrapping_mul(0xc2b2_ae35);
    h1 ^= h1 >> 16;
    h1
}

/// Hashes a 32-bit integer. Zero hashes to zero.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub const fn hash_int(input: i32) -> u32 {
    if input == 0 {
        return 0;
    }
    let k1 = mix_k1(input as u32);
    let h1 = mix_h1(SEED, k1);
    fmix(h1, 4)
}

/// Hashes a 64-bit integer, low word first. Zero hashes to zero.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub const fn hash_long(input: i64) -> u32 {
    if input == 0 {
        return 0;
    }
    let bits = input as u64;
    let low = bits as u32;
    let high = (bits >> 32) as u32;

    let mut h1 = mix_h1(SEED, mix_k1(low));
    h1 = mix_h1(h1, mix_k1(high));
    fmix(h1, 8)
}

/// Hashes a string as a sequence of UTF-16 code units, two units per block.
///
/// A trailing odd unit is mixed in without the `mix_h1` rotation, and the
/// final length is twice the unit count (the byte length of the UTF-16
/// encoding).
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn hash_unencoded_chars(input: &str) -> u32 {
    let mut h1 = SEED;
    let mut units = input.encode_utf16();
    let mut length: u32 = 0;

    loop {
        match (units.next(), units.next()) {
            (Some(first), Some(second)) => {
                let k1 = u32::from(first) | (u32::from(second) << 16);
                h1 = mix_h1(h1, mix_k1(k1));
                length = length.wrapping_add(2);
            }
            (Some(last), None) => {
                h1 ^= mix_k1(u32::from(last));
                length = length.wrapping_add(1);
                break;
            }
            _ => break,
        }
    }

    fmix(h1, length.wrapping_mul(2))
}

/// Re-mixes a combined collection hash with the element count.
#[inline]
#[must_use]
pub const fn mix_coll_hash(hash: u32, count: u32) -> u32 {
    let k1 = mix_k1(hash);
    let h1 = mix_h1(SEED, k1);
    fmix(h1, count)
}

/// Order-sensitive collection hash: `hash = 31 * hash + element_hash(x)`.
#[must_use]
pub fn hash_ordered<I, F>(items: I, mut element_hash: F) -> u32
where
    I: IntoIterator,
    F: FnMut(I::Item) -> u32,
{
    let mut hash: u32 = 1;
    let mut count: u32 = 0;
    for item in items {
        hash = hash.wrapping_mul(31).wrapping_add(element_hash(item));
        count = count.wrapping_add(1);
    }
    mix_coll_hash(hash, count)
}

/// Order-insensitive collection hash: the element hashes are summed.
///
/// Maps and sets use this so that equal contents hash equally whatever
/// their insertion history or trie layout.
#[must_use]
pub fn hash_unordered<I, F>(items: I, mut element_hash: F) -> u32
where
    I: IntoIterator,
    F: FnMut(I::Item) -> u32,
{
    let mut hash: u32 = 0;
    let mut count: u32 = 0;
    for item in items {
        hash = hash.wrapping_add(element_hash(item));
        count = count.wrapping_add(1);
    }
    mix_coll_hash(hash, count)
}
