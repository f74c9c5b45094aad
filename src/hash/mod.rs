//! Hashing and equivalence for map keys and values.
//!
//! The map never looks at keys directly: it asks them for a 32-bit hash and
//! compares them with an equivalence predicate, both supplied through
//! [`HashEq`]. The runtime's value types implement it; this module provides
//! the implementations for the scalar types the runtime is built from.
//!
//! Strings hash like Clojure's host string hash: murmur3 over the UTF-16
//! code units (see [`murmur3::hash_unencoded_chars`]), not an FNV-1a byte
//! hash.
//!
//! # Contract
//!
//! `a.equiv(b)` must imply `a.hash_eq() == b.hash_eq()`. The map does not
//! check this; an inconsistent implementation silently loses entries.
//!
//! # Examples
//!
//! ```rust
//! use lisp_hamt::hash::HashEq;
//!
//! // Integer widths agree on the hash of the same numeric value
//! assert_eq!(7_i32.hash_eq(), 7_i64.hash_eq());
//! assert_eq!(7_u8.hash_eq(), 7_i64.hash_eq());
//!
//! // String and str hash alike, so `String` keys can be found by `&str`
//! assert_eq!("key".hash_eq(), String::from("key").hash_eq());
//!
//! // nil hashes to zero
//! assert_eq!(None::<i64>.hash_eq(), 0);
//! ```

pub mod murmur3;

use std::rc::Rc;
use std::sync::Arc;

/// A 32-bit hash consistent with an equivalence predicate.
pub trait HashEq {
    /// Returns the hash of this value.
    fn hash_eq(&self) -> u32;

    /// Returns `true` if `self` and `other` are equivalent.
    fn equiv(&self, other: &Self) -> bool;
}

macro_rules! impl_hash_eq_integer {
    ($($integer:ty),*) => {
        $(
            impl HashEq for $integer {
                #[inline]
                fn hash_eq(&self) -> u32 {
                    murmur3::hash_long(i64::from(*self))
                }

                #[inline]
                fn equiv(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

impl_hash_eq_integer!(i8, i16, i32, i64, u8, u16, u32);

// No lossless conversion into i64: hashed by their 64-bit two's-complement pattern.
macro_rules! impl_hash_eq_bit_pattern {
    ($($integer:ty),*) => {
        $(
            impl HashEq for $integer {
                #[inline]
                #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
                fn hash_eq(&self) -> u32 {
                    murmur3::hash_long(*self as i64)
                }

                #[inline]
                fn equiv(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

impl_hash_eq_bit_pattern!(u64, usize, isize);

impl HashEq for bool {
    #[inline]
    fn hash_eq(&self) -> u32 {
        if *self { 1231 } else { 1237 }
    }

    #[inline]
    fn equiv(&self, other: &Self) -> bool {
        self == other
    }
}

impl HashEq for char {
    #[inline]
    fn hash_eq(&self) -> u32 {
        u32::from(*self)
    }

    #[inline]
    fn equiv(&self, other: &Self) -> bool {
        self == other
    }
}

impl HashEq for str {
    #[inline]
    fn hash_eq(&self) -> u32 {
        murmur3::hash_unencoded_chars(self)
    }

    #[inline]
    fn equiv(&self, other: &Self) -> bool {
        self == other
    }
}

impl HashEq for String {
    #[inline]
    fn hash_eq(&self) -> u32 {
        self.as_str().hash_eq()
    }

    #[inline]
    fn equiv(&self, other: &Self) -> bool {
        self == other
    }
}

/// nil.
impl HashEq for () {
    #[inline]
    fn hash_eq(&self) -> u32 {
        0
    }

    #[inline]
    fn equiv(&self, _other: &Self) -> bool {
        true
    }
}

/// `None` is nil and hashes to zero; `Some` is transparent.
impl<T: HashEq> HashEq for Option<T> {
    fn hash_eq(&self) -> u32 {
        self.as_ref().map_or(0, HashEq::hash_eq)
    }

    fn equiv(&self, other: &Self) -> bool {
        match (self, other) {
            (None, None) => true,
            (Some(left), Some(right)) => left.equiv(right),
            _ => false,
        }
    }
}

/// Sequential collections hash in order, like the runtime's vectors.
impl<T: HashEq> HashEq for [T] {
    fn hash_eq(&self) -> u32 {
        murmur3::hash_ordered(self, HashEq::hash_eq)
    }

    fn equiv(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .zip(other)
                .all(|(left, right)| left.equiv(right))
    }
}

impl<T: HashEq> HashEq for Vec<T> {
    #[inline]
    fn hash_eq(&self) -> u32 {
        self.as_slice().hash_eq()
    }

    #[inline]
    fn equiv(&self, other: &Self) -> bool {
        self.as_slice().equiv(other.as_slice())
    }
}

impl<T: HashEq + ?Sized> HashEq for &T {
    #[inline]
    fn hash_eq(&self) -> u32 {
        (**self).hash_eq()
    }

    #[inline]
    fn equiv(&self, other: &Self) -> bool {
        (**self).equiv(*other)
    }
}

impl<T: HashEq + ?Sized> HashEq for Box<T> {
    #[inline]
    fn hash_eq(&self) -> u32 {
        (**self).hash_eq()
    }

    #[inline]
    fn equiv(&self, other: &Self) -> bool {
        (**self).equiv(other)
    }
}

impl<T: HashEq + ?Sized> HashEq for Rc<T> {
    #[inline]
    fn hash_eq(&self) -> u32 {
        (**self).hash_eq()
    }

    fn equiv(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other) || (**self).equiv(other)
    }
}

impl<T: HashEq + ?Sized> HashEq for Arc<T> {
    #[inline]
    fn hash_eq(&self) -> u32 {
        (**self).hash_eq()
    }

    fn equiv(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other) || (**self).equiv(other)
    }
}
