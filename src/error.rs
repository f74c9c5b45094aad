//! Error types for the persistent map.
//!
//! Trie operations themselves are total. The only failures are misuse of
//! the push iterator and the two contract checks inherited from the
//! runtime's map protocol (`assoc_ex` and pair-shaped `conj`).

use thiserror::Error;

/// Represents errors raised by the persistent map and its iterators.
///
/// None of these are transient: each one marks a caller bug and is never
/// retried inside the crate.
///
/// # Examples
///
/// ```rust
/// use lisp_hamt::error::HamtError;
///
/// let error = HamtError::InvalidPair { length: 3 };
/// assert_eq!(
///     error.to_string(),
///     "vector arg to map conj must be a pair, got 3 elements"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HamtError {
    /// `next_entry` was called on an exhausted push iterator.
    #[error("iterator reached the end of collection")]
    IteratorExhausted,

    /// `assoc_ex` was called with a key the map already contains.
    #[error("key already present")]
    KeyAlreadyPresent,

    /// A vector conj'ed into a map did not hold exactly a key and a value.
    #[error("vector arg to map conj must be a pair, got {length} elements")]
    InvalidPair {
        /// Number of elements the vector actually held.
        length: usize,
    },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, HamtError>;
