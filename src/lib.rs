//! # lisp-hamt
//!
//! The persistent hash map at the core of a Lisp-family language runtime.
//!
//! ## Overview
//!
//! The runtime's reader, analyzer, evaluator and namespaces all consume maps
//! through a narrow associative contract. This crate provides that map:
//!
//! - **Hashing**: murmur3-style avalanche mixing and the ordered/unordered
//!   collection hash combinators ([`hash::murmur3`])
//! - **Equality contract**: the [`hash::HashEq`] trait through which keys
//!   supply a 32-bit hash and an equivalence predicate
//! - **Persistent map**: [`persistent::PersistentHashMap`], an immutable
//!   Hash Array Mapped Trie with structural sharing
//! - **Traversal**: a lazy persistent sequence ([`persistent::MapSeq`]) and
//!   a push iterator ([`persistent::MapIterator`])
//!
//! ## Feature Flags
//!
//! - `arc`: share nodes through `Arc` so maps are `Send + Sync`
//! - `serde`: serialize and deserialize maps
//! - `full`: enable all features
//!
//! ## Example
//!
//! ```rust
//! use lisp_hamt::prelude::*;
//!
//! let map = PersistentHashMap::new().assoc(0_i64, "a").assoc(1_i64, "b");
//! assert_eq!(map.val_at(&0), Some(&"a"));
//! assert_eq!(map.count(), 2);
//!
//! let smaller = map.without(&0);
//! assert_eq!(smaller.val_at(&0), None);
//! assert_eq!(map.count(), 2); // the original is untouched
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_closure_for_method_calls)]

/// Prelude module for convenient imports.
///
/// # Usage
///
/// ```rust
/// use lisp_hamt::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{HamtError, Result};
    pub use crate::hash::HashEq;
    pub use crate::persistent::*;
}

pub mod error;
pub mod hash;
pub mod persistent;
