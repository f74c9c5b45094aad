//! Persistent (immutable) data structures.
//!
//! - [`PersistentHashMap`]: persistent hash map (HAMT)
//!
//! # Structural Sharing
//!
//! Deriving a new map with [`PersistentHashMap::assoc`] or
//! [`PersistentHashMap::without`] copies only the nodes on the path from
//! the root to the touched slot. Everything else is shared with the
//! original, which stays valid and unchanged.
//!
//! # Examples
//!
//! ```rust
//! use lisp_hamt::persistent::PersistentHashMap;
//!
//! let map = PersistentHashMap::new()
//!     .assoc("one".to_string(), 1)
//!     .assoc("two".to_string(), 2);
//! assert_eq!(map.val_at("one"), Some(&1));
//!
//! // Structural sharing: the original map is preserved
//! let updated = map.assoc("one".to_string(), 100);
//! assert_eq!(map.val_at("one"), Some(&1));       // Original unchanged
//! assert_eq!(updated.val_at("one"), Some(&100)); // New version
//! ```

// =============================================================================
// Reference Counter Type Alias
// =============================================================================

/// Reference-counted smart pointer type.
///
/// When the `arc` feature is enabled, this is `std::sync::Arc`,
/// which is thread-safe but has slightly higher overhead.
///
/// When the `arc` feature is disabled (default), this is `std::rc::Rc`,
/// which is faster but not thread-safe.
#[cfg(feature = "arc")]
pub(crate) type ReferenceCounter<T> = std::sync::Arc<T>;

#[cfg(not(feature = "arc"))]
pub(crate) type ReferenceCounter<T> = std::rc::Rc<T>;

/// Write-once cell holding a lazily computed hash.
///
/// Follows the same switch as [`ReferenceCounter`]: `OnceLock` when maps
/// must be shareable across threads, `OnceCell` otherwise.
#[cfg(feature = "arc")]
pub(crate) type HashCache = std::sync::OnceLock<u32>;

#[cfg(not(feature = "arc"))]
pub(crate) type HashCache = std::cell::OnceCell<u32>;

mod hashmap;

pub use hashmap::ArrayNodeIterator;
pub use hashmap::ArrayNodeSeq;
pub use hashmap::Conjable;
pub use hashmap::MapEntry;
pub use hashmap::MapIterator;
pub use hashmap::MapSeq;
pub use hashmap::MapSeqIterator;
pub use hashmap::NodeIterator;
pub use hashmap::NodeSeq;
pub use hashmap::PersistentHashMap;
pub use hashmap::PersistentHashMapIntoIterator;
pub use hashmap::PersistentHashMapIterator;
pub use hashmap::TrieIterator;

// =============================================================================
// Tests
// =============================================================================
