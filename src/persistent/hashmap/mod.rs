//! Persistent (immutable) hash map based on HAMT.
//!
//! This module provides [`PersistentHashMap`], the associative collection of
//! the runtime. Keys are hashed through [`HashEq`] and located in a 32-way
//! trie, one 5-bit slice of the hash per level.
//!
//! - O(log32 N) `val_at`, `assoc` and `without`
//! - O(1) `count` and `is_empty`
//! - O(1) repeated `hash_eq` (cached per map value)
//!
//! # Internal Structure
//!
//! The trie is made of three node kinds (see the `node` module): sparse
//! bitmap nodes, dense 32-slot array nodes and hash collision nodes. A
//! bitmap node that would receive a 17th slice is promoted to an array
//! node; an array node left with too few children is packed back into a
//! bitmap node.
//!
//! # Examples
//!
//! ```rust
//! use lisp_hamt::persistent::PersistentHashMap;
//!
//! let empty: PersistentHashMap<i64, &str> = PersistentHashMap::new();
//! let one = empty.assoc(0, "a");
//! let two = one.assoc(1, "b");
//!
//! assert_eq!(two.count(), 2);
//! assert_eq!(two.val_at(&0), Some(&"a"));
//!
//! let removed = two.without(&0);
//! assert_eq!(removed.count(), 1);
//! assert_eq!(removed.val_at(&0), None);
//! assert_eq!(two.val_at(&0), Some(&"a"));
//! ```

mod conj;
mod entry;
mod iterator;
mod node;
mod seq;

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};

pub use conj::Conjable;
pub use entry::MapEntry;
pub use iterator::{ArrayNodeIterator, MapIterator, NodeIterator, TrieIterator};
pub use seq::{ArrayNodeSeq, MapSeq, MapSeqIterator, NodeSeq};

use super::{HashCache, ReferenceCounter};
use crate::error::{HamtError, Result};
use crate::hash::{HashEq, murmur3};
use entry::entry_hash;
use node::{Node, NodeRef};

// =============================================================================
// PersistentHashMap Definition
// =============================================================================

/// A persistent (immutable) hash map based on HAMT.
///
/// Every update returns a new map; the receiver is left untouched and keeps
/// sharing all unchanged subtrees with the result.
///
/// # Time Complexity
///
/// | Operation      | Complexity        |
/// |----------------|-------------------|
/// | `new`          | O(1)              |
/// | `val_at`       | O(log32 N)        |
/// | `assoc`        | O(log32 N)        |
/// | `without`      | O(log32 N)        |
/// | `contains_key` | O(log32 N)        |
/// | `count`        | O(1)              |
/// | `hash_eq`      | O(N), then O(1)   |
///
/// # Examples
///
/// ```rust
/// use lisp_hamt::persistent::PersistentHashMap;
///
/// let map = PersistentHashMap::singleton("key".to_string(), 42);
/// assert_eq!(map.val_at("key"), Some(&42));
/// ```
pub struct PersistentHashMap<K, V> {
    meta: Option<ReferenceCounter<Self>>,
    count: usize,
    root: Option<NodeRef<K, V>>,
    hash_eq_cache: HashCache,
    map_hash_cache: HashCache,
}

impl<K, V> PersistentHashMap<K, V> {
    /// Creates a new empty map. Allocates nothing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use lisp_hamt::persistent::PersistentHashMap;
    ///
    /// let map: PersistentHashMap<String, i32> = PersistentHashMap::new();
    /// assert!(map.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            meta: None,
            count: 0,
            root: None,
            hash_eq_cache: HashCache::new(),
            map_hash_cache: HashCache::new(),
        }
    }

    /// Returns the number of entries.
    #[inline]
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Returns `true` if the map holds no entry.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns the metadata attached to this map.
    #[inline]
    #[must_use]
    pub fn meta(&self) -> Option<&Self> {
        self.meta.as_deref()
    }

    /// Returns an empty map carrying this map's metadata.
    #[must_use]
    pub fn empty(&self) -> Self {
        Self {
            meta: self.meta.clone(),
            ..Self::new()
        }
    }

    /// Finds the entry for `key`.
    ///
    /// The key may be any borrowed form of the map's key type.
    pub fn find<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: HashEq + ?Sized,
    {
        self.root
            .as_ref()
            .and_then(|root| root.find(0, key.hash_eq(), key))
    }

    /// Returns a reference to the value for `key`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use lisp_hamt::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::singleton(String::from("key"), 1);
    /// assert_eq!(map.val_at("key"), Some(&1));
    /// assert_eq!(map.val_at("other"), None);
    /// ```
    pub fn val_at<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: HashEq + ?Sized,
    {
        self.find(key).map(|(_, value)| value)
    }

    /// Returns the value for `key`, or `default` when the key is absent.
    pub fn val_at_or<'a, Q>(&'a self, key: &Q, default: &'a V) -> &'a V
    where
        K: Borrow<Q>,
        Q: HashEq + ?Sized,
    {
        self.val_at(key).unwrap_or(default)
    }

    /// Returns `true` if the map contains `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: HashEq + ?Sized,
    {
        self.find(key).is_some()
    }

    /// Returns a lazy persistent sequence over the entries, or `None` when
    /// the map is empty.
    #[must_use]
    pub fn seq(&self) -> Option<MapSeq<K, V>> {
        self.root.as_ref().and_then(MapSeq::from_node)
    }

    /// Returns a push iterator over the entries.
    #[must_use]
    pub fn push_iter(&self) -> TrieIterator<'_, K, V> {
        TrieIterator::from_root(self.root.as_ref())
    }

    /// Returns an iterator over borrowed key/value pairs.
    #[must_use]
    pub fn iter(&self) -> PersistentHashMapIterator<'_, K, V> {
        PersistentHashMapIterator {
            inner: self.push_iter(),
            remaining: self.count,
        }
    }

    /// Returns an iterator over the keys.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(key, _)| key)
    }

    /// Returns an iterator over the values.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }

    /// Folds the entries into an accumulator, in sequence order.
    pub fn reduce_init<A, F>(&self, init: A, mut function: F) -> A
    where
        F: FnMut(A, &K, &V) -> A,
    {
        self.iter()
            .fold(init, |accumulator, (key, value)| function(accumulator, key, value))
    }

    /// Returns `true` if both maps are backed by the same trie.
    fn shares_root_with(&self, other: &Self) -> bool {
        match (&self.root, &other.root) {
            (None, None) => true,
            (Some(left), Some(right)) => ReferenceCounter::ptr_eq(left, right),
            _ => false,
        }
    }

    fn with_root(&self, root: Option<NodeRef<K, V>>, count: usize) -> Self {
        Self {
            meta: self.meta.clone(),
            count,
            root,
            hash_eq_cache: HashCache::new(),
            map_hash_cache: HashCache::new(),
        }
    }
}

impl<K: HashEq, V: PartialEq> PersistentHashMap<K, V> {
    /// Returns a map with the same entries and `meta` as metadata.
    ///
    /// Passing metadata equal to the current metadata returns a plain copy
    /// of this map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use lisp_hamt::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::singleton("x", 1);
    /// let tagged = map.with_meta(Some(PersistentHashMap::singleton("line", 7)));
    ///
    /// assert_eq!(tagged, map);
    /// assert_eq!(tagged.meta().and_then(|meta| meta.val_at(&"line")), Some(&7));
    /// assert!(map.meta().is_none());
    /// ```
    #[must_use]
    pub fn with_meta(&self, meta: Option<Self>) -> Self {
        let unchanged = match (self.meta(), &meta) {
            (None, None) => true,
            (Some(current), Some(meta)) => current == meta,
            _ => false,
        };
        if unchanged {
            return self.clone();
        }
        Self {
            meta: meta.map(ReferenceCounter::new),
            count: self.count,
            root: self.root.clone(),
            hash_eq_cache: self.hash_eq_cache.clone(),
            map_hash_cache: self.map_hash_cache.clone(),
        }
    }
}

impl<K: Clone, V: Clone> PersistentHashMap<K, V> {
    /// Returns an owned copy of the entry for `key`.
    pub fn entry_at<Q>(&self, key: &Q) -> Option<MapEntry<K, V>>
    where
        K: Borrow<Q>,
        Q: HashEq + ?Sized,
    {
        self.find(key)
            .map(|(key, value)| MapEntry::new(key.clone(), value.clone()))
    }

    /// Combines the entries pairwise, seeding with the first entry.
    ///
    /// Returns `None` for the empty map.
    pub fn reduce<F>(&self, function: F) -> Option<MapEntry<K, V>>
    where
        F: FnMut(MapEntry<K, V>, MapEntry<K, V>) -> MapEntry<K, V>,
    {
        let mut entries = self.seq()?.into_iter();
        let first = entries.next()?;
        Some(entries.fold(first, function))
    }
}

impl<K: Clone + HashEq, V: Clone + PartialEq> PersistentHashMap<K, V> {
    /// Creates a map containing a single entry.
    #[must_use]
    pub fn singleton(key: K, value: V) -> Self {
        Self::new().assoc(key, value)
    }

    /// Creates a map from key/value pairs; later pairs override earlier ones.
    #[must_use]
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        entries.into_iter().collect()
    }

    /// Returns a map with `key` bound to `value`.
    ///
    /// When the key is already bound to an equal value the result shares
    /// its trie with `self`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use lisp_hamt::persistent::PersistentHashMap;
    ///
    /// let map1 = PersistentHashMap::new().assoc("key".to_string(), 1);
    /// let map2 = map1.assoc("key".to_string(), 2);
    ///
    /// assert_eq!(map1.val_at("key"), Some(&1));
    /// assert_eq!(map2.val_at("key"), Some(&2));
    /// assert_eq!(map2.count(), 1);
    /// ```
    #[must_use]
    pub fn assoc(&self, key: K, value: V) -> Self {
        let hash = key.hash_eq();
        let Some(root) = &self.root else {
            let root = Node::singleton(0, hash, key, value);
            return self.with_root(Some(ReferenceCounter::new(root)), 1);
        };

        let (new_root, added) = Node::assoc(root, 0, hash, key, value);
        if ReferenceCounter::ptr_eq(root, &new_root) {
            return self.clone();
        }
        self.with_root(Some(new_root), self.count + usize::from(added))
    }

    /// Like [`assoc`](Self::assoc), but refuses to replace an existing key.
    ///
    /// # Errors
    ///
    /// Returns [`HamtError::KeyAlreadyPresent`] if the map contains `key`.
    pub fn assoc_ex(&self, key: K, value: V) -> Result<Self> {
        if self.contains_key(&key) {
            return Err(HamtError::KeyAlreadyPresent);
        }
        Ok(self.assoc(key, value))
    }

    /// Returns a map without `key`.
    ///
    /// Removing an absent key returns a map sharing its trie with `self`.
    #[must_use]
    pub fn without<Q>(&self, key: &Q) -> Self
    where
        K: Borrow<Q>,
        Q: HashEq + ?Sized,
    {
        let Some(root) = &self.root else {
            return self.clone();
        };

        let new_root = Node::without(root, 0, key.hash_eq(), key);
        if new_root
            .as_ref()
            .is_some_and(|new_root| ReferenceCounter::ptr_eq(root, new_root))
        {
            return self.clone();
        }
        self.with_root(new_root, self.count - 1)
    }

    /// Adds an entry.
    #[must_use]
    pub fn cons(&self, entry: MapEntry<K, V>) -> Self {
        let (key, value) = entry.into_pair();
        self.assoc(key, value)
    }

    /// Adds an entry, a pair, a map or a map sequence.
    ///
    /// # Errors
    ///
    /// Returns [`HamtError::InvalidPair`] if a vector is not a key/value pair.
    pub fn conj<C: Conjable<K, V>>(&self, item: C) -> Result<Self> {
        item.conj_onto(self)
    }
}

impl<K: HashEq, V: HashEq> PersistentHashMap<K, V> {
    /// Returns `true` if both maps hold equivalent keys bound to equivalent
    /// values. Metadata is ignored.
    #[must_use]
    pub fn equiv(&self, other: &Self) -> bool {
        if self.count != other.count {
            return false;
        }
        if self.shares_root_with(other) {
            return true;
        }
        self.iter().all(|(key, value)| {
            other
                .val_at(key)
                .is_some_and(|other_value| value.equiv(other_value))
        })
    }

    /// Returns the order-independent hash of the entries.
    ///
    /// Each entry hashes like the vector `[key, value]`. The result is
    /// computed once per map value.
    #[must_use]
    pub fn hash_eq(&self) -> u32 {
        *self.hash_eq_cache.get_or_init(|| {
            murmur3::hash_unordered(self.iter(), |(key, value)| entry_hash(key, value))
        })
    }

    /// Returns the sum of `hash(key) ^ hash(value)` over the entries.
    ///
    /// Kept for hosts that hash maps this way; cached like
    /// [`hash_eq`](Self::hash_eq).
    #[must_use]
    pub fn map_hash(&self) -> u32 {
        *self.map_hash_cache.get_or_init(|| {
            self.iter().fold(0_u32, |hash, (key, value)| {
                hash.wrapping_add(key.hash_eq() ^ value.hash_eq())
            })
        })
    }
}

// =============================================================================
// Iterator Implementation
// =============================================================================

/// An iterator over key-value pairs of a [`PersistentHashMap`].
pub struct PersistentHashMapIterator<'a, K, V> {
    inner: TrieIterator<'a, K, V>,
    remaining: usize,
}

impl<'a, K, V> Iterator for PersistentHashMapIterator<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if !self.inner.has_next() {
            return None;
        }
        match self.inner.next_entry() {
            Ok(entry) => {
                self.remaining = self.remaining.saturating_sub(1);
                Some(entry)
            }
            Err(_) => None,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for PersistentHashMapIterator<'_, K, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

/// An owning iterator over key-value pairs of a [`PersistentHashMap`].
pub struct PersistentHashMapIntoIterator<K, V> {
    entries: Option<MapSeqIterator<K, V>>,
    remaining: usize,
}

impl<K: Clone, V: Clone> Iterator for PersistentHashMapIntoIterator<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.entries.as_mut()?.next()?;
        self.remaining = self.remaining.saturating_sub(1);
        Some(entry.into_pair())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K: Clone, V: Clone> ExactSizeIterator for PersistentHashMapIntoIterator<K, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<K, V> Clone for PersistentHashMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            meta: self.meta.clone(),
            count: self.count,
            root: self.root.clone(),
            hash_eq_cache: self.hash_eq_cache.clone(),
            map_hash_cache: self.map_hash_cache.clone(),
        }
    }
}

impl<K, V> Default for PersistentHashMap<K, V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone + HashEq, V: Clone + PartialEq> FromIterator<(K, V)> for PersistentHashMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map = map.assoc(key, value);
        }
        map
    }
}

impl<K: Clone + HashEq, V: Clone + PartialEq> FromIterator<MapEntry<K, V>>
    for PersistentHashMap<K, V>
{
    fn from_iter<I: IntoIterator<Item = MapEntry<K, V>>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |map, entry| map.cons(entry))
    }
}

impl<K: Clone + HashEq, V: Clone + PartialEq> Extend<(K, V)> for PersistentHashMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            *self = self.assoc(key, value);
        }
    }
}

impl<K: Clone, V: Clone> IntoIterator for PersistentHashMap<K, V> {
    type Item = (K, V);
    type IntoIter = PersistentHashMapIntoIterator<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        PersistentHashMapIntoIterator {
            entries: self.seq().map(IntoIterator::into_iter),
            remaining: self.count,
        }
    }
}

impl<'a, K, V> IntoIterator for &'a PersistentHashMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = PersistentHashMapIterator<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: HashEq, V: PartialEq> PartialEq for PersistentHashMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        if self.count != other.count {
            return false;
        }
        if self.shares_root_with(other) {
            return true;
        }
        self.iter()
            .all(|(key, value)| other.val_at(key) == Some(value))
    }
}

impl<K: HashEq, V: Eq> Eq for PersistentHashMap<K, V> {}

impl<K: HashEq, V: HashEq> HashEq for PersistentHashMap<K, V> {
    fn hash_eq(&self) -> u32 {
        Self::hash_eq(self)
    }

    fn equiv(&self, other: &Self) -> bool {
        Self::equiv(self, other)
    }
}

impl<K: HashEq, V: HashEq> Hash for PersistentHashMap<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(Self::hash_eq(self));
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for PersistentHashMap<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(feature = "arc")]
static_assertions::assert_impl_all!(PersistentHashMap<i64, String>: Send, Sync);

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<K: serde::Serialize, V: serde::Serialize> serde::Serialize for PersistentHashMap<K, V> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.count))?;
        for (key, value) in self {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(feature = "serde")]
struct PersistentHashMapVisitor<K, V> {
    marker: std::marker::PhantomData<(K, V)>,
}

#[cfg(feature = "serde")]
impl<K, V> PersistentHashMapVisitor<K, V> {
    const fn new() -> Self {
        Self {
            marker: std::marker::PhantomData,
        }
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V> serde::de::Visitor<'de> for PersistentHashMapVisitor<K, V>
where
    K: serde::Deserialize<'de> + Clone + HashEq,
    V: serde::Deserialize<'de> + Clone + PartialEq,
{
    type Value = PersistentHashMap<K, V>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map")
    }

    fn visit_map<A>(self, mut access: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        let mut map = PersistentHashMap::new();
        while let Some((key, value)) = access.next_entry()? {
            map = map.assoc(key, value);
        }
        Ok(map)
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V> serde::Deserialize<'de> for PersistentHashMap<K, V>
where
    K: serde::Deserialize<'de> + Clone + HashEq,
    V: serde::Deserialize<'de> + Clone + PartialEq,
{
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(PersistentHashMapVisitor::new())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashSet;

    #[rstest]
    fn test_new_creates_empty() {
        let map: PersistentHashMap<String, i32> = PersistentHashMap::new();
        assert!(map.is_empty());
        assert_eq!(map.count(), 0);
        assert!(map.root.is_none());
        assert!(map.seq().is_none());
    }

    #[rstest]
    fn test_assoc_then_without_scenario() {
        let empty: PersistentHashMap<i64, &str> = PersistentHashMap::new();
        let one = empty.assoc(0, "a");
        let two = one.assoc(1, "b");

        assert_eq!(two.count(), 2);
        assert_eq!(two.val_at(&0), Some(&"a"));
        assert_eq!(two.val_at(&1), Some(&"b"));

        let removed = two.without(&0);
        assert_eq!(removed.count(), 1);
        assert_eq!(removed.val_at(&0), None);
        assert_eq!(removed.val_at(&1), Some(&"b"));
        assert_eq!(two.count(), 2);
        assert_eq!(one.count(), 1);
        assert!(empty.is_empty());
    }

    #[rstest]
    fn test_assoc_same_pair_shares_root() {
        let map = PersistentHashMap::from_entries([(1_i64, 1_i64), (2, 2)]);
        let same = map.assoc(1, 1);
        assert!(same.shares_root_with(&map));
        assert_eq!(same.count(), 2);
    }

    #[rstest]
    fn test_without_absent_key_shares_root() {
        let map = PersistentHashMap::from_entries([(1_i64, 1_i64), (2, 2)]);
        assert!(map.without(&3).shares_root_with(&map));

        let empty: PersistentHashMap<i64, i64> = PersistentHashMap::new();
        assert!(empty.without(&3).is_empty());
    }

    #[rstest]
    fn test_without_last_key_drops_root() {
        let map = PersistentHashMap::singleton(1_i64, 1_i64);
        let emptied = map.without(&1);
        assert!(emptied.is_empty());
        assert!(emptied.root.is_none());
    }

    #[rstest]
    fn test_thousand_sequential_keys() {
        let map: PersistentHashMap<i64, i64> = (0..1000).map(|key| (key, key * 2)).collect();
        assert_eq!(map.count(), 1000);

        let keys: HashSet<i64> = map
            .seq()
            .expect("map is not empty")
            .iter()
            .map(|entry| *entry.key())
            .collect();
        assert_eq!(keys.len(), 1000);
        assert!((0..1000).all(|key| map.val_at(&key) == Some(&(key * 2))));
    }

    #[rstest]
    fn test_assoc_ex_rejects_existing_key() {
        let map = PersistentHashMap::singleton("key", 1);
        assert_eq!(map.assoc_ex("key", 2), Err(HamtError::KeyAlreadyPresent));

        let extended = map.assoc_ex("other", 2).expect("new key");
        assert_eq!(extended.count(), 2);
    }

    #[rstest]
    fn test_val_at_or_and_entry_at() {
        let map = PersistentHashMap::singleton(String::from("present"), 1);
        assert_eq!(*map.val_at_or("present", &0), 1);
        assert_eq!(*map.val_at_or("absent", &0), 0);
        assert_eq!(
            map.entry_at("present"),
            Some(MapEntry::new(String::from("present"), 1))
        );
        assert_eq!(map.entry_at("absent"), None);
    }

    #[rstest]
    fn test_metadata_survives_updates_and_is_ignored_by_equality() {
        let meta = PersistentHashMap::singleton("source", "repl");
        let map = PersistentHashMap::singleton("a", "1").with_meta(Some(meta));
        let updated = map.assoc("b", "2").without(&"a");

        assert_eq!(
            updated.meta().and_then(|meta| meta.val_at(&"source")),
            Some(&"repl")
        );
        assert_eq!(map, PersistentHashMap::singleton("a", "1"));
        assert_eq!(map.empty().meta().map(PersistentHashMap::count), Some(1));
        assert!(map.with_meta(None).meta().is_none());
    }

    #[rstest]
    fn test_with_same_meta_keeps_handle() {
        let meta = PersistentHashMap::singleton(1_i64, 1_i64);
        let map = PersistentHashMap::singleton(2_i64, 2_i64).with_meta(Some(meta.clone()));
        let again = map.with_meta(Some(meta));

        let (Some(first), Some(second)) = (&map.meta, &again.meta) else {
            panic!("metadata expected");
        };
        assert!(ReferenceCounter::ptr_eq(first, second));
    }

    #[rstest]
    fn test_iter_stops_cleanly_after_last_entry() {
        let map: PersistentHashMap<i64, i64> = (0..40).map(|key| (key, key)).collect();
        let mut iterator = map.iter();
        assert_eq!(iterator.len(), 40);

        assert_eq!(iterator.by_ref().count(), 40);
        assert_eq!(iterator.len(), 0);
        assert_eq!(iterator.next(), None);
        assert_eq!(iterator.next(), None);
    }

    #[rstest]
    fn test_with_equal_meta_built_separately_keeps_handle() {
        let map = PersistentHashMap::singleton(2_i64, 2_i64)
            .with_meta(Some(PersistentHashMap::from_entries([(1_i64, 1_i64), (3, 3)])));
        let rebuilt = PersistentHashMap::from_entries([(3_i64, 3_i64), (1, 1)]);
        let again = map.with_meta(Some(rebuilt));

        let (Some(first), Some(second)) = (&map.meta, &again.meta) else {
            panic!("metadata expected");
        };
        assert!(ReferenceCounter::ptr_eq(first, second));

        let changed = map.with_meta(Some(PersistentHashMap::singleton(1_i64, 10_i64)));
        assert_eq!(changed.meta().and_then(|meta| meta.val_at(&1)), Some(&10));
        assert_eq!(changed, map);
    }

    #[rstest]
    fn test_equality_ignores_insertion_order() {
        let forward: PersistentHashMap<i64, i64> = (0..100).map(|key| (key, key)).collect();
        let backward: PersistentHashMap<i64, i64> = (0..100).rev().map(|key| (key, key)).collect();

        assert_eq!(forward, backward);
        assert!(forward.equiv(&backward));
        assert_eq!(forward.hash_eq(), backward.hash_eq());
        assert_eq!(forward.map_hash(), backward.map_hash());
        assert_ne!(forward, backward.assoc(0, 1));
        assert_ne!(forward, backward.without(&0));
    }

    #[rstest]
    fn test_empty_map_hashes() {
        let map: PersistentHashMap<i64, i64> = PersistentHashMap::new();
        assert_eq!(map.hash_eq(), 4_279_838_538);
        assert_eq!(map.map_hash(), 0);
    }

    #[rstest]
    fn test_hash_eq_uses_entry_hash() {
        let map = PersistentHashMap::singleton(1_i64, 2_i64);
        let expected = murmur3::hash_unordered([MapEntry::new(1_i64, 2_i64)], |entry| {
            entry.hash_eq()
        });
        assert_eq!(map.hash_eq(), expected);
        assert_eq!(map.map_hash(), 1_i64.hash_eq() ^ 2_i64.hash_eq());
    }

    #[rstest]
    fn test_reduce_and_reduce_init() {
        let map: PersistentHashMap<i64, i64> = (1..=4).map(|key| (key, key * 10)).collect();
        let total = map.reduce_init(0, |sum, key, value| sum + key + value);
        assert_eq!(total, 110);

        let combined = map
            .reduce(|left, right| MapEntry::new(left.key() + right.key(), left.value() + right.value()))
            .expect("map is not empty");
        assert_eq!(combined, MapEntry::new(10, 100));

        let empty: PersistentHashMap<i64, i64> = PersistentHashMap::new();
        assert!(empty.reduce(|left, _| left).is_none());
    }

    #[rstest]
    fn test_iterators_report_exact_length() {
        let map: PersistentHashMap<i64, i64> = (0..40).map(|key| (key, key)).collect();
        let mut iterator = map.iter();
        assert_eq!(iterator.len(), 40);
        iterator.next();
        assert_eq!(iterator.len(), 39);
        assert_eq!(map.keys().count(), 40);
        assert_eq!(map.values().sum::<i64>(), (0..40).sum());

        let owned = map.clone().into_iter();
        assert_eq!(owned.len(), 40);
        let mut pairs: Vec<(i64, i64)> = owned.collect();
        pairs.sort_unstable();
        assert_eq!(pairs, (0..40).map(|key| (key, key)).collect::<Vec<_>>());
    }

    #[rstest]
    fn test_extend_and_entry_collect() {
        let mut map: PersistentHashMap<i64, i64> = PersistentHashMap::new();
        map.extend([(1, 1), (2, 2)]);
        let collected: PersistentHashMap<i64, i64> =
            [MapEntry::new(1, 1), MapEntry::new(2, 2)].into_iter().collect();
        assert_eq!(map, collected);
    }

    #[rstest]
    fn test_debug_renders_as_map() {
        let map = PersistentHashMap::singleton("key", 1);
        assert_eq!(format!("{map:?}"), r#"{"key": 1}"#);
    }
}
