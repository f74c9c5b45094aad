//! Owned key/value pairs handed out by map sequences.

use crate::hash::{HashEq, murmur3};

/// A key/value pair of a [`PersistentHashMap`](super::PersistentHashMap).
///
/// Entries hash and compare like the two-element vector `[key, value]`.
///
/// # Examples
///
/// ```rust
/// use lisp_hamt::persistent::MapEntry;
///
/// let entry = MapEntry::new("answer", 42);
/// assert_eq!(entry.key(), &"answer");
/// assert_eq!(entry.value(), &42);
/// assert_eq!(entry.into_pair(), ("answer", 42));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapEntry<K, V> {
    key: K,
    value: V,
}

impl<K, V> MapEntry<K, V> {
    /// Creates an entry from a key and a value.
    #[inline]
    #[must_use]
    pub const fn new(key: K, value: V) -> Self {
        Self { key, value }
    }

    /// Returns the key.
    #[inline]
    #[must_use]
    pub const fn key(&self) -> &K {
        &self.key
    }

    /// Returns the value.
    #[inline]
    #[must_use]
    pub const fn value(&self) -> &V {
        &self.value
    }

    /// Splits the entry into its key and value.
    #[inline]
    #[must_use]
    pub fn into_pair(self) -> (K, V) {
        (self.key, self.value)
    }
}

impl<K, V> From<(K, V)> for MapEntry<K, V> {
    fn from((key, value): (K, V)) -> Self {
        Self::new(key, value)
    }
}

impl<K, V> From<MapEntry<K, V>> for (K, V) {
    fn from(entry: MapEntry<K, V>) -> Self {
        entry.into_pair()
    }
}

/// Hashes an entry given its borrowed parts.
pub(crate) fn entry_hash<K: HashEq, V: HashEq>(key: &K, value: &V) -> u32 {
    murmur3::hash_ordered([key.hash_eq(), value.hash_eq()], |hash| hash)
}

impl<K: HashEq, V: HashEq> HashEq for MapEntry<K, V> {
    fn hash_eq(&self) -> u32 {
        entry_hash(&self.key, &self.value)
    }

    fn equiv(&self, other: &Self) -> bool {
        self.key.equiv(&other.key) && self.value.equiv(&other.value)
    }
}

#[cfg(feature = "serde")]
impl<K: serde::Serialize, V: serde::Serialize> serde::Serialize for MapEntry<K, V> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeTuple;
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&self.key)?;
        tuple.serialize_element(&self.value)?;
        tuple.end()
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V> serde::Deserialize<'de> for MapEntry<K, V>
where
    K: serde::Deserialize<'de>,
    V: serde::Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        <(K, V)>::deserialize(deserializer).map(Self::from)
    }
}
