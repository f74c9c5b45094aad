//! Values that can be conj'ed onto a map.

use super::PersistentHashMap;
use super::entry::MapEntry;
use super::seq::MapSeq;
use crate::error::{HamtError, Result};
use crate::hash::HashEq;

/// A value accepted by [`PersistentHashMap::conj`].
///
/// Entries and `(key, value)` tuples are associated directly. A vector must
/// hold exactly a key and a value. Maps and map sequences contribute all of
/// their entries.
///
/// # Examples
///
/// ```rust
/// use lisp_hamt::error::HamtError;
/// use lisp_hamt::persistent::PersistentHashMap;
///
/// let map: PersistentHashMap<i64, i64> = PersistentHashMap::new();
/// let map = map.conj((1, 10)).unwrap().conj(vec![2, 20]).unwrap();
/// assert_eq!(map.val_at(&2), Some(&20));
///
/// assert_eq!(
///     map.conj(vec![3, 30, 300]).unwrap_err(),
///     HamtError::InvalidPair { length: 3 }
/// );
/// ```
pub trait Conjable<K, V> {
    /// Adds `self` to `map`, returning the new map.
    ///
    /// # Errors
    ///
    /// Returns [`HamtError::InvalidPair`] when a vector does not hold
    /// exactly two elements.
    fn conj_onto(self, map: &PersistentHashMap<K, V>) -> Result<PersistentHashMap<K, V>>;
}

impl<K, V> Conjable<K, V> for MapEntry<K, V>
where
    K: Clone + HashEq,
    V: Clone + PartialEq,
{
    fn conj_onto(self, map: &PersistentHashMap<K, V>) -> Result<PersistentHashMap<K, V>> {
        Ok(map.cons(self))
    }
}

impl<K, V> Conjable<K, V> for (K, V)
where
    K: Clone + HashEq,
    V: Clone + PartialEq,
{
    fn conj_onto(self, map: &PersistentHashMap<K, V>) -> Result<PersistentHashMap<K, V>> {
        let (key, value) = self;
        Ok(map.assoc(key, value))
    }
}

/// A runtime vector: keys and values share one value type.
impl<T> Conjable<T, T> for Vec<T>
where
    T: Clone + HashEq + PartialEq,
{
    fn conj_onto(self, map: &PersistentHashMap<T, T>) -> Result<PersistentHashMap<T, T>> {
        let length = self.len();
        let [key, value] =
            <[T; 2]>::try_from(self).map_err(|_| HamtError::InvalidPair { length })?;
        Ok(map.assoc(key, value))
    }
}

impl<K, V> Conjable<K, V> for PersistentHashMap<K, V>
where
    K: Clone + HashEq,
    V: Clone + PartialEq,
{
    fn conj_onto(self, map: &PersistentHashMap<K, V>) -> Result<PersistentHashMap<K, V>> {
        Ok(self
            .iter()
            .fold(map.clone(), |accumulator, (key, value)| {
                accumulator.assoc(key.clone(), value.clone())
            }))
    }
}

impl<K, V> Conjable<K, V> for MapSeq<K, V>
where
    K: Clone + HashEq,
    V: Clone + PartialEq,
{
    fn conj_onto(self, map: &PersistentHashMap<K, V>) -> Result<PersistentHashMap<K, V>> {
        Ok(self
            .into_iter()
            .fold(map.clone(), |accumulator, entry| accumulator.cons(entry)))
    }
}
