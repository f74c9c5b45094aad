//! Lazy persistent sequences over the entries of a map.
//!
//! A sequence is a cursor into the trie: it holds the node it walks (so it
//! stays usable after the map is dropped), a position in that node, and the
//! sequence of the child currently being walked. Advancing never mutates a
//! sequence; [`MapSeq::next`] returns a new one.

use std::fmt;

use super::entry::MapEntry;
use super::node::{BRANCHING_FACTOR, Node, NodeRef, SlotRef};
use crate::persistent::ReferenceCounter;

/// A non-empty sequence over the entries of a map or subtree.
///
/// # Examples
///
/// ```rust
/// use lisp_hamt::persistent::PersistentHashMap;
///
/// let map = PersistentHashMap::new().assoc(1_i64, "one").assoc(2_i64, "two");
/// let seq = map.seq().expect("map is not empty");
/// drop(map);
///
/// assert_eq!(seq.count(), 2);
/// let mut keys: Vec<i64> = seq.iter().map(|entry| *entry.key()).collect();
/// keys.sort_unstable();
/// assert_eq!(keys, vec![1, 2]);
/// ```
pub enum MapSeq<K, V> {
    /// Sequence over a bitmap or collision node.
    Node(NodeSeq<K, V>),
    /// Sequence over an array node.
    Array(ArrayNodeSeq<K, V>),
}

/// Sequence over the slots of a bitmap or collision node.
///
/// When `nested` is set the sequence is inside the child just before
/// `index`; otherwise `index` points at an inline entry.
pub struct NodeSeq<K, V> {
    node: NodeRef<K, V>,
    index: usize,
    nested: Option<Box<MapSeq<K, V>>>,
}

/// Sequence over the children of an array node, skipping empty slots.
pub struct ArrayNodeSeq<K, V> {
    node: NodeRef<K, V>,
    index: usize,
    nested: Box<MapSeq<K, V>>,
}

impl<K, V> MapSeq<K, V> {
    /// Sequence over the subtree rooted at `node`, or `None` if it holds no entry.
    pub(crate) fn from_node(node: &NodeRef<K, V>) -> Option<Self> {
        match &**node {
            Node::Array(_) => ArrayNodeSeq::create(node, 0, None).map(Self::Array),
            Node::Bitmap(_) | Node::Collision(_) => {
                NodeSeq::create(node, 0, None).map(Self::Node)
            }
        }
    }

    /// Returns the current entry.
    #[must_use]
    pub fn first(&self) -> (&K, &V) {
        match self {
            Self::Node(seq) => seq.first(),
            Self::Array(seq) => seq.first(),
        }
    }

    /// Returns the sequence of the remaining entries, or `None` at the end.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Node(seq) => seq.next().map(Self::Node),
            Self::Array(seq) => seq.next().map(Self::Array),
        }
    }

    /// Counts the entries by walking the sequence.
    #[must_use]
    pub fn count(&self) -> usize {
        let mut count = 1;
        let mut current = self.next();
        while let Some(seq) = current {
            count += 1;
            current = seq.next();
        }
        count
    }
}

impl<K: Clone, V: Clone> MapSeq<K, V> {
    /// Returns a copy of the current entry.
    #[must_use]
    pub fn entry(&self) -> MapEntry<K, V> {
        let (key, value) = self.first();
        MapEntry::new(key.clone(), value.clone())
    }

    /// Iterates over copies of the entries, starting at the current one.
    #[must_use]
    pub fn iter(&self) -> MapSeqIterator<K, V> {
        MapSeqIterator {
            current: Some(self.clone()),
        }
    }
}

impl<K, V> NodeSeq<K, V> {
    /// Positions a sequence at the first entry at or after `start`.
    ///
    /// With `nested` the caller is still inside a child and the position is
    /// taken as is.
    fn create(
        node: &NodeRef<K, V>,
        start: usize,
        nested: Option<Box<MapSeq<K, V>>>,
    ) -> Option<Self> {
        if nested.is_some() {
            return Some(Self {
                node: ReferenceCounter::clone(node),
                index: start,
                nested,
            });
        }

        let mut index = start;
        while let Some(slot) = node.slot(index) {
            match slot {
                SlotRef::Entry(..) => {
                    return Some(Self {
                        node: ReferenceCounter::clone(node),
                        index,
                        nested: None,
                    });
                }
                SlotRef::Node(child) => {
                    if let Some(seq) = MapSeq::from_node(child) {
                        return Some(Self {
                            node: ReferenceCounter::clone(node),
                            index: index + 1,
                            nested: Some(Box::new(seq)),
                        });
                    }
                }
            }
            index += 1;
        }
        None
    }

    /// Returns the current entry.
    #[must_use]
    pub fn first(&self) -> (&K, &V) {
        if let Some(nested) = &self.nested {
            return nested.first();
        }
        match self.node.slot(self.index) {
            Some(SlotRef::Entry(key, value)) => (key, value),
            _ => unreachable!("node sequence positioned off an entry"),
        }
    }

    /// Returns the sequence of the remaining entries, or `None` at the end.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn next(&self) -> Option<Self> {
        match &self.nested {
            Some(nested) => Self::create(&self.node, self.index, nested.next().map(Box::new)),
            None => Self::create(&self.node, self.index + 1, None),
        }
    }
}

impl<K, V> ArrayNodeSeq<K, V> {
    /// Positions a sequence in the first non-empty child at or after `start`.
    fn create(
        node: &NodeRef<K, V>,
        start: usize,
        nested: Option<Box<MapSeq<K, V>>>,
    ) -> Option<Self> {
        if let Some(nested) = nested {
            return Some(Self {
                node: ReferenceCounter::clone(node),
                index: start,
                nested,
            });
        }

        let children = node.children()?;
        (start..BRANCHING_FACTOR).find_map(|index| {
            let seq = children[index].as_ref().and_then(MapSeq::from_node)?;
            Some(Self {
                node: ReferenceCounter::clone(node),
                index: index + 1,
                nested: Box::new(seq),
            })
        })
    }

    /// Returns the current entry.
    #[must_use]
    pub fn first(&self) -> (&K, &V) {
        self.nested.first()
    }

    /// Returns the sequence of the remaining entries, or `None` at the end.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn next(&self) -> Option<Self> {
        Self::create(&self.node, self.index, self.nested.next().map(Box::new))
    }
}

impl<K, V> Clone for MapSeq<K, V> {
    fn clone(&self) -> Self {
        match self {
            Self::Node(seq) => Self::Node(seq.clone()),
            Self::Array(seq) => Self::Array(seq.clone()),
        }
    }
}

impl<K, V> Clone for NodeSeq<K, V> {
    fn clone(&self) -> Self {
        Self {
            node: ReferenceCounter::clone(&self.node),
            index: self.index,
            nested: self.nested.clone(),
        }
    }
}

impl<K, V> Clone for ArrayNodeSeq<K, V> {
    fn clone(&self) -> Self {
        Self {
            node: ReferenceCounter::clone(&self.node),
            index: self.index,
            nested: self.nested.clone(),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for MapSeq<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = formatter.debug_list();
        let mut current = Some(self.clone());
        while let Some(seq) = current {
            list.entry(&seq.first());
            current = seq.next();
        }
        list.finish()
    }
}

/// Iterator over owned entries of a [`MapSeq`].
pub struct MapSeqIterator<K, V> {
    current: Option<MapSeq<K, V>>,
}

impl<K: Clone, V: Clone> Iterator for MapSeqIterator<K, V> {
    type Item = MapEntry<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        let seq = self.current.take()?;
        let entry = seq.entry();
        self.current = seq.next();
        Some(entry)
    }
}

impl<K: Clone, V: Clone> IntoIterator for MapSeq<K, V> {
    type Item = MapEntry<K, V>;
    type IntoIter = MapSeqIterator<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        MapSeqIterator {
            current: Some(self),
        }
    }
}

impl<K: Clone, V: Clone> IntoIterator for &MapSeq<K, V> {
    type Item = MapEntry<K, V>;
    type IntoIter = MapSeqIterator<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
