//! Push iterators over borrowed map entries.
//!
//! Unlike [`MapSeq`](super::MapSeq), these iterators borrow the trie and
//! advance in place, so walking a map allocates only one boxed iterator per
//! level. They follow the same order as the sequences.

use super::node::{Node, NodeRef, SlotRef};
use crate::error::{HamtError, Result};

/// Explicit `has_next` / `next_entry` iteration protocol.
///
/// # Examples
///
/// ```rust
/// use lisp_hamt::persistent::{MapIterator, PersistentHashMap};
/// use lisp_hamt::error::HamtError;
///
/// let map = PersistentHashMap::singleton("key", 1);
/// let mut iterator = map.push_iter();
///
/// assert!(iterator.has_next());
/// assert_eq!(iterator.next_entry(), Ok((&"key", &1)));
/// assert!(!iterator.has_next());
/// assert_eq!(iterator.next_entry(), Err(HamtError::IteratorExhausted));
/// ```
pub trait MapIterator<'a, K, V> {
    /// Returns `true` if another entry is available.
    fn has_next(&mut self) -> bool;

    /// Returns the next entry.
    ///
    /// # Errors
    ///
    /// Returns [`HamtError::IteratorExhausted`] when no entry is left.
    fn next_entry(&mut self) -> Result<(&'a K, &'a V)>;
}

/// Push iterator over any subtree; `Empty` stands for the empty map.
pub enum TrieIterator<'a, K, V> {
    /// Iterator with nothing to yield.
    Empty,
    /// Iterator over a bitmap or collision node.
    Node(NodeIterator<'a, K, V>),
    /// Iterator over an array node.
    Array(ArrayNodeIterator<'a, K, V>),
}

/// Push iterator over the slots of a bitmap or collision node.
pub struct NodeIterator<'a, K, V> {
    node: &'a Node<K, V>,
    index: usize,
    next_entry: Option<(&'a K, &'a V)>,
    nested: Option<Box<TrieIterator<'a, K, V>>>,
}

/// Push iterator over the children of an array node.
pub struct ArrayNodeIterator<'a, K, V> {
    array: &'a [Option<NodeRef<K, V>>],
    index: usize,
    nested: Option<Box<TrieIterator<'a, K, V>>>,
}

impl<'a, K, V> TrieIterator<'a, K, V> {
    pub(crate) fn from_root(root: Option<&'a NodeRef<K, V>>) -> Self {
        root.map_or(Self::Empty, |node| Self::from_node(node))
    }

    fn from_node(node: &'a Node<K, V>) -> Self {
        match node.children() {
            Some(array) => Self::Array(ArrayNodeIterator {
                array,
                index: 0,
                nested: None,
            }),
            None => Self::Node(NodeIterator {
                node,
                index: 0,
                next_entry: None,
                nested: None,
            }),
        }
    }
}

impl<'a, K, V> MapIterator<'a, K, V> for TrieIterator<'a, K, V> {
    fn has_next(&mut self) -> bool {
        match self {
            Self::Empty => false,
            Self::Node(iterator) => iterator.has_next(),
            Self::Array(iterator) => iterator.has_next(),
        }
    }

    fn next_entry(&mut self) -> Result<(&'a K, &'a V)> {
        match self {
            Self::Empty => Err(HamtError::IteratorExhausted),
            Self::Node(iterator) => iterator.next_entry(),
            Self::Array(iterator) => iterator.next_entry(),
        }
    }
}

impl<'a, K, V> NodeIterator<'a, K, V> {
    /// Moves to the next inline entry or non-empty child.
    fn advance(&mut self) -> bool {
        while let Some(slot) = self.node.slot(self.index) {
            self.index += 1;
            match slot {
                SlotRef::Entry(key, value) => {
                    self.next_entry = Some((key, value));
                    return true;
                }
                SlotRef::Node(child) => {
                    let mut iterator = TrieIterator::from_node(child);
                    if iterator.has_next() {
                        self.nested = Some(Box::new(iterator));
                        return true;
                    }
                }
            }
        }
        false
    }
}

impl<'a, K, V> MapIterator<'a, K, V> for NodeIterator<'a, K, V> {
    fn has_next(&mut self) -> bool {
        if self.next_entry.is_some() || self.nested.is_some() {
            return true;
        }
        self.advance()
    }

    fn next_entry(&mut self) -> Result<(&'a K, &'a V)> {
        if !self.has_next() {
            return Err(HamtError::IteratorExhausted);
        }
        if let Some(entry) = self.next_entry.take() {
            return Ok(entry);
        }
        let Some(nested) = self.nested.as_mut() else {
            return Err(HamtError::IteratorExhausted);
        };
        let entry = nested.next_entry()?;
        if !nested.has_next() {
            self.nested = None;
        }
        Ok(entry)
    }
}

impl<'a, K, V> MapIterator<'a, K, V> for ArrayNodeIterator<'a, K, V> {
    fn has_next(&mut self) -> bool {
        loop {
            if self.nested.as_mut().is_some_and(|nested| nested.has_next()) {
                return true;
            }
            self.nested = None;

            let Some(slot) = self.array.get(self.index) else {
                return false;
            };
            self.index += 1;
            if let Some(child) = slot {
                self.nested = Some(Box::new(TrieIterator::from_node(child)));
            }
        }
    }

    fn next_entry(&mut self) -> Result<(&'a K, &'a V)> {
        if !self.has_next() {
            return Err(HamtError::IteratorExhausted);
        }
        self.nested
            .as_mut()
            .map_or(Err(HamtError::IteratorExhausted), |nested| nested.next_entry())
    }
}
