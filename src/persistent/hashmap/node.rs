//! Trie nodes of the persistent hash map.
//!
//! A node maps the 5-bit slice of a key hash at depth `shift` to its
//! children. There are three kinds:
//!
//! - [`BitmapIndexedNode`]: sparse, at most 16 occupied slices, compacted
//!   through a 32-bit occupancy bitmap and popcount indexing
//! - [`ArrayNode`]: dense, 32 directly indexed child slots
//! - [`HashCollisionNode`]: keys whose full 32-bit hashes are identical
//!
//! Nodes are never mutated once they are reachable. Operations that change
//! nothing hand back the node they were called on (same handle), so callers
//! detect no-ops with [`ReferenceCounter::ptr_eq`] and skip copying the
//! path above them.

use std::borrow::Borrow;

use crate::hash::HashEq;
use crate::persistent::ReferenceCounter;

// =============================================================================
// Constants
// =============================================================================

/// Bits of the hash consumed per trie level.
pub(crate) const BITS_PER_LEVEL: u32 = 5;

/// Branching factor (2^5 = 32).
pub(crate) const BRANCHING_FACTOR: usize = 32;

/// Bit mask for extracting a slice from a shifted hash.
#[allow(clippy::cast_possible_truncation)]
const MASK: u32 = (BRANCHING_FACTOR - 1) as u32;

/// Occupied slices a bitmap node holds before it is promoted.
pub(crate) const MAX_BITMAP_ENTRIES: usize = 16;

/// Array nodes whose child count drops to this or below are packed into a bitmap node.
pub(crate) const MIN_ARRAY_CHILDREN: usize = 8;

static_assertions::const_assert_eq!(1 << BITS_PER_LEVEL, BRANCHING_FACTOR);
static_assertions::const_assert!(MIN_ARRAY_CHILDREN < MAX_BITMAP_ENTRIES);
static_assertions::const_assert!(MAX_BITMAP_ENTRIES < BRANCHING_FACTOR);

/// Extracts the slice of `hash` examined at `shift`.
///
/// `shift` stays at or below 30 for keys with distinct hashes; keys with
/// identical hashes end up in a collision node, which ignores `shift`.
#[inline]
pub(crate) const fn mask(hash: u32, shift: u32) -> usize {
    ((hash >> shift) & MASK) as usize
}

/// Single-bit bitmap for the slice of `hash` at `shift`.
#[inline]
const fn bitpos(hash: u32, shift: u32) -> u32 {
    1 << mask(hash, shift)
}

// =============================================================================
// Node Definition
// =============================================================================

/// Shared handle to a node.
pub(crate) type NodeRef<K, V> = ReferenceCounter<Node<K, V>>;

/// Internal node structure for the HAMT.
pub(crate) enum Node<K, V> {
    Bitmap(BitmapIndexedNode<K, V>),
    Array(ArrayNode<K, V>),
    Collision(HashCollisionNode<K, V>),
}

/// A slot of a bitmap node: an inline entry or a subtree.
#[derive(Clone)]
pub(crate) enum Slot<K, V> {
    Entry(K, V),
    Node(NodeRef<K, V>),
}

/// Borrowed view of one position of a bitmap or collision node.
pub(crate) enum SlotRef<'a, K, V> {
    Entry(&'a K, &'a V),
    Node(&'a NodeRef<K, V>),
}

/// Sparse node: one slot per set bit of `bitmap`, in bit order.
pub(crate) struct BitmapIndexedNode<K, V> {
    bitmap: u32,
    array: Vec<Slot<K, V>>,
}

/// Dense node with `count` non-empty children.
pub(crate) struct ArrayNode<K, V> {
    count: usize,
    array: [Option<NodeRef<K, V>>; BRANCHING_FACTOR],
}

/// Entries that share the full hash `hash`, in insertion order.
pub(crate) struct HashCollisionNode<K, V> {
    hash: u32,
    array: Vec<(K, V)>,
}

// =============================================================================
// Lookup and traversal (no bounds on K and V)
// =============================================================================

impl<K, V> Node<K, V> {
    /// A bitmap node holding exactly one entry.
    pub(crate) fn singleton(shift: u32, hash: u32, key: K, value: V) -> Self {
        Self::Bitmap(BitmapIndexedNode {
            bitmap: bitpos(hash, shift),
            array: vec![Slot::Entry(key, value)],
        })
    }

    /// Finds the entry for `key`.
    pub(crate) fn find<Q>(&self, shift: u32, hash: u32, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: HashEq + ?Sized,
    {
        match self {
            Self::Bitmap(node) => node.find(shift, hash, key),
            Self::Array(node) => node.array[mask(hash, shift)]
                .as_ref()
                .and_then(|child| child.find(shift + BITS_PER_LEVEL, hash, key)),
            Self::Collision(node) => node
                .find_index(key)
                .map(|index| {
                    let (entry_key, entry_value) = &node.array[index];
                    (entry_key, entry_value)
                }),
        }
    }

    /// Position `index` of a bitmap or collision node.
    ///
    /// Array nodes have no flat slot list and always answer `None`; they
    /// are walked through [`Node::children`].
    pub(crate) fn slot(&self, index: usize) -> Option<SlotRef<'_, K, V>> {
        match self {
            Self::Bitmap(node) => node.array.get(index).map(|slot| match slot {
                Slot::Entry(key, value) => SlotRef::Entry(key, value),
                Slot::Node(child) => SlotRef::Node(child),
            }),
            Self::Collision(node) => node
                .array
                .get(index)
                .map(|(key, value)| SlotRef::Entry(key, value)),
            Self::Array(_) => None,
        }
    }

    /// The 32 child slots of an array node.
    pub(crate) fn children(&self) -> Option<&[Option<NodeRef<K, V>>]> {
        match self {
            Self::Array(node) => Some(node.array.as_slice()),
            _ => None,
        }
    }
}

impl<K, V> BitmapIndexedNode<K, V> {
    /// Position of the slot for `bit` in the compacted array.
    #[inline]
    const fn index(&self, bit: u32) -> usize {
        (self.bitmap & (bit - 1)).count_ones() as usize
    }

    fn find<Q>(&self, shift: u32, hash: u32, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: HashEq + ?Sized,
    {
        let bit = bitpos(hash, shift);
        if self.bitmap & bit == 0 {
            return None;
        }
        match &self.array[self.index(bit)] {
            Slot::Node(child) => child.find(shift + BITS_PER_LEVEL, hash, key),
            Slot::Entry(entry_key, entry_value) => {
                key.equiv(entry_key.borrow()).then_some((entry_key, entry_value))
            }
        }
    }
}

impl<K, V> HashCollisionNode<K, V> {
    fn find_index<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: HashEq + ?Sized,
    {
        self.array
            .iter()
            .position(|(entry_key, _)| key.equiv(entry_key.borrow()))
    }
}

// =============================================================================
// Removal
// =============================================================================

impl<K: Clone + HashEq, V: Clone> Node<K, V> {
    /// Removes `key` from the subtree rooted at `this`.
    ///
    /// Returns `this` itself when the key is absent and `None` when the
    /// subtree becomes empty.
    pub(crate) fn without<Q>(
        this: &NodeRef<K, V>,
        shift: u32,
        hash: u32,
        key: &Q,
    ) -> Option<NodeRef<K, V>>
    where
        K: Borrow<Q>,
        Q: HashEq + ?Sized,
    {
        match &**this {
            Self::Bitmap(node) => node.without(this, shift, hash, key),
            Self::Array(node) => node.without(this, shift, hash, key),
            Self::Collision(node) => node.without(this, key),
        }
    }
}

impl<K: Clone + HashEq, V: Clone> BitmapIndexedNode<K, V> {
    fn without<Q>(
        &self,
        this: &NodeRef<K, V>,
        shift: u32,
        hash: u32,
        key: &Q,
    ) -> Option<NodeRef<K, V>>
    where
        K: Borrow<Q>,
        Q: HashEq + ?Sized,
    {
        let bit = bitpos(hash, shift);
        if self.bitmap & bit == 0 {
            return Some(ReferenceCounter::clone(this));
        }
        let index = self.index(bit);

        match &self.array[index] {
            Slot::Node(child) => match Node::without(child, shift + BITS_PER_LEVEL, hash, key) {
                Some(new_child) if ReferenceCounter::ptr_eq(child, &new_child) => {
                    Some(ReferenceCounter::clone(this))
                }
                Some(new_child) => Some(ReferenceCounter::new(Node::Bitmap(Self {
                    bitmap: self.bitmap,
                    array: self.with_slot(index, Slot::Node(new_child)),
                }))),
                None => self.without_slot(bit, index),
            },
            Slot::Entry(entry_key, _) if key.equiv(entry_key.borrow()) => {
                self.without_slot(bit, index)
            }
            Slot::Entry(..) => Some(ReferenceCounter::clone(this)),
        }
    }

    /// Drops the slot for `bit`; an emptied node disappears entirely.
    fn without_slot(&self, bit: u32, index: usize) -> Option<NodeRef<K, V>> {
        if self.bitmap == bit {
            return None;
        }
        let mut array = Vec::with_capacity(self.array.len() - 1);
        array.extend_from_slice(&self.array[..index]);
        array.extend_from_slice(&self.array[index + 1..]);
        Some(ReferenceCounter::new(Node::Bitmap(Self {
            bitmap: self.bitmap ^ bit,
            array,
        })))
    }

    fn with_slot(&self, index: usize, slot: Slot<K, V>) -> Vec<Slot<K, V>> {
        let mut array = self.array.clone();
        array[index] = slot;
        array
    }
}

impl<K: Clone + HashEq, V: Clone> ArrayNode<K, V> {
    fn without<Q>(
        &self,
        this: &NodeRef<K, V>,
        shift: u32,
        hash: u32,
        key: &Q,
    ) -> Option<NodeRef<K, V>>
    where
        K: Borrow<Q>,
        Q: HashEq + ?Sized,
    {
        let index = mask(hash, shift);
        let Some(child) = &self.array[index] else {
            return Some(ReferenceCounter::clone(this));
        };

        match Node::without(child, shift + BITS_PER_LEVEL, hash, key) {
            Some(new_child) if ReferenceCounter::ptr_eq(child, &new_child) => {
                Some(ReferenceCounter::clone(this))
            }
            Some(new_child) => Some(ReferenceCounter::new(Node::Array(Self {
                count: self.count,
                array: self.with_child(index, Some(new_child)),
            }))),
            None if self.count - 1 <= MIN_ARRAY_CHILDREN => {
                Some(ReferenceCounter::new(Node::Bitmap(self.pack(index))))
            }
            None => Some(ReferenceCounter::new(Node::Array(Self {
                count: self.count - 1,
                array: self.with_child(index, None),
            }))),
        }
    }

    /// Rebuilds the remaining children, minus slot `removed`, as a bitmap node.
    fn pack(&self, removed: usize) -> BitmapIndexedNode<K, V> {
        let mut bitmap: u32 = 0;
        let mut array = Vec::with_capacity(self.count - 1);
        for (index, child) in self.array.iter().enumerate() {
            if index == removed {
                continue;
            }
            if let Some(child) = child {
                bitmap |= 1 << index;
                array.push(Slot::Node(ReferenceCounter::clone(child)));
            }
        }
        tracing::trace!(children = array.len(), "packing array node into bitmap node");
        BitmapIndexedNode { bitmap, array }
    }

    fn with_child(
        &self,
        index: usize,
        child: Option<NodeRef<K, V>>,
    ) -> [Option<NodeRef<K, V>>; BRANCHING_FACTOR] {
        let mut array = self.array.clone();
        array[index] = child;
        array
    }
}

impl<K: Clone + HashEq, V: Clone> HashCollisionNode<K, V> {
    fn without<Q>(&self, this: &NodeRef<K, V>, key: &Q) -> Option<NodeRef<K, V>>
    where
        K: Borrow<Q>,
        Q: HashEq + ?Sized,
    {
        let Some(index) = self.find_index(key) else {
            return Some(ReferenceCounter::clone(this));
        };
        if self.array.len() == 1 {
            return None;
        }
        // A single survivor stays a collision node.
        let mut array = Vec::with_capacity(self.array.len() - 1);
        array.extend_from_slice(&self.array[..index]);
        array.extend_from_slice(&self.array[index + 1..]);
        Some(ReferenceCounter::new(Node::Collision(Self {
            hash: self.hash,
            array,
        })))
    }
}

// =============================================================================
// Insertion
// =============================================================================

impl<K: Clone + HashEq, V: Clone + PartialEq> Node<K, V> {
    /// Associates `key` with `value` in the subtree rooted at `this`.
    ///
    /// Returns the new subtree and whether a new key was added. When the
    /// key already maps to an equal value the returned handle is `this`.
    pub(crate) fn assoc(
        this: &NodeRef<K, V>,
        shift: u32,
        hash: u32,
        key: K,
        value: V,
    ) -> (NodeRef<K, V>, bool) {
        match &**this {
            Self::Bitmap(node) => node.assoc(this, shift, hash, key, value),
            Self::Array(node) => node.assoc(this, shift, hash, key, value),
            Self::Collision(node) => node.assoc(this, shift, hash, key, value),
        }
    }

    /// Builds the subtree holding two distinct keys that met in one slot.
    fn create(shift: u32, key1: K, value1: V, hash2: u32, key2: K, value2: V) -> Self {
        let hash1 = key1.hash_eq();
        if hash1 == hash2 {
            tracing::trace!(hash = hash1, "creating hash collision node");
            return Self::Collision(HashCollisionNode {
                hash: hash1,
                array: vec![(key1, value1), (key2, value2)],
            });
        }

        let index1 = mask(hash1, shift);
        let index2 = mask(hash2, shift);
        if index1 == index2 {
            let child = Self::create(shift + BITS_PER_LEVEL, key1, value1, hash2, key2, value2);
            return Self::Bitmap(BitmapIndexedNode {
                bitmap: 1 << index1,
                array: vec![Slot::Node(ReferenceCounter::new(child))],
            });
        }

        let array = if index1 < index2 {
            vec![Slot::Entry(key1, value1), Slot::Entry(key2, value2)]
        } else {
            vec![Slot::Entry(key2, value2), Slot::Entry(key1, value1)]
        };
        Self::Bitmap(BitmapIndexedNode {
            bitmap: (1 << index1) | (1 << index2),
            array,
        })
    }
}

impl<K: Clone + HashEq, V: Clone + PartialEq> BitmapIndexedNode<K, V> {
    fn assoc(
        &self,
        this: &NodeRef<K, V>,
        shift: u32,
        hash: u32,
        key: K,
        value: V,
    ) -> (NodeRef<K, V>, bool) {
        let bit = bitpos(hash, shift);
        let index = self.index(bit);

        if self.bitmap & bit != 0 {
            return match &self.array[index] {
                Slot::Node(child) => {
                    let (new_child, added) =
                        Node::assoc(child, shift + BITS_PER_LEVEL, hash, key, value);
                    if ReferenceCounter::ptr_eq(child, &new_child) {
                        return (ReferenceCounter::clone(this), false);
                    }
                    (self.replaced(index, Slot::Node(new_child)), added)
                }
                Slot::Entry(entry_key, entry_value) if key.equiv(entry_key) => {
                    if value == *entry_value {
                        return (ReferenceCounter::clone(this), false);
                    }
                    (self.replaced(index, Slot::Entry(entry_key.clone(), value)), false)
                }
                Slot::Entry(entry_key, entry_value) => {
                    let child = Node::create(
                        shift + BITS_PER_LEVEL,
                        entry_key.clone(),
                        entry_value.clone(),
                        hash,
                        key,
                        value,
                    );
                    (
                        self.replaced(index, Slot::Node(ReferenceCounter::new(child))),
                        true,
                    )
                }
            };
        }

        if self.array.len() >= MAX_BITMAP_ENTRIES {
            return (ReferenceCounter::new(Node::Array(self.promote(shift, hash, key, value))), true);
        }

        let mut array = Vec::with_capacity(self.array.len() + 1);
        array.extend_from_slice(&self.array[..index]);
        array.push(Slot::Entry(key, value));
        array.extend_from_slice(&self.array[index..]);
        (
            ReferenceCounter::new(Node::Bitmap(Self {
                bitmap: self.bitmap | bit,
                array,
            })),
            true,
        )
    }

    /// Spreads the full node plus one new key over a 32-slot array node.
    ///
    /// Existing subtrees move over as they are; inline entries each get a
    /// fresh single-entry bitmap node one level down.
    fn promote(&self, shift: u32, hash: u32, key: K, value: V) -> ArrayNode<K, V> {
        let child_shift = shift + BITS_PER_LEVEL;
        let mut array: [Option<NodeRef<K, V>>; BRANCHING_FACTOR] = std::array::from_fn(|_| None);
        array[mask(hash, shift)] = Some(ReferenceCounter::new(Node::singleton(
            child_shift,
            hash,
            key,
            value,
        )));

        let mut slots = self.array.iter();
        for (index, child) in array.iter_mut().enumerate() {
            if (self.bitmap >> index) & 1 == 0 {
                continue;
            }
            *child = slots.next().map(|slot| match slot {
                Slot::Node(node) => ReferenceCounter::clone(node),
                Slot::Entry(entry_key, entry_value) => ReferenceCounter::new(Node::singleton(
                    child_shift,
                    entry_key.hash_eq(),
                    entry_key.clone(),
                    entry_value.clone(),
                )),
            });
        }

        tracing::trace!(shift, children = self.array.len() + 1, "promoting bitmap node to array node");
        ArrayNode {
            count: self.array.len() + 1,
            array,
        }
    }

    fn replaced(&self, index: usize, slot: Slot<K, V>) -> NodeRef<K, V> {
        ReferenceCounter::new(Node::Bitmap(Self {
            bitmap: self.bitmap,
            array: self.with_slot(index, slot),
        }))
    }
}

impl<K: Clone + HashEq, V: Clone + PartialEq> ArrayNode<K, V> {
    fn assoc(
        &self,
        this: &NodeRef<K, V>,
        shift: u32,
        hash: u32,
        key: K,
        value: V,
    ) -> (NodeRef<K, V>, bool) {
        let index = mask(hash, shift);
        let child_shift = shift + BITS_PER_LEVEL;

        let Some(child) = &self.array[index] else {
            let child = Node::singleton(child_shift, hash, key, value);
            return (
                ReferenceCounter::new(Node::Array(Self {
                    count: self.count + 1,
                    array: self.with_child(index, Some(ReferenceCounter::new(child))),
                })),
                true,
            );
        };

        let (new_child, added) = Node::assoc(child, child_shift, hash, key, value);
        if ReferenceCounter::ptr_eq(child, &new_child) {
            return (ReferenceCounter::clone(this), false);
        }
        (
            ReferenceCounter::new(Node::Array(Self {
                count: self.count,
                array: self.with_child(index, Some(new_child)),
            })),
            added,
        )
    }
}

impl<K: Clone + HashEq, V: Clone + PartialEq> HashCollisionNode<K, V> {
    fn assoc(
        &self,
        this: &NodeRef<K, V>,
        shift: u32,
        hash: u32,
        key: K,
        value: V,
    ) -> (NodeRef<K, V>, bool) {
        if hash != self.hash {
            // Nest this node one slice deeper and let the bitmap node
            // discriminate between the two hashes.
            let wrapper = ReferenceCounter::new(Node::Bitmap(BitmapIndexedNode {
                bitmap: bitpos(self.hash, shift),
                array: vec![Slot::Node(ReferenceCounter::clone(this))],
            }));
            return Node::assoc(&wrapper, shift, hash, key, value);
        }

        if let Some(index) = self.find_index(&key) {
            if self.array[index].1 == value {
                return (ReferenceCounter::clone(this), false);
            }
            let mut array = self.array.clone();
            array[index].1 = value;
            return (
                ReferenceCounter::new(Node::Collision(Self {
                    hash: self.hash,
                    array,
                })),
                false,
            );
        }

        let mut array = Vec::with_capacity(self.array.len() + 1);
        array.extend_from_slice(&self.array);
        array.push((key, value));
        (
            ReferenceCounter::new(Node::Collision(Self {
                hash: self.hash,
                array,
            })),
            true,
        )
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    /// Key with a hand-picked hash, compared by `id` alone.
    #[derive(Clone, Debug, PartialEq, Eq)]
    struct FixedHashKey {
        id: u32,
        hash: u32,
    }

    impl HashEq for FixedHashKey {
        fn hash_eq(&self) -> u32 {
            self.hash
        }

        fn equiv(&self, other: &Self) -> bool {
            self.id == other.id
        }
    }

    fn key(id: u32, hash: u32) -> FixedHashKey {
        FixedHashKey { id, hash }
    }

    fn insert(
        root: Option<NodeRef<FixedHashKey, u32>>,
        entry_key: FixedHashKey,
        value: u32,
    ) -> (NodeRef<FixedHashKey, u32>, bool) {
        let hash = entry_key.hash_eq();
        match root {
            Some(root) => Node::assoc(&root, 0, hash, entry_key, value),
            None => (ReferenceCounter::new(Node::singleton(0, hash, entry_key, value)), true),
        }
    }

    fn build(keys: &[FixedHashKey]) -> NodeRef<FixedHashKey, u32> {
        let mut root = None;
        for entry_key in keys {
            let (node, added) = insert(root, entry_key.clone(), entry_key.id);
            assert!(added);
            root = Some(node);
        }
        root.expect("at least one key")
    }

    fn lookup(root: &NodeRef<FixedHashKey, u32>, entry_key: &FixedHashKey) -> Option<u32> {
        root.find(0, entry_key.hash_eq(), entry_key)
            .map(|(_, value)| *value)
    }

    #[rstest]
    #[case(0b00000_00011, 0, 3)]
    #[case(0b00000_00011, 5, 0)]
    #[case(0b10101_00000, 5, 21)]
    #[case(u32::MAX, 30, 3)]
    fn test_mask_extracts_slice(#[case] hash: u32, #[case] shift: u32, #[case] expected: usize) {
        assert_eq!(mask(hash, shift), expected);
    }

    #[rstest]
    fn test_bitmap_index_counts_lower_bits() {
        let node: BitmapIndexedNode<u32, u32> = BitmapIndexedNode {
            bitmap: 0b1011_0010,
            array: Vec::new(),
        };
        assert_eq!(node.index(1 << 1), 0);
        assert_eq!(node.index(1 << 4), 1);
        assert_eq!(node.index(1 << 5), 2);
        assert_eq!(node.index(1 << 7), 3);
    }

    #[rstest]
    fn test_entries_keep_bit_order() {
        let root = build(&[key(1, 9), key(2, 3), key(3, 27)]);
        let Node::Bitmap(node) = &*root else {
            panic!("expected a bitmap node");
        };
        let ids: Vec<u32> = node
            .array
            .iter()
            .map(|slot| match slot {
                Slot::Entry(entry_key, _) => entry_key.id,
                Slot::Node(_) => panic!("expected inline entries"),
            })
            .collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[rstest]
    fn test_same_slice_different_hash_nests_deeper() {
        // Both hashes share slice 1 at shift 0 and split at shift 5.
        let first = key(1, 0b00001_00001);
        let second = key(2, 0b00010_00001);
        let root = build(&[first.clone(), second.clone()]);

        let Node::Bitmap(node) = &*root else {
            panic!("expected a bitmap node");
        };
        assert_eq!(node.bitmap, 1 << 1);
        assert!(matches!(node.array[0], Slot::Node(_)));
        assert_eq!(lookup(&root, &first), Some(1));
        assert_eq!(lookup(&root, &second), Some(2));
    }

    #[rstest]
    fn test_full_hash_collision_creates_collision_node() {
        let root = build(&[key(1, 77), key(2, 77)]);
        let Node::Bitmap(node) = &*root else {
            panic!("expected a bitmap node");
        };
        let Slot::Node(child) = &node.array[0] else {
            panic!("expected a subtree");
        };
        assert!(matches!(&**child, Node::Collision(collision) if collision.array.len() == 2));
    }

    #[rstest]
    fn test_collision_node_with_one_survivor_is_kept() {
        let root = build(&[key(1, 77), key(2, 77)]);
        let first = key(1, 77);
        let without_first = Node::without(&root, 0, 77, &first).expect("one key remains");

        let Node::Bitmap(node) = &*without_first else {
            panic!("expected a bitmap node");
        };
        let Slot::Node(child) = &node.array[0] else {
            panic!("expected a subtree");
        };
        assert!(matches!(&**child, Node::Collision(collision) if collision.array.len() == 1));
        assert_eq!(lookup(&without_first, &key(2, 77)), Some(2));

        let second = key(2, 77);
        assert!(Node::without(&without_first, 0, 77, &second).is_none());
    }

    #[rstest]
    fn test_collision_node_rehomes_different_hash() {
        let colliding = [key(1, 0b00001_00100), key(2, 0b00001_00100)];
        let root = build(&colliding);
        // Same slice at shift 0 and shift 5, different full hash.
        let stranger = key(3, 0b00011_00001_00100);
        let (root, added) = insert(Some(root), stranger.clone(), 3);

        assert!(added);
        assert_eq!(lookup(&root, &colliding[0]), Some(1));
        assert_eq!(lookup(&root, &colliding[1]), Some(2));
        assert_eq!(lookup(&root, &stranger), Some(3));
    }

    #[rstest]
    fn test_assoc_same_value_returns_same_node() {
        let root = build(&[key(1, 1), key(2, 2), key(3, 3)]);
        let (same, added) = insert(Some(ReferenceCounter::clone(&root)), key(2, 2), 2);
        assert!(!added);
        assert!(ReferenceCounter::ptr_eq(&root, &same));

        let (changed, added) = insert(Some(ReferenceCounter::clone(&root)), key(2, 2), 20);
        assert!(!added);
        assert!(!ReferenceCounter::ptr_eq(&root, &changed));
        assert_eq!(lookup(&changed, &key(2, 2)), Some(20));
        assert_eq!(lookup(&root, &key(2, 2)), Some(2));
    }

    #[rstest]
    fn test_without_absent_key_returns_same_node() {
        let root = build(&[key(1, 1), key(2, 2)]);
        let absent = key(9, 9);
        let result = Node::without(&root, 0, absent.hash_eq(), &absent).expect("not emptied");
        assert!(ReferenceCounter::ptr_eq(&root, &result));

        // Same slot, different key
        let impostor = key(8, 1);
        let result = Node::without(&root, 0, impostor.hash_eq(), &impostor).expect("not emptied");
        assert!(ReferenceCounter::ptr_eq(&root, &result));
    }

    #[rstest]
    fn test_seventeenth_slice_promotes_and_removal_packs() {
        let keys: Vec<FixedHashKey> = (0..17).map(|id| key(id, id)).collect();
        let bitmap_root = build(&keys[..16]);
        assert!(matches!(&*bitmap_root, Node::Bitmap(node) if node.array.len() == 16));

        let (mut root, added) = insert(Some(bitmap_root), keys[16].clone(), 16);
        assert!(added);
        assert!(matches!(&*root, Node::Array(node) if node.count == 17));
        for entry_key in &keys {
            assert_eq!(lookup(&root, entry_key), Some(entry_key.id));
        }

        for (removed, entry_key) in keys.iter().enumerate().take(12) {
            root = Node::without(&root, 0, entry_key.hash_eq(), entry_key).expect("keys remain");
            let remaining = 17 - (removed + 1);
            if remaining > MIN_ARRAY_CHILDREN {
                assert!(matches!(&*root, Node::Array(node) if node.count == remaining));
            } else {
                assert!(matches!(&*root, Node::Bitmap(node) if node.array.len() == remaining));
            }
            for survivor in &keys[removed + 1..] {
                assert_eq!(lookup(&root, survivor), Some(survivor.id));
            }
            assert_eq!(lookup(&root, entry_key), None);
        }
    }

    #[rstest]
    #[case(8, true)]
    #[case(9, false)]
    fn test_array_node_kind_at_pack_boundary(#[case] removals: usize, #[case] stays_array: bool) {
        let keys: Vec<FixedHashKey> = (0..17).map(|id| key(id, id)).collect();
        let mut root = build(&keys);
        for entry_key in &keys[..removals] {
            root = Node::without(&root, 0, entry_key.hash_eq(), entry_key).expect("keys remain");
        }

        let remaining = keys.len() - removals;
        if stays_array {
            assert!(matches!(&*root, Node::Array(node) if node.count == remaining));
        } else {
            assert!(matches!(
                &*root,
                Node::Bitmap(node) if node.array.len() == remaining
                    && node.bitmap.count_ones() as usize == remaining
            ));
        }
        for survivor in &keys[removals..] {
            assert_eq!(lookup(&root, survivor), Some(survivor.id));
        }
    }

    #[rstest]
    fn test_array_node_fills_empty_slot() {
        let keys: Vec<FixedHashKey> = (0..17).map(|id| key(id, id)).collect();
        let root = build(&keys);
        let (root, added) = insert(Some(root), key(20, 20), 20);
        assert!(added);
        assert!(matches!(&*root, Node::Array(node) if node.count == 18));
        assert_eq!(lookup(&root, &key(20, 20)), Some(20));
    }
}
