use alloc::vec::Vec;

use super::handle::Handle;
use crate::comparator::Comparator;

/// Upper bound on the slots a fresh node reserves; wider nodes grow on demand.
const INITIAL_CAPACITY: usize = 64;

/// Non-owning links of a node.
///
/// `prev`/`next` point at the neighbouring nodes on the same level, across
/// parent boundaries; the first node of a level has no `prev`, the last no
/// `next`. Ownership only flows from the tree through `children`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct Links {
    pub(crate) parent: Option<Handle>,
    pub(crate) prev: Option<Handle>,
    pub(crate) next: Option<Handle>,
}

#[allow(clippy::large_enum_variant)]
pub(crate) enum Node<K, V> {
    Internal(InternalNode<K>),
    Leaf(LeafNode<K, V>),
}

// B+Tree: Internal nodes store separator keys and child handles.
//
// Entry `i` is (`keys[i]`, `children[i]`, `children[i + 1]`): adjacent entries
// share the child between them. Every key under `children[i]` is less than
// `keys[i]`, every key under `children[i + 1]` is greater or equal.
pub(crate) struct InternalNode<K> {
    links: Links,
    keys: Vec<K>,
    children: Vec<Handle>,
}

// B+Tree: Leaf nodes own their keys and values.
pub(crate) struct LeafNode<K, V> {
    links: Links,
    keys: Vec<K>,
    values: Vec<V>,
}

/// Result of searching for a key in a leaf.
pub(crate) enum SearchResult {
    /// Key was found at the given index.
    Found(usize),
    /// Key was not found; index is where it would be inserted.
    NotFound(usize),
}

impl SearchResult {
    /// Index of the match, or of the first key greater than the probe.
    pub(crate) fn index(self) -> usize {
        match self {
            SearchResult::Found(idx) | SearchResult::NotFound(idx) => idx,
        }
    }
}

impl<K, V> Node<K, V> {
    /// Returns true if this is a leaf node.
    #[cfg(test)]
    pub(crate) fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    /// Returns the leaf node, panicking if this is not a leaf.
    pub(crate) fn as_leaf(&self) -> &LeafNode<K, V> {
        match self {
            Node::Leaf(leaf) => leaf,
            Node::Internal(_) => panic!("expected leaf node"),
        }
    }

    /// Returns the leaf node mutably, panicking if this is not a leaf.
    pub(crate) fn as_leaf_mut(&mut self) -> &mut LeafNode<K, V> {
        match self {
            Node::Leaf(leaf) => leaf,
            Node::Internal(_) => panic!("expected leaf node"),
        }
    }

    /// Returns the internal node, panicking if this is not internal.
    pub(crate) fn as_internal(&self) -> &InternalNode<K> {
        match self {
            Node::Internal(internal) => internal,
            Node::Leaf(_) => panic!("expected internal node"),
        }
    }

    /// Returns the internal node mutably, panicking if this is not internal.
    pub(crate) fn as_internal_mut(&mut self) -> &mut InternalNode<K> {
        match self {
            Node::Internal(internal) => internal,
            Node::Leaf(_) => panic!("expected internal node"),
        }
    }

    pub(crate) fn into_leaf(self) -> LeafNode<K, V> {
        match self {
            Node::Leaf(leaf) => leaf,
            Node::Internal(_) => panic!("expected leaf node"),
        }
    }

    pub(crate) fn into_internal(self) -> InternalNode<K> {
        match self {
            Node::Internal(internal) => internal,
            Node::Leaf(_) => panic!("expected internal node"),
        }
    }

    /// Returns the number of keys in this node.
    pub(crate) fn key_count(&self) -> usize {
        match self {
            Node::Internal(internal) => internal.key_count(),
            Node::Leaf(leaf) => leaf.key_count(),
        }
    }

    #[cfg(test)]
    pub(crate) fn keys(&self) -> &[K] {
        match self {
            Node::Internal(internal) => internal.keys(),
            Node::Leaf(leaf) => leaf.keys(),
        }
    }

    pub(crate) fn links(&self) -> &Links {
        match self {
            Node::Internal(internal) => &internal.links,
            Node::Leaf(leaf) => &leaf.links,
        }
    }

    pub(crate) fn links_mut(&mut self) -> &mut Links {
        match self {
            Node::Internal(internal) => &mut internal.links,
            Node::Leaf(leaf) => &mut leaf.links,
        }
    }

    pub(crate) fn parent(&self) -> Option<Handle> {
        self.links().parent
    }

    pub(crate) fn prev(&self) -> Option<Handle> {
        self.links().prev
    }

    pub(crate) fn next(&self) -> Option<Handle> {
        self.links().next
    }
}

impl<K> InternalNode<K> {
    /// Creates an empty internal node sized for `order` separators plus the
    /// overflow slot used while splitting, up to [`INITIAL_CAPACITY`].
    pub(crate) fn with_capacity(order: usize) -> Self {
        let reserve = order.min(INITIAL_CAPACITY);
        Self {
            links: Links::default(),
            keys: Vec::with_capacity(reserve.saturating_add(1)),
            children: Vec::with_capacity(reserve.saturating_add(2)),
        }
    }

    /// Builds a node from separators and children; links start empty.
    pub(crate) fn from_parts(keys: Vec<K>, children: Vec<Handle>) -> Self {
        debug_assert_eq!(keys.len() + 1, children.len(), "internal node needs one more child than keys");
        Self {
            links: Links::default(),
            keys,
            children,
        }
    }

    /// Returns the number of keys in this node.
    pub(crate) fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Returns the number of children in this node.
    pub(crate) fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Returns the key at the given index.
    #[cfg(test)]
    pub(crate) fn key(&self, index: usize) -> &K {
        &self.keys[index]
    }

    /// Returns all keys.
    pub(crate) fn keys(&self) -> &[K] {
        &self.keys
    }

    /// Returns the child handle at the given index.
    #[inline]
    pub(crate) fn child(&self, index: usize) -> Handle {
        self.children[index]
    }

    /// Returns all children.
    pub(crate) fn children(&self) -> &[Handle] {
        &self.children
    }

    /// Position of `child` among this node's children.
    pub(crate) fn child_index(&self, child: Handle) -> Option<usize> {
        self.children.iter().position(|&c| c == child)
    }

    /// Searches for the child index that might contain the given key.
    #[inline]
    pub(crate) fn search_child<C>(&self, key: &K, cmp: &C) -> usize
    where
        C: Comparator<K> + ?Sized,
    {
        // keys[i] is a lower bound for everything under children[i + 1], so an
        // exact match descends to the right.
        match self.keys.binary_search_by(|k| cmp.compare(k, key)) {
            Ok(idx) => idx + 1,
            Err(idx) => idx,
        }
    }

    /// Inserts `key` at `index` with `child` as its right-hand child.
    pub(crate) fn insert_child(&mut self, index: usize, key: K, child: Handle) {
        self.keys.insert(index, key);
        self.children.insert(index + 1, child);
    }

    /// Removes the key at `index` together with its right-hand child.
    pub(crate) fn remove_child(&mut self, index: usize) -> (K, Handle) {
        let key = self.keys.remove(index);
        let child = self.children.remove(index + 1);
        (key, child)
    }

    /// Replaces the separator at `index`, returning the old one.
    pub(crate) fn replace_key(&mut self, index: usize, key: K) -> K {
        core::mem::replace(&mut self.keys[index], key)
    }

    /// Takes all keys and children, leaving the node empty.
    pub(crate) fn take_all(&mut self) -> (Vec<K>, Vec<Handle>) {
        (core::mem::take(&mut self.keys), core::mem::take(&mut self.children))
    }

    /// Replaces the node's contents.
    pub(crate) fn set_entries(&mut self, keys: Vec<K>, children: Vec<Handle>) {
        debug_assert_eq!(keys.len() + 1, children.len(), "internal node needs one more child than keys");
        self.keys = keys;
        self.children = children;
    }

    /// Splits an overfull node. The left (current) node keeps `keys[..mid]`,
    /// `keys[mid]` is returned for promotion and is kept by neither half, and
    /// the right node takes the rest along with the matching children.
    pub(crate) fn split(&mut self, mid: usize) -> (K, InternalNode<K>) {
        let right_keys: Vec<K> = self.keys.drain(mid + 1..).collect();
        let right_children: Vec<Handle> = self.children.drain(mid + 1..).collect();
        let median = self.keys.pop().expect("internal split below median");
        (median, InternalNode::from_parts(right_keys, right_children))
    }

    /// Absorbs a right sibling, demoting `separator` between the two key runs.
    pub(crate) fn merge_with_right(&mut self, separator: K, mut right: InternalNode<K>) {
        self.keys.push(separator);
        self.keys.append(&mut right.keys);
        self.children.append(&mut right.children);
        self.links.next = right.links.next;
    }
}

impl<K, V> LeafNode<K, V> {
    /// Creates an empty leaf sized for `order` entries plus the overflow slot,
    /// up to [`INITIAL_CAPACITY`].
    pub(crate) fn with_capacity(order: usize) -> Self {
        let reserve = order.min(INITIAL_CAPACITY).saturating_add(1);
        Self {
            links: Links::default(),
            keys: Vec::with_capacity(reserve),
            values: Vec::with_capacity(reserve),
        }
    }

    /// Builds a leaf from parallel key/value runs; links start empty.
    pub(crate) fn from_parts(keys: Vec<K>, values: Vec<V>) -> Self {
        debug_assert_eq!(keys.len(), values.len(), "leaf keys and values out of step");
        Self {
            links: Links::default(),
            keys,
            values,
        }
    }

    /// Returns the number of keys in this node.
    pub(crate) fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Returns the key at the given index.
    #[inline]
    pub(crate) fn key(&self, index: usize) -> &K {
        &self.keys[index]
    }

    /// Returns all keys.
    pub(crate) fn keys(&self) -> &[K] {
        &self.keys
    }

    /// Returns the value at the given index.
    #[inline]
    pub(crate) fn value(&self, index: usize) -> &V {
        &self.values[index]
    }

    #[inline]
    pub(crate) fn value_mut(&mut self, index: usize) -> &mut V {
        &mut self.values[index]
    }

    /// Returns all values.
    pub(crate) fn values(&self) -> &[V] {
        &self.values
    }

    pub(crate) fn next(&self) -> Option<Handle> {
        self.links.next
    }

    pub(crate) fn prev(&self) -> Option<Handle> {
        self.links.prev
    }

    /// Searches for a key in this leaf.
    #[inline]
    pub(crate) fn search<C>(&self, key: &K, cmp: &C) -> SearchResult
    where
        C: Comparator<K> + ?Sized,
    {
        match self.keys.binary_search_by(|k| cmp.compare(k, key)) {
            Ok(idx) => SearchResult::Found(idx),
            Err(idx) => SearchResult::NotFound(idx),
        }
    }

    /// Inserts a key and value at the given position.
    pub(crate) fn insert(&mut self, index: usize, key: K, value: V) {
        self.keys.insert(index, key);
        self.values.insert(index, value);
    }

    /// Removes the key and value at the given position.
    pub(crate) fn remove(&mut self, index: usize) -> (K, V) {
        let key = self.keys.remove(index);
        let value = self.values.remove(index);
        (key, value)
    }

    /// Stores `value` at `index`, returning the previous one.
    pub(crate) fn replace_value(&mut self, index: usize, value: V) -> V {
        core::mem::replace(&mut self.values[index], value)
    }

    /// Takes all keys and values, leaving the leaf empty.
    pub(crate) fn take_all(&mut self) -> (Vec<K>, Vec<V>) {
        (core::mem::take(&mut self.keys), core::mem::take(&mut self.values))
    }

    /// Appends already-ordered entries that sort after every current key.
    pub(crate) fn append(&mut self, mut keys: Vec<K>, mut values: Vec<V>) {
        self.keys.append(&mut keys);
        self.values.append(&mut values);
    }

    /// Moves the entries from `at` onwards out of this leaf.
    pub(crate) fn split_off(&mut self, at: usize) -> (Vec<K>, Vec<V>) {
        (self.keys.split_off(at), self.values.split_off(at))
    }

    /// Absorbs a right sibling and takes over its `next` link.
    pub(crate) fn merge_with_right(&mut self, mut right: LeafNode<K, V>) {
        self.keys.append(&mut right.keys);
        self.values.append(&mut right.values);
        self.links.next = right.links.next;
    }
}
