use alloc::vec::Vec;

use smallvec::{SmallVec, smallvec};
use tracing::trace;

use super::arena::Arena;
use super::handle::Handle;
use super::node::{InternalNode, LeafNode, Node, SearchResult};
use crate::comparator::Comparator;
use crate::order::Order;

/// One level of the tree, left to right. Levels near the root are small.
type Level = SmallVec<[Handle; 16]>;

/// The core B+Tree implementation backing `BPTree`.
///
/// Every node lives in `nodes` and is addressed by [`Handle`]. Ownership flows
/// from the root through `children`; `parent`, `prev` and `next` are plain
/// handles. The root always exists: an empty tree is a single empty leaf.
pub(crate) struct RawBPTree<K, V, C> {
    /// Arena storing all tree nodes.
    nodes: Arena<Node<K, V>>,
    /// Handle to the root node.
    root: Handle,
    /// Maximum entries per node.
    order: Order,
    /// Ordering of keys.
    comparator: C,
    /// Total number of key-value pairs in the tree.
    len: usize,
}

impl<K, V, C> RawBPTree<K, V, C> {
    /// Creates a new, empty tree.
    pub(crate) fn new(order: Order, comparator: C) -> Self {
        let mut nodes = Arena::new();
        let root = nodes.alloc(Node::Leaf(LeafNode::with_capacity(order.max_entries())));
        Self {
            nodes,
            root,
            order,
            comparator,
            len: 0,
        }
    }

    /// Returns the number of key-value pairs in the tree.
    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the tree contains no elements.
    pub(crate) const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) const fn order(&self) -> Order {
        self.order
    }

    pub(crate) const fn comparator(&self) -> &C {
        &self.comparator
    }

    /// Node storage, for iterators that walk the leaf chain.
    pub(crate) const fn nodes(&self) -> &Arena<Node<K, V>> {
        &self.nodes
    }

    /// Number of levels; a lone leaf root is height 1.
    pub(crate) fn height(&self) -> usize {
        let mut height = 1;
        let mut current = self.root;
        while let Node::Internal(internal) = self.nodes.get(current) {
            current = internal.child(0);
            height += 1;
        }
        height
    }

    /// Leftmost leaf, the head of the leaf chain.
    pub(crate) fn first_leaf(&self) -> Handle {
        let mut current = self.root;
        while let Node::Internal(internal) = self.nodes.get(current) {
            current = internal.child(0);
        }
        current
    }

    /// Rightmost leaf, the tail of the leaf chain.
    pub(crate) fn last_leaf(&self) -> Handle {
        let mut current = self.root;
        while let Node::Internal(internal) = self.nodes.get(current) {
            current = internal.child(internal.child_count() - 1);
        }
        current
    }

    /// Returns the first key-value pair in the tree.
    pub(crate) fn first_key_value(&self) -> Option<(&K, &V)> {
        let leaf = self.nodes.get(self.first_leaf()).as_leaf();
        if leaf.key_count() == 0 {
            return None;
        }
        Some((leaf.key(0), leaf.value(0)))
    }

    /// Returns the last key-value pair in the tree.
    pub(crate) fn last_key_value(&self) -> Option<(&K, &V)> {
        let leaf = self.nodes.get(self.last_leaf()).as_leaf();
        let count = leaf.key_count();
        if count == 0 {
            return None;
        }
        Some((leaf.key(count - 1), leaf.value(count - 1)))
    }

    /// Drops every node and installs a fresh empty leaf root.
    pub(crate) fn clear(&mut self) {
        let dropped = self.len;
        self.nodes.clear();
        self.root = self.nodes.alloc(Node::Leaf(LeafNode::with_capacity(self.order.max_entries())));
        self.len = 0;
        trace!(dropped, "cleared tree");
    }

    /// Places `right` directly after `left` on `left`'s level, under the same
    /// parent.
    fn splice_after(&mut self, left: Handle, right: Handle) {
        let left_links = *self.nodes.get(left).links();

        let links = self.nodes.get_mut(right).links_mut();
        links.parent = left_links.parent;
        links.prev = Some(left);
        links.next = left_links.next;

        self.nodes.get_mut(left).links_mut().next = Some(right);
        if let Some(old_next) = left_links.next {
            self.nodes.get_mut(old_next).links_mut().prev = Some(right);
        }
    }

    /// Points the parent link of every child of `parent` back at it.
    fn adopt_children(&mut self, parent: Handle) {
        let count = self.nodes.get(parent).as_internal().child_count();
        for i in 0..count {
            let child = self.nodes.get(parent).as_internal().child(i);
            self.nodes.get_mut(child).links_mut().parent = Some(parent);
        }
    }

    /// Index of `child` within its parent, together with the parent.
    fn position_in_parent(&self, child: Handle) -> (Handle, usize) {
        let parent = self.nodes.get(child).parent().expect("non-root node has a parent");
        let index = self
            .nodes
            .get(parent)
            .as_internal()
            .child_index(child)
            .expect("node is listed among its parent's children");
        (parent, index)
    }

    /// Picks the sibling an underflowing node rebalances with.
    ///
    /// The left sibling is chosen unless the right one holds strictly more
    /// entries. Neighbours under a different parent are not siblings here.
    /// Returns the sibling and whether it sits to the left.
    fn pick_sibling(&self, handle: Handle) -> (Handle, bool) {
        let node = self.nodes.get(handle);
        let parent = node.parent();
        let same_parent = |h: Handle| self.nodes.get(h).parent() == parent;

        let left = node.prev().filter(|&h| same_parent(h));
        let right = node.next().filter(|&h| same_parent(h));

        match (left, right) {
            (Some(l), Some(r)) if self.nodes.get(r).key_count() > self.nodes.get(l).key_count() => (r, false),
            (Some(l), _) => (l, true),
            (None, Some(r)) => (r, false),
            (None, None) => panic!("non-root node {handle:?} has no sibling under its parent"),
        }
    }

    /// Rebuilds every parent and sibling link from the shape of the tree,
    /// one level at a time.
    fn relink(&mut self) {
        self.nodes.get_mut(self.root).links_mut().parent = None;

        let mut level: Level = smallvec![self.root];
        while !level.is_empty() {
            let mut below = Level::new();
            for (i, &handle) in level.iter().enumerate() {
                let links = self.nodes.get_mut(handle).links_mut();
                links.prev = i.checked_sub(1).map(|p| level[p]);
                links.next = level.get(i + 1).copied();

                if let Node::Internal(internal) = self.nodes.get(handle) {
                    below.extend_from_slice(internal.children());
                    self.adopt_children(handle);
                }
            }
            level = below;
        }
    }
}

impl<K, V, C: Comparator<K>> RawBPTree<K, V, C> {
    /// Descends from the root to the leaf where `key` lives or would live.
    fn descend(&self, key: &K) -> Handle {
        let mut current = self.root;
        loop {
            match self.nodes.get(current) {
                Node::Internal(internal) => {
                    current = internal.child(internal.search_child(key, &self.comparator));
                }
                Node::Leaf(_) => return current,
            }
        }
    }

    /// Searches for a key and returns the leaf handle and index if found.
    pub(crate) fn search(&self, key: &K) -> Option<(Handle, usize)> {
        let leaf = self.descend(key);
        match self.nodes.get(leaf).as_leaf().search(key, &self.comparator) {
            SearchResult::Found(idx) => Some((leaf, idx)),
            SearchResult::NotFound(_) => None,
        }
    }

    /// Position of the first entry not less than `key`. The index may equal
    /// the leaf's length, in which case the entry is the head of the next leaf.
    pub(crate) fn lower_bound(&self, key: &K) -> (Handle, usize) {
        let leaf = self.descend(key);
        let idx = self.nodes.get(leaf).as_leaf().search(key, &self.comparator).index();
        (leaf, idx)
    }

    /// Returns a reference to the value corresponding to the key.
    pub(crate) fn get(&self, key: &K) -> Option<&V> {
        let (leaf, idx) = self.search(key)?;
        Some(self.nodes.get(leaf).as_leaf().value(idx))
    }

    /// Returns the stored key and value for `key`.
    pub(crate) fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        let (leaf, idx) = self.search(key)?;
        let leaf = self.nodes.get(leaf).as_leaf();
        Some((leaf.key(idx), leaf.value(idx)))
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub(crate) fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let (leaf, idx) = self.search(key)?;
        Some(self.nodes.get_mut(leaf).as_leaf_mut().value_mut(idx))
    }

    /// Returns true if the tree contains the specified key.
    pub(crate) fn contains_key(&self, key: &K) -> bool {
        self.search(key).is_some()
    }
}

impl<K: Clone, V, C: Comparator<K>> RawBPTree<K, V, C> {
    /// Inserts a key-value pair into the tree.
    /// Returns the old value if the key was already present; the shape of the
    /// tree is untouched in that case.
    pub(crate) fn insert(&mut self, key: K, value: V) -> Option<V> {
        let leaf_handle = self.descend(&key);
        let max = self.order.max_entries();

        let leaf = self.nodes.get_mut(leaf_handle).as_leaf_mut();
        match leaf.search(&key, &self.comparator) {
            SearchResult::Found(idx) => Some(leaf.replace_value(idx, value)),
            SearchResult::NotFound(idx) => {
                leaf.insert(idx, key, value);
                self.len += 1;
                if leaf.key_count() > max {
                    self.split_leaf(leaf_handle);
                }
                None
            }
        }
    }

    /// Splits an overfull leaf. The right half's first key is copied upward
    /// as the separator and stays in the right leaf.
    fn split_leaf(&mut self, leaf_handle: Handle) {
        let mid = self.order.split_index();
        let (keys, values) = self.nodes.get_mut(leaf_handle).as_leaf_mut().split_off(mid);
        let separator = keys[0].clone();

        let right_handle = self.nodes.alloc(Node::Leaf(LeafNode::from_parts(keys, values)));
        self.splice_after(leaf_handle, right_handle);
        trace!(left = ?leaf_handle, right = ?right_handle, "split leaf");

        self.insert_into_parent(leaf_handle, separator, right_handle);
    }

    /// Splits an overfull internal node. The median separator moves up and
    /// is kept by neither half.
    fn split_internal(&mut self, handle: Handle) {
        let mid = self.order.split_index();
        let (median, right) = self.nodes.get_mut(handle).as_internal_mut().split(mid);

        let right_handle = self.nodes.alloc(Node::Internal(right));
        self.splice_after(handle, right_handle);
        self.adopt_children(right_handle);
        trace!(left = ?handle, right = ?right_handle, "split internal node");

        self.insert_into_parent(handle, median, right_handle);
    }

    /// Hooks the new right half of a split into the parent of `left`,
    /// splitting upward while ancestors overflow.
    fn insert_into_parent(&mut self, left: Handle, separator: K, right: Handle) {
        let Some(parent) = self.nodes.get(left).parent() else {
            self.grow_root(left, separator, right);
            return;
        };

        let max = self.order.max_entries();
        let node = self.nodes.get_mut(parent).as_internal_mut();
        let idx = node.child_index(left).expect("split node is listed among its parent's children");
        node.insert_child(idx, separator, right);

        if node.key_count() > max {
            self.split_internal(parent);
        }
    }

    /// The old root split in two: put a new root above both halves.
    fn grow_root(&mut self, left: Handle, separator: K, right: Handle) {
        let mut root = InternalNode::with_capacity(self.order.max_entries());
        root.set_entries(alloc::vec![separator], alloc::vec![left, right]);

        let root_handle = self.nodes.alloc(Node::Internal(root));
        self.adopt_children(root_handle);
        self.root = root_handle;
        trace!(root = ?root_handle, height = self.height(), "grew new root");
    }

    /// Removes a key from the tree and returns the value.
    pub(crate) fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_entry(key).map(|(_, v)| v)
    }

    /// Removes a key from the tree and returns the key-value pair.
    pub(crate) fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        let leaf_handle = self.descend(key);
        let min = self.order.min_leaf_entries();

        let leaf = self.nodes.get_mut(leaf_handle).as_leaf_mut();
        let SearchResult::Found(idx) = leaf.search(key, &self.comparator) else {
            return None;
        };
        let entry = leaf.remove(idx);
        self.len -= 1;

        // The root may shrink to nothing; every other leaf keeps its minimum.
        if leaf.key_count() < min && leaf_handle != self.root {
            self.rebalance_leaf(leaf_handle);
        }

        Some(entry)
    }

    /// Restores the minimum fill of a non-root leaf by borrowing from or
    /// merging with a sibling under the same parent.
    fn rebalance_leaf(&mut self, handle: Handle) {
        let (sibling, sibling_is_left) = self.pick_sibling(handle);
        let (left, right) = if sibling_is_left { (sibling, handle) } else { (handle, sibling) };

        if self.nodes.get(sibling).key_count() > self.order.min_leaf_entries() {
            self.redistribute_leaves(left, right);
        } else {
            self.merge_leaves(left, right);
        }
    }

    /// Evens out two adjacent leaves. The right leaf takes the extra entry on
    /// odd totals and its new first key becomes the separator between them.
    fn redistribute_leaves(&mut self, left: Handle, right: Handle) {
        let (parent, idx) = self.position_in_parent(left);

        let (keys, values) = self.nodes.get_mut(right).as_leaf_mut().take_all();
        let left_leaf = self.nodes.get_mut(left).as_leaf_mut();
        left_leaf.append(keys, values);
        let keep = left_leaf.key_count() / 2;
        let (keys, values) = left_leaf.split_off(keep);
        let separator = keys[0].clone();

        self.nodes.get_mut(right).as_leaf_mut().append(keys, values);
        self.nodes.get_mut(parent).as_internal_mut().replace_key(idx, separator);
        trace!(left = ?left, right = ?right, separator_index = idx, "redistributed leaves");
    }

    /// Folds `right` into `left`, drops their separator from the parent and
    /// unlinks `right` from the leaf chain.
    fn merge_leaves(&mut self, left: Handle, right: Handle) {
        let (parent, idx) = self.position_in_parent(left);

        let right_leaf = self.nodes.take(right).into_leaf();
        self.nodes.get_mut(left).as_leaf_mut().merge_with_right(right_leaf);
        if let Some(next) = self.nodes.get(left).next() {
            self.nodes.get_mut(next).links_mut().prev = Some(left);
        }

        let (_separator, removed) = self.nodes.get_mut(parent).as_internal_mut().remove_child(idx);
        debug_assert_eq!(removed, right, "separator removed next to the wrong child");
        trace!(left = ?left, right = ?right, "merged leaves");

        self.rebalance_internal(parent);
    }

    /// Restores the minimum fill of an internal node after it lost a
    /// separator to a merge below it. A root left without separators hands
    /// the tree to its only child.
    fn rebalance_internal(&mut self, handle: Handle) {
        let count = self.nodes.get(handle).key_count();
        if handle == self.root {
            if count == 0 {
                self.collapse_root();
            }
            return;
        }
        if count >= self.order.min_internal_entries() {
            return;
        }

        let (sibling, sibling_is_left) = self.pick_sibling(handle);
        let (left, right) = if sibling_is_left { (sibling, handle) } else { (handle, sibling) };

        if self.nodes.get(sibling).key_count() > self.order.min_internal_entries() {
            self.redistribute_internals(left, right);
        } else {
            self.merge_internals(left, right);
        }
    }

    /// Evens out two adjacent internal nodes by rotating separators through
    /// the parent: the parent's separator is demoted into the receiving node
    /// and the key at the new boundary is promoted in its place. The right
    /// node takes the extra separator on odd totals.
    fn redistribute_internals(&mut self, left: Handle, right: Handle) {
        let (parent, idx) = self.position_in_parent(left);

        let (mut left_keys, mut left_children) = self.nodes.get_mut(left).as_internal_mut().take_all();
        let (mut right_keys, mut right_children) = self.nodes.get_mut(right).as_internal_mut().take_all();
        let keep = (left_keys.len() + right_keys.len()) / 2;
        let parent_node = self.nodes.get_mut(parent).as_internal_mut();

        if keep < left_keys.len() {
            // Left lends its tail.
            let mut moved_keys = left_keys.split_off(keep);
            let promoted = moved_keys.remove(0);
            moved_keys.push(parent_node.replace_key(idx, promoted));
            moved_keys.append(&mut right_keys);

            let mut moved_children = left_children.split_off(keep + 1);
            moved_children.append(&mut right_children);

            right_keys = moved_keys;
            right_children = moved_children;
        } else if keep > left_keys.len() {
            // Right lends its head.
            let gained = keep - left_keys.len();
            let rest_keys = right_keys.split_off(gained);
            let promoted = right_keys.pop().expect("right sibling lends at least one separator");
            left_keys.push(parent_node.replace_key(idx, promoted));
            left_keys.append(&mut right_keys);

            let rest_children = right_children.split_off(gained);
            left_children.append(&mut right_children);

            right_keys = rest_keys;
            right_children = rest_children;
        }

        self.nodes.get_mut(left).as_internal_mut().set_entries(left_keys, left_children);
        self.nodes.get_mut(right).as_internal_mut().set_entries(right_keys, right_children);
        self.adopt_children(left);
        self.adopt_children(right);
        trace!(left = ?left, right = ?right, separator_index = idx, "redistributed internal nodes");
    }

    /// Folds `right` into `left`, demoting their separator from the parent,
    /// then checks the parent in turn.
    fn merge_internals(&mut self, left: Handle, right: Handle) {
        let (parent, idx) = self.position_in_parent(left);

        let (separator, removed) = self.nodes.get_mut(parent).as_internal_mut().remove_child(idx);
        debug_assert_eq!(removed, right, "separator removed next to the wrong child");

        let right_node = self.nodes.take(right).into_internal();
        self.nodes.get_mut(left).as_internal_mut().merge_with_right(separator, right_node);
        if let Some(next) = self.nodes.get(left).next() {
            self.nodes.get_mut(next).links_mut().prev = Some(left);
        }
        self.adopt_children(left);
        trace!(left = ?left, right = ?right, "merged internal nodes");

        self.rebalance_internal(parent);
    }

    /// Replaces a root that has no separators left with its only child.
    fn collapse_root(&mut self) {
        let old_root = self.root;
        let child = self.nodes.take(old_root).into_internal().child(0);

        let links = self.nodes.get_mut(child).links_mut();
        links.parent = None;
        debug_assert!(links.prev.is_none() && links.next.is_none(), "new root has level siblings");

        self.root = child;
        trace!(old_root = ?old_root, root = ?child, height = self.height(), "collapsed root");
    }
}

impl<K: Clone, V: Clone, C: Clone> Clone for RawBPTree<K, V, C> {
    /// Deep copy. Entry data is copied depth-first into a compacted arena
    /// with empty links, then [`relink`](Self::relink) derives every parent
    /// and sibling link from the copied shape.
    fn clone(&self) -> Self {
        fn copy_subtree<K: Clone, V: Clone>(
            from: &Arena<Node<K, V>>,
            to: &mut Arena<Node<K, V>>,
            handle: Handle,
        ) -> Handle {
            match from.get(handle) {
                Node::Leaf(leaf) => {
                    to.alloc(Node::Leaf(LeafNode::from_parts(leaf.keys().to_vec(), leaf.values().to_vec())))
                }
                Node::Internal(internal) => {
                    let children: Vec<Handle> =
                        internal.children().iter().map(|&child| copy_subtree(from, to, child)).collect();
                    to.alloc(Node::Internal(InternalNode::from_parts(internal.keys().to_vec(), children)))
                }
            }
        }

        let mut nodes = Arena::with_capacity(self.nodes.len());
        let root = copy_subtree(&self.nodes, &mut nodes, self.root);

        let mut copy = Self {
            nodes,
            root,
            order: self.order,
            comparator: self.comparator.clone(),
            len: self.len,
        };
        copy.relink();
        copy
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::comparator::{NaturalOrder, ReverseOrder};
    use crate::raw::node::Links;
    use alloc::collections::BTreeMap;
    use alloc::string::String;
    use alloc::vec;
    use core::cmp::Ordering;
    use proptest::prelude::*;

    type Tree<C = NaturalOrder> = RawBPTree<i32, i32, C>;

    fn tree(order: usize) -> Tree {
        RawBPTree::new(Order::new(order).unwrap(), NaturalOrder)
    }

    fn tree_with<I: IntoIterator<Item = i32>>(order: usize, keys: I) -> Tree {
        let mut tree = tree(order);
        for key in keys {
            tree.insert(key, key);
            tree.validate_invariants();
        }
        tree
    }

    impl<K: Clone + core::fmt::Debug, V, C: Comparator<K>> RawBPTree<K, V, C> {
        /// Keys of every node, level by level from the root, left to right.
        pub(crate) fn shape(&self) -> Vec<Vec<Vec<K>>> {
            let mut levels = Vec::new();
            let mut level: Level = smallvec![self.root];
            while !level.is_empty() {
                let mut below = Level::new();
                let mut keys = Vec::new();
                for &handle in &level {
                    let node = self.nodes.get(handle);
                    keys.push(node.keys().to_vec());
                    if let Node::Internal(internal) = node {
                        below.extend_from_slice(internal.children());
                    }
                }
                levels.push(keys);
                level = below;
            }
            levels
        }

        /// Validates all B+Tree invariants. Panics with a descriptive message if any are violated.
        pub(crate) fn validate_invariants(&self) {
            let mut errors: Vec<String> = Vec::new();
            let mut levels: SmallVec<[Vec<Handle>; 16]> = SmallVec::new();

            let root = self.nodes.get(self.root);
            if *root.links() != Links::default() {
                errors.push(alloc::format!("root {:?} has links {:?}", self.root, root.links()));
            }
            if !root.is_leaf() && root.key_count() == 0 {
                errors.push("internal root without separators".into());
            }

            let count = self.validate_node(self.root, 0, &mut levels, &mut errors);
            if count != self.len {
                errors.push(alloc::format!("len mismatch: self.len={}, actual count={}", self.len, count));
            }

            // The arena must hold exactly the reachable nodes.
            let reachable: usize = levels.iter().map(Vec::len).sum();
            if reachable != self.nodes.len() {
                errors.push(alloc::format!("arena holds {} nodes, {} reachable", self.nodes.len(), reachable));
            }

            for (depth, level) in levels.iter().enumerate() {
                for (i, &handle) in level.iter().enumerate() {
                    let node = self.nodes.get(handle);
                    let expected_prev = i.checked_sub(1).map(|p| level[p]);
                    let expected_next = level.get(i + 1).copied();
                    if node.prev() != expected_prev || node.next() != expected_next {
                        errors.push(alloc::format!(
                            "sibling links of {:?} at depth {}: prev={:?} next={:?}, expected prev={:?} next={:?}",
                            handle,
                            depth,
                            node.prev(),
                            node.next(),
                            expected_prev,
                            expected_next
                        ));
                    }
                    if depth + 1 < levels.len() && node.is_leaf() {
                        errors.push(alloc::format!("leaf {handle:?} above the leaf level at depth {depth}"));
                    }
                }
            }

            assert!(errors.is_empty(), "Tree invariant violations:\n{}", errors.join("\n"));
        }

        /// Returns the number of entries in the subtree.
        fn validate_node(
            &self,
            handle: Handle,
            depth: usize,
            levels: &mut SmallVec<[Vec<Handle>; 16]>,
            errors: &mut Vec<String>,
        ) -> usize {
            if levels.len() == depth {
                levels.push(Vec::new());
            }
            levels[depth].push(handle);

            let node = self.nodes.get(handle);
            let keys = node.keys();
            let is_root = handle == self.root;

            for i in 1..keys.len() {
                if self.comparator.compare(&keys[i - 1], &keys[i]) != Ordering::Less {
                    errors.push(alloc::format!("keys not strictly increasing at {handle:?}: {keys:?}"));
                }
            }

            let (min, max) = match node {
                Node::Leaf(_) => (self.order.min_leaf_entries(), self.order.max_entries()),
                Node::Internal(_) => (self.order.min_internal_entries(), self.order.max_entries()),
            };
            if keys.len() > max || (!is_root && keys.len() < min) {
                errors.push(alloc::format!("fill of {handle:?} out of bounds: {} not in [{min}, {max}]", keys.len()));
            }

            match node {
                Node::Leaf(leaf) => leaf.key_count(),
                Node::Internal(internal) => {
                    let mut total = 0;
                    for (i, &child) in internal.children().iter().enumerate() {
                        if self.nodes.get(child).parent() != Some(handle) {
                            errors.push(alloc::format!(
                                "child {child:?} of {handle:?} has parent {:?}",
                                self.nodes.get(child).parent()
                            ));
                        }
                        if let Some((lo, hi)) = self.key_bounds(child) {
                            if i > 0 && self.comparator.compare(lo, internal.key(i - 1)) == Ordering::Less {
                                errors.push(alloc::format!(
                                    "child {i} of {handle:?} holds {lo:?} below separator {:?}",
                                    internal.key(i - 1)
                                ));
                            }
                            if i < internal.key_count() && self.comparator.compare(hi, internal.key(i)) != Ordering::Less
                            {
                                errors.push(alloc::format!(
                                    "child {i} of {handle:?} holds {hi:?} at or above separator {:?}",
                                    internal.key(i)
                                ));
                            }
                        }
                        total += self.validate_node(child, depth + 1, levels, errors);
                    }
                    total
                }
            }
        }

        /// Smallest and largest key stored under `handle`.
        fn key_bounds(&self, handle: Handle) -> Option<(&K, &K)> {
            let mut first = handle;
            while let Node::Internal(internal) = self.nodes.get(first) {
                first = internal.child(0);
            }
            let mut last = handle;
            while let Node::Internal(internal) = self.nodes.get(last) {
                last = internal.child(internal.child_count() - 1);
            }
            let lo = self.nodes.get(first).as_leaf().keys().first()?;
            let hi = self.nodes.get(last).as_leaf().keys().last()?;
            Some((lo, hi))
        }

        fn keys_in_order(&self) -> Vec<K> {
            let mut keys = Vec::new();
            let mut current = Some(self.first_leaf());
            while let Some(handle) = current {
                let leaf = self.nodes.get(handle).as_leaf();
                keys.extend_from_slice(leaf.keys());
                current = leaf.next();
            }
            keys
        }
    }

    #[test]
    fn empty_tree_is_a_single_empty_leaf() {
        let tree = tree(4);
        tree.validate_invariants();
        assert_eq!(tree.height(), 1);
        assert!(tree.is_empty());
        assert!(tree.first_key_value().is_none());
        assert!(tree.last_key_value().is_none());
        assert_eq!(tree.shape(), vec![vec![Vec::<i32>::new()]]);
    }

    #[test]
    fn order_two_sequential_inserts() {
        let tree = tree_with(2, 0..8);
        assert_eq!(
            tree.shape(),
            vec![
                vec![vec![2, 4]],
                vec![vec![1], vec![3], vec![5, 6]],
                vec![vec![0], vec![1], vec![2], vec![3], vec![4], vec![5], vec![6, 7]],
            ]
        );
    }

    #[test]
    fn order_two_remove_borrows_from_right_leaf() {
        let mut tree = tree_with(2, 0..8);

        assert_eq!(tree.remove(&5), Some(5));
        tree.validate_invariants();

        // The separator left of the drained leaf keeps the deleted key; only
        // the separator between the two redistributed leaves is rewritten.
        assert_eq!(
            tree.shape(),
            vec![
                vec![vec![2, 4]],
                vec![vec![1], vec![3], vec![5, 7]],
                vec![vec![0], vec![1], vec![2], vec![3], vec![4], vec![6], vec![7]],
            ]
        );
    }

    #[test]
    fn cousin_leaves_are_not_siblings() {
        let mut tree = tree_with(2, 0..8);

        // Leaf [2] is the first child of its parent: the leaf to its left
        // belongs to another parent, so it merges with [3] instead, and the
        // emptied parent borrows from its right sibling.
        assert_eq!(tree.remove(&2), Some(2));
        tree.validate_invariants();
        assert_eq!(
            tree.shape(),
            vec![
                vec![vec![2, 5]],
                vec![vec![1], vec![4], vec![6]],
                vec![vec![0], vec![1], vec![3], vec![4], vec![5], vec![6, 7]],
            ]
        );
    }

    #[test]
    fn borrow_from_left_leaf() {
        let mut tree = tree_with(3, [10, 20, 30, 40, 50, 60, 35]);
        assert_eq!(tree.shape()[1], vec![vec![10, 20], vec![30, 35, 40], vec![50, 60]]);

        tree.remove(&50);
        tree.validate_invariants();
        assert_eq!(tree.shape(), vec![vec![vec![30, 40]], vec![vec![10, 20], vec![30, 35], vec![40, 60]]]);
    }

    #[test]
    fn equally_full_siblings_prefer_the_left() {
        let mut tree = tree_with(3, [10, 20, 30, 40, 50, 60, 25, 55]);
        assert_eq!(tree.shape()[1], vec![vec![10, 20, 25], vec![30, 40], vec![50, 55, 60]]);

        tree.remove(&30);
        tree.validate_invariants();
        assert_eq!(tree.shape(), vec![vec![vec![25, 50]], vec![vec![10, 20], vec![25, 40], vec![50, 55, 60]]]);
    }

    #[test]
    fn merge_frees_the_absorbed_leaf() {
        let mut tree = tree_with(3, [10, 20, 30, 40, 50, 60]);
        assert_eq!(tree.nodes.len(), 4);

        tree.remove(&60);
        tree.validate_invariants();
        assert_eq!(tree.shape(), vec![vec![vec![30]], vec![vec![10, 20], vec![30, 40, 50]]]);
        assert_eq!(tree.nodes.len(), 3);
    }

    #[test]
    fn removing_everything_collapses_to_a_leaf_root() {
        let mut tree = tree_with(2, 0..64);
        assert!(tree.height() > 3);

        for key in 0..64 {
            assert_eq!(tree.remove(&key), Some(key));
            tree.validate_invariants();
        }
        assert_eq!(tree.height(), 1);
        assert_eq!(tree.nodes.len(), 1);
        assert!(tree.is_empty());
    }

    #[test]
    fn removing_in_reverse_collapses_to_a_leaf_root() {
        let mut tree = tree_with(3, 0..100);
        for key in (0..100).rev() {
            assert_eq!(tree.remove(&key), Some(key));
            tree.validate_invariants();
        }
        assert_eq!(tree.height(), 1);
        assert_eq!(tree.nodes.len(), 1);
    }

    #[test]
    fn remove_missing_key_is_a_no_op() {
        let mut tree = tree_with(4, (0..50).map(|k| k * 2));
        let before = tree.shape();
        assert_eq!(tree.remove(&7), None);
        assert_eq!(tree.remove(&1000), None);
        assert_eq!(tree.shape(), before);
        assert_eq!(tree.len(), 50);
    }

    #[test]
    fn overwrite_keeps_shape() {
        let mut tree = tree_with(3, 0..40);
        let before = tree.shape();

        assert_eq!(tree.insert(17, -17), Some(17));
        tree.validate_invariants();
        assert_eq!(tree.shape(), before);
        assert_eq!(tree.len(), 40);
        assert_eq!(tree.get(&17), Some(&-17));
    }

    #[test]
    fn order_five_multiples_of_seven() {
        let mut tree = tree_with(5, 1..=100);
        for key in (1..=100).filter(|k| k % 7 != 0) {
            tree.remove(&key);
            tree.validate_invariants();
        }
        assert_eq!(tree.keys_in_order(), (1..=14).map(|k| k * 7).collect::<Vec<_>>());
    }

    #[test]
    fn clear_installs_an_empty_root() {
        let mut tree = tree_with(4, 0..100);
        assert!(tree.nodes.capacity() >= 40);
        tree.clear();
        tree.validate_invariants();
        assert!(tree.is_empty());
        assert_eq!(tree.nodes.len(), 1);
        assert!(tree.nodes.capacity() < 8);

        tree.insert(1, 1);
        assert_eq!(tree.get(&1), Some(&1));
    }

    #[test]
    fn clone_relinks_a_compacted_copy() {
        let mut tree = tree_with(3, 0..200);
        for key in (0..200).step_by(3) {
            tree.remove(&key);
        }
        tree.validate_invariants();

        let mut copy = tree.clone();
        copy.validate_invariants();
        assert_eq!(copy.shape(), tree.shape());
        assert_eq!(copy.nodes.len(), tree.nodes.len());

        for key in 0..200 {
            copy.insert(key, -key);
        }
        copy.validate_invariants();
        assert_eq!(tree.get(&1), Some(&1));
        assert_eq!(tree.get(&3), None);
        assert_eq!(copy.get(&3), Some(&-3));
    }

    #[test]
    fn reverse_comparator_orders_leaves_descending() {
        let mut tree: Tree<ReverseOrder> = RawBPTree::new(Order::new(3).unwrap(), ReverseOrder);
        for key in 0..50 {
            tree.insert(key, key);
        }
        tree.validate_invariants();
        assert_eq!(tree.keys_in_order(), (0..50).rev().collect::<Vec<_>>());
        assert_eq!(tree.first_key_value(), Some((&49, &49)));
    }

    #[test]
    fn lower_bound_may_point_past_a_leaf() {
        let tree = tree_with(2, 0..8);
        let (leaf, idx) = tree.lower_bound(&5);
        assert_eq!(tree.nodes.get(leaf).as_leaf().key(idx), &5);

        let (leaf, idx) = tree.lower_bound(&100);
        assert_eq!(idx, tree.nodes.get(leaf).key_count());
        assert!(tree.nodes.get(leaf).next().is_none());
    }

    // Test operations enum for property testing
    #[derive(Clone, Debug)]
    enum Op {
        Insert(i32),
        Remove(i32),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => (0i32..1_000).prop_map(Op::Insert),
            2 => (0i32..1_000).prop_map(Op::Remove),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn tree_invariants_maintained_after_operations(
            order in prop_oneof![2usize..=7, Just(Order::DEFAULT.get()), 8usize..=40],
            ops in prop::collection::vec(op_strategy(), 0..1_200),
        ) {
            let mut tree = tree(order);
            let mut model: BTreeMap<i32, i32> = BTreeMap::new();

            for op in ops {
                match op {
                    Op::Insert(key) => {
                        prop_assert_eq!(tree.insert(key, key * 2), model.insert(key, key * 2));
                    }
                    Op::Remove(key) => {
                        prop_assert_eq!(tree.remove(&key), model.remove(&key));
                    }
                }
                tree.validate_invariants();
            }

            prop_assert_eq!(tree.keys_in_order(), model.keys().copied().collect::<Vec<_>>());
        }

        #[test]
        fn clone_is_independent(order in prop_oneof![2usize..=6, Just(Order::DEFAULT.get())], keys in prop::collection::vec(0i32..500, 0..200)) {
            let mut tree = tree(order);
            for &key in &keys {
                tree.insert(key, key);
            }
            let copy = tree.clone();
            copy.validate_invariants();

            for &key in &keys {
                tree.remove(&key);
            }
            tree.validate_invariants();
            prop_assert!(tree.is_empty());
            for &key in &keys {
                prop_assert_eq!(copy.get(&key), Some(&key));
            }
        }
    }
}
