use core::cmp::Ordering;
use core::fmt;
use core::iter::FusedIterator;
use core::ops::Index;

use crate::comparator::{Comparator, NaturalOrder};
use crate::error::Result;
use crate::order::Order;
use crate::raw::{Arena, Handle, Node, RawBPTree};

/// An ordered map based on a [B+Tree] whose nodes are linked to their
/// neighbours on every level.
///
/// Entries live only in the leaves; internal nodes hold separator keys that
/// route lookups. Every node knows its parent and its left and right
/// neighbour on the same level, so in-order traversal and range scans walk
/// the leaf chain without climbing back up the tree.
///
/// Keys are ordered by a [`Comparator`], which defaults to the keys' own
/// [`Ord`] ([`NaturalOrder`]). The maximum number of entries per node is the
/// tree's [`Order`]; non-root nodes stay at least half full.
///
/// It is a logic error for a key to be modified in such a way that its
/// ordering relative to any other key, as determined by the comparator,
/// changes while it is in the tree. The behavior resulting from such a logic
/// error is not specified, but will be encapsulated to the `BPTree` that
/// observed it and not result in undefined behavior.
///
/// # Examples
///
/// ```
/// use linked_bptree::BPTree;
///
/// let mut stock = BPTree::new();
///
/// stock.insert("apples", 3);
/// stock.insert("pears", 0);
/// stock.insert("figs", 12);
///
/// assert_eq!(stock.get(&"figs"), Some(&12));
/// assert!(!stock.contains(&"plums"));
///
/// // upsert
/// stock.insert("pears", 7);
/// assert_eq!(stock[&"pears"], 7);
///
/// stock.remove(&"apples");
///
/// for (fruit, count) in &stock {
///     println!("{fruit}: {count}");
/// }
/// ```
///
/// A custom order and comparator:
///
/// ```
/// use linked_bptree::{BPTree, ReverseOrder};
///
/// let mut tree = BPTree::with_order_and_comparator(4, ReverseOrder)?;
/// for i in 0..10 {
///     tree.insert(i, i * i);
/// }
/// let squares: Vec<_> = tree.range(&7, &3).copied().collect();
/// assert_eq!(squares, [49, 36, 25, 16, 9]);
/// # Ok::<(), linked_bptree::TreeError>(())
/// ```
///
/// [B+Tree]: https://en.wikipedia.org/wiki/B%2B_tree
pub struct BPTree<K, V, C = NaturalOrder> {
    raw: RawBPTree<K, V, C>,
}

/// An iterator over the entries of a `BPTree`.
///
/// This `struct` is created by the [`iter`] method on [`BPTree`]. See its
/// documentation for more.
///
/// # Examples
///
/// ```
/// use linked_bptree::BPTree;
///
/// let tree: BPTree<_, _> = [(1, "a"), (2, "b")].into_iter().collect();
/// let mut iter = tree.iter();
/// assert_eq!(iter.next(), Some((&1, &"a")));
/// assert_eq!(iter.next_back(), Some((&2, &"b")));
/// assert_eq!(iter.next(), None);
/// ```
///
/// [`iter`]: BPTree::iter
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Iter<'a, K, V> {
    nodes: &'a Arena<Node<K, V>>,
    front_leaf: Option<Handle>,
    front_index: usize,
    back_leaf: Option<Handle>,
    /// One past the next entry `next_back` yields.
    back_index: usize,
    remaining: usize,
}

/// An iterator over the keys of a `BPTree`.
///
/// This `struct` is created by the [`keys`] method on [`BPTree`].
///
/// [`keys`]: BPTree::keys
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

/// An iterator over the values of a `BPTree`.
///
/// This `struct` is created by the [`values`] method on [`BPTree`].
///
/// [`values`]: BPTree::values
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

/// An iterator over the values of an inclusive key range of a `BPTree`.
///
/// This `struct` is created by the [`range`] method on [`BPTree`]. It walks
/// the leaf chain from the lower bound and stops at the first key past the
/// upper bound.
///
/// [`range`]: BPTree::range
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Range<'a, K, V, C> {
    nodes: &'a Arena<Node<K, V>>,
    comparator: &'a C,
    leaf: Option<Handle>,
    index: usize,
    upper: K,
}

impl<K, V> BPTree<K, V> {
    /// Makes a new, empty `BPTree` ordered by the keys' [`Ord`], with
    /// [`Order::DEFAULT`].
    ///
    /// # Complexity
    ///
    /// O(1)
    ///
    /// # Examples
    ///
    /// ```
    /// use linked_bptree::BPTree;
    ///
    /// let mut tree = BPTree::new();
    ///
    /// // entries can now be inserted into the empty tree
    /// tree.insert(1, "a");
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::with_comparator(NaturalOrder)
    }

    /// Makes a new, empty `BPTree` holding at most `order` entries per node.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidOrder`](crate::TreeError::InvalidOrder) if
    /// `order` is below [`Order::MIN`] or above [`Order::MAX`].
    ///
    /// # Examples
    ///
    /// ```
    /// use linked_bptree::{BPTree, TreeError};
    ///
    /// let tree = BPTree::<u32, u32>::with_order(8)?;
    /// assert_eq!(tree.order().get(), 8);
    ///
    /// assert_eq!(BPTree::<u32, u32>::with_order(1).err(), Some(TreeError::InvalidOrder { order: 1 }));
    /// # Ok::<(), TreeError>(())
    /// ```
    pub fn with_order(order: usize) -> Result<Self> {
        Self::with_order_and_comparator(order, NaturalOrder)
    }
}

impl<K, V, C> BPTree<K, V, C> {
    /// Makes a new, empty `BPTree` ordered by `comparator`, with
    /// [`Order::DEFAULT`].
    ///
    /// # Examples
    ///
    /// ```
    /// use linked_bptree::BPTree;
    ///
    /// let mut tree = BPTree::with_comparator(|a: &i32, b: &i32| a.abs().cmp(&b.abs()));
    /// tree.insert(-3, "minus three");
    /// tree.insert(2, "two");
    /// // equal under the comparator, so this overwrites
    /// tree.insert(3, "three");
    ///
    /// assert_eq!(tree.len(), 2);
    /// assert_eq!(tree.get(&-3), Some(&"three"));
    /// ```
    #[must_use]
    pub fn with_comparator(comparator: C) -> Self {
        BPTree {
            raw: RawBPTree::new(Order::DEFAULT, comparator),
        }
    }

    /// Makes a new, empty `BPTree` ordered by `comparator`, holding at most
    /// `order` entries per node.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidOrder`](crate::TreeError::InvalidOrder) if
    /// `order` is below [`Order::MIN`] or above [`Order::MAX`].
    pub fn with_order_and_comparator(order: usize, comparator: C) -> Result<Self> {
        let order = Order::new(order)?;
        Ok(BPTree {
            raw: RawBPTree::new(order, comparator),
        })
    }

    /// Returns the number of elements in the tree.
    ///
    /// # Complexity
    ///
    /// O(1)
    ///
    /// # Examples
    ///
    /// ```
    /// use linked_bptree::BPTree;
    ///
    /// let mut a = BPTree::new();
    /// assert_eq!(a.len(), 0);
    /// a.insert(1, "a");
    /// assert_eq!(a.len(), 1);
    /// ```
    #[must_use]
    pub const fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if the tree contains no elements.
    ///
    /// # Complexity
    ///
    /// O(1)
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// The maximum number of entries per node.
    #[must_use]
    pub const fn order(&self) -> Order {
        self.raw.order()
    }

    /// The comparator ordering the keys.
    #[must_use]
    pub const fn comparator(&self) -> &C {
        self.raw.comparator()
    }

    /// Number of levels in the tree. An empty tree, or one whose entries all
    /// fit in a single leaf, has height 1.
    ///
    /// # Complexity
    ///
    /// O(log n)
    ///
    /// # Examples
    ///
    /// ```
    /// use linked_bptree::BPTree;
    ///
    /// let mut tree = BPTree::with_order(2)?;
    /// assert_eq!(tree.height(), 1);
    /// for i in 0..3 {
    ///     tree.insert(i, ());
    /// }
    /// assert_eq!(tree.height(), 2);
    /// # Ok::<(), linked_bptree::TreeError>(())
    /// ```
    #[must_use]
    pub fn height(&self) -> usize {
        self.raw.height()
    }

    /// Clears the tree, removing all elements.
    ///
    /// # Complexity
    ///
    /// O(n)
    ///
    /// # Examples
    ///
    /// ```
    /// use linked_bptree::BPTree;
    ///
    /// let mut a = BPTree::new();
    /// a.insert(1, "a");
    /// a.clear();
    /// assert!(a.is_empty());
    /// ```
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Returns the first key-value pair in the tree, the minimum under the
    /// comparator.
    ///
    /// # Complexity
    ///
    /// O(log n)
    ///
    /// # Examples
    ///
    /// ```
    /// use linked_bptree::BPTree;
    ///
    /// let mut tree = BPTree::new();
    /// assert_eq!(tree.first_key_value(), None);
    /// tree.insert(1, "b");
    /// tree.insert(2, "a");
    /// assert_eq!(tree.first_key_value(), Some((&1, &"b")));
    /// ```
    #[must_use]
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.raw.first_key_value()
    }

    /// Returns the last key-value pair in the tree, the maximum under the
    /// comparator.
    ///
    /// # Complexity
    ///
    /// O(log n)
    ///
    /// # Examples
    ///
    /// ```
    /// use linked_bptree::BPTree;
    ///
    /// let mut tree = BPTree::new();
    /// tree.insert(1, "b");
    /// tree.insert(2, "a");
    /// assert_eq!(tree.last_key_value(), Some((&2, &"a")));
    /// ```
    #[must_use]
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.raw.last_key_value()
    }

    /// Gets an iterator over the entries of the tree, in comparator order.
    ///
    /// # Examples
    ///
    /// ```
    /// use linked_bptree::BPTree;
    ///
    /// let mut tree = BPTree::new();
    /// tree.insert(3, "c");
    /// tree.insert(2, "b");
    /// tree.insert(1, "a");
    ///
    /// for (key, value) in tree.iter() {
    ///     println!("{key}: {value}");
    /// }
    ///
    /// let (first_key, first_value) = tree.iter().next().unwrap();
    /// assert_eq!((*first_key, *first_value), (1, "a"));
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V> {
        let nodes = self.raw.nodes();
        let back_leaf = self.raw.last_leaf();
        Iter {
            nodes,
            front_leaf: Some(self.raw.first_leaf()),
            front_index: 0,
            back_leaf: Some(back_leaf),
            back_index: nodes.get(back_leaf).key_count(),
            remaining: self.raw.len(),
        }
    }

    /// Gets an iterator over the keys of the tree, in comparator order.
    ///
    /// # Examples
    ///
    /// ```
    /// use linked_bptree::BPTree;
    ///
    /// let mut a = BPTree::new();
    /// a.insert(2, "b");
    /// a.insert(1, "a");
    ///
    /// let keys: Vec<_> = a.keys().cloned().collect();
    /// assert_eq!(keys, [1, 2]);
    /// ```
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// Gets an iterator over the values of the tree, in order by key.
    ///
    /// # Examples
    ///
    /// ```
    /// use linked_bptree::BPTree;
    ///
    /// let mut a = BPTree::new();
    /// a.insert(1, "hello");
    /// a.insert(2, "goodbye");
    ///
    /// let values: Vec<&str> = a.values().cloned().collect();
    /// assert_eq!(values, ["hello", "goodbye"]);
    /// ```
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }
}

impl<K, V, C: Comparator<K>> BPTree<K, V, C> {
    /// Returns a reference to the value corresponding to the key.
    ///
    /// # Complexity
    ///
    /// O(log n)
    ///
    /// # Examples
    ///
    /// ```
    /// use linked_bptree::BPTree;
    ///
    /// let mut tree = BPTree::new();
    /// tree.insert(1, "a");
    /// assert_eq!(tree.get(&1), Some(&"a"));
    /// assert_eq!(tree.get(&2), None);
    /// ```
    pub fn get(&self, key: &K) -> Option<&V> {
        self.raw.get(key)
    }

    /// Returns the stored key and its value. Useful when keys that compare
    /// equal are not identical.
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        self.raw.get_key_value(key)
    }

    /// Returns a mutable reference to the value corresponding to the key.
    ///
    /// # Complexity
    ///
    /// O(log n)
    ///
    /// # Examples
    ///
    /// ```
    /// use linked_bptree::BPTree;
    ///
    /// let mut tree = BPTree::new();
    /// tree.insert(1, "a");
    /// if let Some(x) = tree.get_mut(&1) {
    ///     *x = "b";
    /// }
    /// assert_eq!(tree[&1], "b");
    /// ```
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.raw.get_mut(key)
    }

    /// Returns a copy of the value for `key`, or `V::default()` when the key
    /// is absent. Use [`contains`](Self::contains) to tell a stored default
    /// apart from a missing key.
    ///
    /// # Complexity
    ///
    /// O(log n)
    ///
    /// # Examples
    ///
    /// ```
    /// use linked_bptree::BPTree;
    ///
    /// let mut tree = BPTree::new();
    /// tree.insert("hits", 3);
    /// assert_eq!(tree.find(&"hits"), 3);
    /// assert_eq!(tree.find(&"misses"), 0);
    /// ```
    pub fn find(&self, key: &K) -> V
    where
        V: Default + Clone,
    {
        self.get(key).cloned().unwrap_or_default()
    }

    /// Returns `true` if the tree contains a value for the specified key.
    ///
    /// # Complexity
    ///
    /// O(log n)
    ///
    /// # Examples
    ///
    /// ```
    /// use linked_bptree::BPTree;
    ///
    /// let mut tree = BPTree::new();
    /// tree.insert(1, "a");
    /// assert!(tree.contains(&1));
    /// assert!(!tree.contains(&2));
    /// ```
    pub fn contains(&self, key: &K) -> bool {
        self.raw.contains_key(key)
    }

    /// Gets a lazy iterator over the values whose keys lie in the inclusive
    /// range `lower..=upper`, in comparator order.
    ///
    /// The scan descends once to the lower bound, then follows the leaf chain.
    /// If `lower` sorts after `upper` the iterator is empty.
    ///
    /// # Complexity
    ///
    /// O(log n) to position, then O(1) amortized per value.
    ///
    /// # Examples
    ///
    /// ```
    /// use linked_bptree::BPTree;
    ///
    /// let tree: BPTree<_, _> = (0..100).map(|k| (k, k * 10)).collect();
    ///
    /// let values: Vec<_> = tree.range(&4, &8).copied().collect();
    /// assert_eq!(values, [40, 50, 60, 70, 80]);
    ///
    /// assert_eq!(tree.range(&8, &4).next(), None);
    /// ```
    pub fn range(&self, lower: &K, upper: &K) -> Range<'_, K, V, C>
    where
        K: Clone,
    {
        let (leaf, index) = self.raw.lower_bound(lower);
        Range {
            nodes: self.raw.nodes(),
            comparator: self.raw.comparator(),
            leaf: Some(leaf),
            index,
            upper: upper.clone(),
        }
    }
}

impl<K: Clone, V, C: Comparator<K>> BPTree<K, V, C> {
    /// Inserts a key-value pair into the tree.
    ///
    /// If the tree did not have this key present, `None` is returned.
    ///
    /// If the tree did have this key present, the value is updated, and the old
    /// value is returned. The key is not updated and the shape of the tree
    /// does not change.
    ///
    /// # Complexity
    ///
    /// O(log n)
    ///
    /// # Examples
    ///
    /// ```
    /// use linked_bptree::BPTree;
    ///
    /// let mut tree = BPTree::new();
    /// assert_eq!(tree.insert(37, "a"), None);
    /// assert_eq!(tree.is_empty(), false);
    ///
    /// tree.insert(37, "b");
    /// assert_eq!(tree.insert(37, "c"), Some("b"));
    /// assert_eq!(tree[&37], "c");
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.raw.insert(key, value)
    }

    /// Removes a key from the tree, returning the value at the key if the key
    /// was previously in the tree.
    ///
    /// Removing a missing key leaves the tree untouched.
    ///
    /// # Complexity
    ///
    /// O(log n)
    ///
    /// # Examples
    ///
    /// ```
    /// use linked_bptree::BPTree;
    ///
    /// let mut tree = BPTree::new();
    /// tree.insert(1, "a");
    /// assert_eq!(tree.remove(&1), Some("a"));
    /// assert_eq!(tree.remove(&1), None);
    /// ```
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.raw.remove(key)
    }

    /// Removes a key from the tree, returning the stored key and value if the
    /// key was previously in the tree.
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        self.raw.remove_entry(key)
    }
}

impl<K: Clone, V: Clone, C: Clone> Clone for BPTree<K, V, C> {
    fn clone(&self) -> Self {
        BPTree { raw: self.raw.clone() }
    }
}

impl<K: PartialEq, V: PartialEq, C> PartialEq for BPTree<K, V, C> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl<K: Eq, V: Eq, C> Eq for BPTree<K, V, C> {}

impl<K: fmt::Debug, V: fmt::Debug, C> fmt::Debug for BPTree<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, C: Default> Default for BPTree<K, V, C> {
    fn default() -> Self {
        BPTree::with_comparator(C::default())
    }
}

impl<K: Clone, V, C: Comparator<K> + Default> FromIterator<(K, V)> for BPTree<K, V, C> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut tree = Self::default();
        tree.extend(iter);
        tree
    }
}

impl<K: Clone, V, C: Comparator<K>> Extend<(K, V)> for BPTree<K, V, C> {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<'a, K, V, C> IntoIterator for &'a BPTree<K, V, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<K, V, C: Comparator<K>> Index<&K> for BPTree<K, V, C> {
    type Output = V;

    /// Returns a reference to the value corresponding to the supplied key.
    ///
    /// # Panics
    ///
    /// Panics if the key is not present in the `BPTree`.
    fn index(&self, key: &K) -> &V {
        self.get(key).expect("no entry found for key")
    }
}

impl<'a, K: 'a, V: 'a> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let nodes = self.nodes;
        loop {
            let leaf = nodes.get(self.front_leaf?).as_leaf();
            if self.front_index < leaf.key_count() {
                let index = self.front_index;
                self.front_index += 1;
                self.remaining -= 1;
                return Some((leaf.key(index), leaf.value(index)));
            }
            // Move to next leaf
            self.front_leaf = leaf.next();
            self.front_index = 0;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, K: 'a, V: 'a> DoubleEndedIterator for Iter<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let nodes = self.nodes;
        loop {
            let leaf = nodes.get(self.back_leaf?).as_leaf();
            if self.back_index > 0 {
                self.back_index -= 1;
                self.remaining -= 1;
                return Some((leaf.key(self.back_index), leaf.value(self.back_index)));
            }
            // Move to previous leaf
            self.back_leaf = leaf.prev();
            self.back_index = self.back_leaf.map_or(0, |prev| nodes.get(prev).key_count());
        }
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Iter {
            nodes: self.nodes,
            front_leaf: self.front_leaf,
            front_index: self.front_index,
            back_leaf: self.back_leaf,
            back_index: self.back_index,
            remaining: self.remaining,
        }
    }
}

impl<K, V> fmt::Debug for Iter<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter").field("remaining", &self.remaining).finish()
    }
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Keys<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, _)| k)
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for Keys<'_, K, V> {}

impl<K, V> Clone for Keys<'_, K, V> {
    fn clone(&self) -> Self {
        Keys {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V> fmt::Debug for Keys<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keys").field("remaining", &self.inner.remaining).finish()
    }
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Values<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, v)| v)
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for Values<'_, K, V> {}

impl<K, V> Clone for Values<'_, K, V> {
    fn clone(&self) -> Self {
        Values {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V> fmt::Debug for Values<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Values").field("remaining", &self.inner.remaining).finish()
    }
}

impl<'a, K, V, C: Comparator<K>> Iterator for Range<'a, K, V, C> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        let nodes = self.nodes;
        loop {
            let leaf = nodes.get(self.leaf?).as_leaf();
            if self.index < leaf.key_count() {
                if self.comparator.compare(leaf.key(self.index), &self.upper) == Ordering::Greater {
                    self.leaf = None;
                    return None;
                }
                let value = leaf.value(self.index);
                self.index += 1;
                return Some(value);
            }
            self.leaf = leaf.next();
            self.index = 0;
        }
    }
}

impl<K, V, C: Comparator<K>> FusedIterator for Range<'_, K, V, C> {}

impl<K: fmt::Debug, V, C> fmt::Debug for Range<'_, K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Range").field("upper", &self.upper).field("exhausted", &self.leaf.is_none()).finish()
    }
}
