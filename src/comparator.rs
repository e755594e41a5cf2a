use core::cmp::Ordering;

/// A three-way ordering over keys, injected into a [`BPTree`](crate::BPTree).
///
/// The tree never calls `Ord` on its keys directly; every comparison goes
/// through the configured comparator. The comparator must be a total order
/// and must not change while keys are stored, otherwise lookups may miss.
///
/// Any `Fn(&K, &K) -> Ordering` is a comparator:
///
/// ```
/// use linked_bptree::BPTree;
///
/// let mut tree = BPTree::with_comparator(|a: &&str, b: &&str| a.len().cmp(&b.len()));
/// tree.insert("ccc", 3);
/// tree.insert("a", 1);
/// tree.insert("bb", 2);
///
/// let values: Vec<_> = tree.values().copied().collect();
/// assert_eq!(values, [1, 2, 3]);
/// ```
pub trait Comparator<K: ?Sized> {
    /// Compares `a` with `b`.
    fn compare(&self, a: &K, b: &K) -> Ordering;
}

/// The keys' own [`Ord`] implementation. Used when no comparator is given.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct NaturalOrder;

impl<K: Ord + ?Sized> Comparator<K> for NaturalOrder {
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }
}

/// The reverse of the keys' [`Ord`] implementation.
///
/// ```
/// use linked_bptree::{BPTree, ReverseOrder};
///
/// let tree: BPTree<i32, (), ReverseOrder> = (0..5).map(|k| (k, ())).collect();
/// let keys: Vec<_> = tree.keys().copied().collect();
/// assert_eq!(keys, [4, 3, 2, 1, 0]);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct ReverseOrder;

impl<K: Ord + ?Sized> Comparator<K> for ReverseOrder {
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        b.cmp(a)
    }
}

impl<K: ?Sized, F> Comparator<K> for F
where
    F: Fn(&K, &K) -> Ordering,
{
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        self(a, b)
    }
}
