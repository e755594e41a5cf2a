use crate::error::{Result, TreeError};

/// Maximum number of entries a node may hold before it splits.
///
/// An `Order` is validated once, when it is built, so a tree never exists in
/// an unusable configuration. The fill bounds used by rebalancing derive from
/// it:
///
/// - a full node of `order + 1` entries splits at [`split_index`](Self::split_index);
/// - a non-root leaf keeps at least [`min_leaf_entries`](Self::min_leaf_entries);
/// - a non-root internal node keeps at least
///   [`min_internal_entries`](Self::min_internal_entries) separators, one fewer
///   than a leaf for odd orders because an internal split promotes its median.
///
/// # Examples
///
/// ```
/// use linked_bptree::{Order, TreeError};
///
/// let order = Order::new(5)?;
/// assert_eq!(order.get(), 5);
/// assert_eq!(order.min_leaf_entries(), 3);
/// assert_eq!(order.min_internal_entries(), 2);
///
/// assert_eq!(Order::new(1), Err(TreeError::InvalidOrder { order: 1 }));
/// assert!(Order::new(Order::MAX + 1).is_err());
/// # Ok::<(), TreeError>(())
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Order(usize);

impl Order {
    /// Smallest order that can still split a node into two non-empty halves.
    pub const MIN: usize = 2;

    /// Largest accepted order.
    pub const MAX: usize = 1 << 16;

    /// Order used by [`BPTree::new`](crate::BPTree::new).
    pub const DEFAULT: Order = Order(32);

    /// Validates `order`.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidOrder`] if `order` is outside
    /// `Order::MIN..=Order::MAX`.
    pub const fn new(order: usize) -> Result<Self> {
        if order < Self::MIN || order > Self::MAX {
            return Err(TreeError::InvalidOrder { order });
        }
        Ok(Self(order))
    }

    /// Returns the order as a plain integer.
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }

    /// Maximum entries per node; one more forces a split.
    #[must_use]
    pub const fn max_entries(self) -> usize {
        self.0
    }

    /// Number of entries the left half keeps when `order + 1` entries split.
    #[must_use]
    pub const fn split_index(self) -> usize {
        self.0.div_ceil(2)
    }

    /// Minimum fill of a non-root leaf.
    #[must_use]
    pub const fn min_leaf_entries(self) -> usize {
        self.0.div_ceil(2)
    }

    /// Minimum number of separators in a non-root internal node.
    #[must_use]
    pub const fn min_internal_entries(self) -> usize {
        self.0 / 2
    }
}

impl Default for Order {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<usize> for Order {
    type Error = TreeError;

    fn try_from(order: usize) -> Result<Self> {
        Self::new(order)
    }
}

impl From<Order> for usize {
    fn from(order: Order) -> Self {
        order.get()
    }
}
