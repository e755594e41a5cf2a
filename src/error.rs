//! Error types for tree construction.

use thiserror::Error;

use crate::order::Order;

/// Result type alias using [`TreeError`].
pub type Result<T> = core::result::Result<T, TreeError>;

/// Errors reported by `linked_bptree`.
///
/// Lookups and removals of missing keys are not errors; they report absence
/// through `Option` and `bool` results instead.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
#[non_exhaustive]
pub enum TreeError {
    /// The requested node capacity is outside `Order::MIN..=Order::MAX`.
    #[error("invalid tree order {order}: must be between {min} and {max}", min = Order::MIN, max = Order::MAX)]
    InvalidOrder {
        /// The rejected order.
        order: usize,
    },
}
