//! An in-memory B+Tree whose nodes are linked to their neighbours on every level.
//!
//! [`BPTree`] is an ordered map: entries live only in the leaves, internal
//! nodes hold separator keys, and every node carries a parent link plus
//! `prev`/`next` links to the adjacent nodes on its level. Ordered traversal
//! and inclusive range scans follow the leaf chain instead of re-descending.
//!
//! # Example
//!
//! ```
//! use linked_bptree::BPTree;
//!
//! let mut tree = BPTree::with_order(5)?;
//! for key in 1..=100 {
//!     tree.insert(key, key * 2);
//! }
//! for key in (1..=100).filter(|k| k % 7 != 0) {
//!     tree.remove(&key);
//! }
//!
//! let values: Vec<_> = tree.range(&0, &100).copied().collect();
//! assert_eq!(values.len(), 14);
//! assert_eq!(values[0], 14);
//! # Ok::<(), linked_bptree::TreeError>(())
//! ```
//!
//! # Features
//!
//! - **`no_std` compatible** - Only requires `alloc`, no standard library dependency
//! - **Pluggable ordering** - Any [`Comparator`], including plain closures
//! - **Configurable fan-out** - A validated [`Order`] bounds every node
//!
//! # Implementation
//!
//! Nodes live in a slot arena and refer to each other by index, so parent and
//! sibling links never own anything. Structural changes (splits, borrowing
//! from a sibling, merges, root growth and collapse) are reported as
//! `tracing` events at `TRACE` level.

#![no_std]
// These forbid rules and lint groups are meant to be very restrictive.
#![forbid(unsafe_code)]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

mod raw;

pub mod bptree;
pub mod comparator;
pub mod error;
pub mod order;

pub use bptree::{BPTree, Iter, Keys, Range, Values};
pub use comparator::{Comparator, NaturalOrder, ReverseOrder};
pub use error::{Result, TreeError};
pub use order::Order;
