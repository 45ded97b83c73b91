//! `ordbtree`: an in-memory, copy-on-write ordered B-tree.
//!
//! Items are opaque, fixed-size values of a caller-chosen type `T`,
//! kept in ascending order by a caller-supplied [`Comparator`]. The
//! tree supports point lookup, insert-with-replace, delete, min/max,
//! ordered traversal from an arbitrary pivot, a stateful positional
//! [`Iter`]ator, bulk append optimized for already-sorted input
//! (`load`), and O(1) snapshot [`Clone`] with copy-on-write sharing of
//! internal nodes.
//!
//! The engine never touches the global allocator directly: every node
//! goes through a [`RawAllocator`], so an out-of-memory condition on
//! any mutating path is reported through the sticky [`BTree::oom`]
//! flag instead of aborting the process.
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod allocator;
mod cmp;
mod cow;
mod error;
mod iter;
mod layout;
mod mutate;
mod node;
mod search;
mod traverse;
mod tree;

pub use allocator::RawAllocator;
#[cfg(feature = "std")]
pub use allocator::SystemAllocator;
pub use cmp::{Comparator, FnComparator};
pub use error::BTreeError;
pub use iter::Iter;
pub use layout::{DEFAULT_MAX_ITEMS, MAX_MAX_ITEMS, MIN_MAX_ITEMS};
pub use search::Hint;
pub use traverse::Action;
pub use tree::{BTree, Range};
