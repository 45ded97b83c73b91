//! Node memory layout.
//!
//! A node is a single allocation: header, then an inline items region
//! at an aligned offset, then — for branches only — an inline children
//! region right after it. Offsets are derived once per tree from
//! `size_of`/`align_of::<T>()`, the same alignment-driven approach a
//! `LeafLayout`/`BranchLayout::compute` split would use for `K`/`V`.

use core::mem::{align_of, size_of};

use crate::node::NodeHeader;

/// Smallest permitted `max_items`; values are clamped to `[3, 2045]`.
pub const MIN_MAX_ITEMS: usize = 3;
/// Largest permitted `max_items`.
pub const MAX_MAX_ITEMS: usize = 2045;
/// Default `max_items` when a tree is built without an explicit fan-out.
pub const DEFAULT_MAX_ITEMS: usize = 255;

#[inline]
pub(crate) const fn align_up(x: usize, a: usize) -> usize {
    debug_assert!(a.is_power_of_two());
    (x + (a - 1)) & !(a - 1)
}

#[inline]
pub(crate) fn clamp_max_items(max_items: usize) -> usize {
    max_items.clamp(MIN_MAX_ITEMS, MAX_MAX_ITEMS)
}

/// Derived node sizing shared by every node of one tree.
#[derive(Clone, Copy, Debug)]
pub(crate) struct NodeLayout {
    pub max_items: usize,
    pub min_items: usize,
    /// Offset of the items array from the node base (same for leaves
    /// and branches: the header shape does not depend on `leaf`).
    pub items_off: usize,
    pub leaf_bytes: usize,
    pub leaf_align: usize,
    /// Offset of the children array (branches only).
    pub children_off: usize,
    pub branch_bytes: usize,
    pub branch_align: usize,
}

impl NodeLayout {
    pub fn compute<T>(max_items: usize) -> Self {
        let max_items = clamp_max_items(max_items);

        let item_align = align_of::<T>();
        let item_size = size_of::<T>();
        // NodeRef<T> is a single non-null pointer under the hood.
        let child_align = align_of::<usize>();
        let child_size = size_of::<usize>();
        let hdr_align = align_of::<NodeHeader>();

        let max_align = hdr_align.max(item_align).max(child_align);
        let items_off = align_up(size_of::<NodeHeader>(), item_align.max(hdr_align));
        let items_end = items_off + max_items * item_size;

        let leaf_bytes = align_up(items_end.max(items_off), max_align);

        let children_off = align_up(items_end, child_align);
        let children_end = children_off + (max_items + 1) * child_size;
        let branch_bytes = align_up(children_end, max_align);

        NodeLayout {
            max_items,
            // Splitting a full node (`max_items` items) promotes one
            // item and divides the remaining `max_items - 1` between
            // the two siblings; for both halves to land at or above
            // `min_items` the budget requires `2 * min_items <=
            // max_items - 1`, i.e. `min_items <= (max_items - 1) / 2`.
            // `max_items / 2` only satisfies that for odd `max_items`
            // (for even `max_items` it is one too many and a lean
            // split leaves one sibling below the floor); `(max_items -
            // 1) / 2` holds for both parities and agrees with
            // `max_items / 2` whenever `max_items` is odd.
            min_items: (max_items - 1) / 2,
            items_off,
            leaf_bytes,
            leaf_align: max_align,
            children_off,
            branch_bytes,
            branch_align: max_align,
        }
    }
}
