//! Copy-on-write engine.
//!
//! `rc == 0` means "no additional owners beyond the edge that already
//! holds this pointer" — exclusively owned, hence mutable in place.
//! Cloning a tree bumps the *root's* `rc`; `cow_ensure` is the single
//! place that notices a shared node on a path about to be written and
//! swaps in a private deep copy before the write happens.

use core::ptr;
use core::sync::atomic::Ordering;

use crate::allocator::RawAllocator;
use crate::layout::NodeLayout;
use crate::node::{self, NodeRef};
use crate::tree::BTree;
use crate::cmp::Comparator;

impl<T: Clone, C: Comparator<T>, A: RawAllocator> BTree<T, C, A> {
    /// Ensure `*node` is exclusively owned, replacing it with a fresh
    /// deep copy first if another owner is sharing it. No-op (and no
    /// allocation) when the node is already unshared.
    pub(crate) fn cow_ensure(&self, node: &mut NodeRef<T>) -> Result<(), ()> {
        unsafe {
            if node.rc_load(Ordering::Acquire) == 0 {
                return Ok(());
            }
            let original = *node;
            match self.deep_copy(original) {
                Some(copy) => {
                    // Give up this edge's claim on the shared original.
                    // `release` only frees when the *prior* rc was 0,
                    // which cannot happen here since we just observed
                    // rc > 0 — this call is a pure decrement.
                    release(original, &self.layout, &self.alloc);
                    *node = copy;
                    Ok(())
                }
                None => Err(()),
            }
        }
    }

    /// Allocate a fresh node with the same shape as `node`, cloning
    /// every item and, for a branch, bumping the `rc` of every child
    /// (the copy and the original now both reference them).
    unsafe fn deep_copy(&self, node: NodeRef<T>) -> Option<NodeRef<T>> {
        let is_leaf = node.is_leaf();
        let copy = node::new_node::<T, A>(&self.alloc, &self.layout, is_leaf)?;
        let n = node.nitems();
        let src_items = node::items_ptr(node, &self.layout);
        let dst_items = node::items_ptr(copy, &self.layout);
        for i in 0..n {
            ptr::write(dst_items.add(i), (*src_items.add(i)).clone());
        }
        if !is_leaf {
            let src_children = node::children_ptr(node, &self.layout);
            let dst_children = node::children_ptr(copy, &self.layout);
            for i in 0..=n {
                let c = ptr::read(src_children.add(i));
                c.rc_fetch_add(1, Ordering::Release);
                ptr::write(dst_children.add(i), c);
            }
        }
        node::set_nitems(copy, n);
        Some(copy)
    }
}

/// Give up one reference to `node`. If this was the last one (the
/// *prior* raw `rc` was `0`, meaning the actual reference count was
/// `1`), recursively release every child and drop every item in
/// place, then free the node's own allocation.
///
/// This is the one function used both to shrink a shared subtree's
/// reference count (prior `rc > 0`, never frees) and to tear down a
/// subtree that has become unreachable (prior `rc == 0`, always
/// frees) — `BTree::clear`/`Drop` and `cow_ensure` share it.
pub(crate) unsafe fn release<T, A: RawAllocator>(node: NodeRef<T>, layout: &NodeLayout, alloc: &A) {
    let prior = node.rc_fetch_sub(1, Ordering::Release);
    if prior != 0 {
        return;
    }
    core::sync::atomic::fence(Ordering::Acquire);

    if !node.is_leaf() {
        let n = node.nitems();
        for i in 0..=n {
            let c = node::child(node, layout, i);
            release(c, layout, alloc);
        }
    }
    let n = node.nitems();
    let items = node::items_ptr(node, layout);
    for i in 0..n {
        ptr::drop_in_place(items.add(i));
    }
    node::dealloc_node(node, layout, alloc);
}
