//! Mutation core: recursive set/delete, split and rebalance. No
//! policy lives in `node.rs` — it all lives here.

use core::cmp::Ordering;

use crate::allocator::RawAllocator;
use crate::cmp::Comparator;
use crate::node::{self, NodeRef};
use crate::search::{search_hinted, search_unhinted, Hint};
use crate::tree::BTree;

pub(crate) enum SetOutcome<T> {
    NoMemory,
    Inserted,
    Replaced(T),
    /// The node searched is full; the item is handed back so the
    /// caller (who holds the parent's slot for this node) can split
    /// it and retry the same set at this level.
    MustSplit(T),
}

pub(crate) enum DeleteOutcome<T> {
    NoChange,
    Deleted(T),
    NoMemory,
}

/// What a single delete call is looking for.
#[derive(Clone, Copy)]
pub(crate) enum DeleteAction<'a, T> {
    DeleteKey(&'a T),
    PopFront,
    PopBack,
    PopMax,
}

impl<T: Clone, C: Comparator<T>, A: RawAllocator> BTree<T, C, A> {
    /// Recursively insert or replace `item` under `*node_ref`, which
    /// must already be exclusively owned. Splits full nodes on the
    /// way down and retries at the same level.
    pub(crate) unsafe fn node_set(
        &self,
        node_ref: &mut NodeRef<T>,
        item: T,
        mut hint: Option<&mut Hint>,
        depth: usize,
    ) -> SetOutcome<T> {
        let mut item = item;
        loop {
            let node = *node_ref;
            let (found, i) = {
                let h = hint.as_mut().map(|h| &mut **h);
                match h {
                    Some(h) => search_hinted(node, &self.layout, &self.cmp, &item, h, depth),
                    None => search_unhinted(node, &self.layout, &self.cmp, &item),
                }
            };

            if found {
                let old = node::swap(node, &self.layout, i, item);
                return SetOutcome::Replaced(old);
            }

            if node.is_leaf() {
                if node.nitems() >= self.layout.max_items {
                    return SetOutcome::MustSplit(item);
                }
                node::shift_right(node, &self.layout, i);
                node::set(node, &self.layout, i, item);
                return SetOutcome::Inserted;
            }

            let mut child = node::child(node, &self.layout, i);
            if self.cow_ensure(&mut child).is_err() {
                return SetOutcome::NoMemory;
            }
            node::set_child(node, &self.layout, i, child);

            let h2 = hint.as_mut().map(|h| &mut **h);
            match self.node_set(&mut child, item, h2, depth + 1) {
                SetOutcome::NoMemory => return SetOutcome::NoMemory,
                SetOutcome::Inserted => return SetOutcome::Inserted,
                SetOutcome::Replaced(old) => return SetOutcome::Replaced(old),
                SetOutcome::MustSplit(returned) => {
                    if node.nitems() >= self.layout.max_items {
                        return SetOutcome::MustSplit(returned);
                    }
                    let (sep, right) = match self.split_balanced(&mut child) {
                        Some(v) => v,
                        None => return SetOutcome::NoMemory,
                    };
                    node::set_child(node, &self.layout, i, child);
                    node::shift_right(node, &self.layout, i);
                    node::set(node, &self.layout, i, sep);
                    node::set_child(node, &self.layout, i + 1, right);
                    item = returned;
                    // retry the set at this level
                }
            }
        }
    }

    /// Split a full node at `pivot`, promoting the item there and
    /// moving everything after it into a fresh right sibling. Fails
    /// (leaving `*node` untouched) only if allocating the right
    /// sibling fails.
    unsafe fn split_at(&self, node: &mut NodeRef<T>, pivot: usize) -> Option<(T, NodeRef<T>)> {
        let is_leaf = node.is_leaf();
        let right = node::new_node::<T, A>(&self.alloc, &self.layout, is_leaf)?;
        let n = node.nitems();
        let sep = node::take(*node, &self.layout, pivot);
        let right_count = n - pivot - 1;

        let src_items = node::items_ptr(*node, &self.layout);
        let dst_items = node::items_ptr(right, &self.layout);
        core::ptr::copy_nonoverlapping(src_items.add(pivot + 1), dst_items, right_count);
        node::set_nitems(right, right_count);
        node::set_nitems(*node, pivot);

        if !is_leaf {
            let src_children = node::children_ptr(*node, &self.layout);
            let dst_children = node::children_ptr(right, &self.layout);
            core::ptr::copy_nonoverlapping(
                src_children.add(pivot + 1),
                dst_children,
                right_count + 1,
            );
        }
        Some((sep, right))
    }

    /// Median-promote split: both halves end up roughly equal. The
    /// default for `set`/`delete`-driven splits.
    pub(crate) unsafe fn split_balanced(&self, node: &mut NodeRef<T>) -> Option<(T, NodeRef<T>)> {
        let pivot = self.layout.max_items / 2;
        self.split_at(node, pivot)
    }

    /// Lean-left split: the right sibling ends up at exactly
    /// `min_items`, maximizing how full the left half stays. Used only
    /// by bulk `load`, which always appends at the rightmost spine —
    /// kept distinct from `split_balanced` rather than unified, since
    /// unifying would regress `load`'s fill ratio.
    pub(crate) unsafe fn split_lean_left(&self, node: &mut NodeRef<T>) -> Option<(T, NodeRef<T>)> {
        let pivot = self.layout.max_items - self.layout.min_items - 1;
        self.split_at(node, pivot)
    }

    /// Recursively delete/pop under `*node_ref`, which must already be
    /// exclusively owned.
    pub(crate) unsafe fn node_delete(
        &self,
        node_ref: &mut NodeRef<T>,
        action: DeleteAction<T>,
        mut hint: Option<&mut Hint>,
        depth: usize,
    ) -> DeleteOutcome<T> {
        let node = *node_ref;
        let n = node.nitems();

        let (found, i) = match action {
            DeleteAction::DeleteKey(key) => {
                let h = hint.as_mut().map(|h| &mut **h);
                match h {
                    Some(h) => search_hinted(node, &self.layout, &self.cmp, key, h, depth),
                    None => search_unhinted(node, &self.layout, &self.cmp, key),
                }
            }
            DeleteAction::PopMax => (true, n.wrapping_sub(1)),
            DeleteAction::PopFront => (node.is_leaf(), 0),
            DeleteAction::PopBack => {
                if node.is_leaf() {
                    (true, n.wrapping_sub(1))
                } else {
                    (false, n)
                }
            }
        };

        if node.is_leaf() {
            if n == 0 || !found {
                return DeleteOutcome::NoChange;
            }
            let item = node::take(node, &self.layout, i);
            node::shift_left(node, &self.layout, i, false);
            return DeleteOutcome::Deleted(item);
        }

        if found {
            return match action {
                DeleteAction::PopMax => {
                    let mut right = node::child(node, &self.layout, i + 1);
                    if self.cow_ensure(&mut right).is_err() {
                        return DeleteOutcome::NoMemory;
                    }
                    node::set_child(node, &self.layout, i + 1, right);
                    let result = self.node_delete(&mut right, DeleteAction::PopMax, None, depth + 1);
                    self.finish_branch_delete(node, i + 1, result)
                }
                _ => {
                    let removed = node::take(node, &self.layout, i);
                    let mut left = node::child(node, &self.layout, i);
                    if self.cow_ensure(&mut left).is_err() {
                        node::set(node, &self.layout, i, removed);
                        return DeleteOutcome::NoMemory;
                    }
                    node::set_child(node, &self.layout, i, left);
                    match self.node_delete(&mut left, DeleteAction::PopMax, None, depth + 1) {
                        DeleteOutcome::Deleted(pred) => {
                            node::set(node, &self.layout, i, pred);
                            self.finish_branch_delete(node, i, DeleteOutcome::Deleted(removed))
                        }
                        DeleteOutcome::NoMemory => DeleteOutcome::NoMemory,
                        DeleteOutcome::NoChange => {
                            // A non-empty subtree's PopMax always finds
                            // something; restore the separator and bail.
                            node::set(node, &self.layout, i, removed);
                            DeleteOutcome::NoChange
                        }
                    }
                }
            };
        }

        let mut target = node::child(node, &self.layout, i);
        if self.cow_ensure(&mut target).is_err() {
            return DeleteOutcome::NoMemory;
        }
        node::set_child(node, &self.layout, i, target);
        let h2 = hint.as_mut().map(|h| &mut **h);
        let result = self.node_delete(&mut target, action, h2, depth + 1);
        self.finish_branch_delete(node, i, result)
    }

    /// After recursing into `children[child_idx]`, rebalance if it
    /// underflowed. `child_idx` is clamped to `nitems - 1` so that
    /// `rebalance` can always treat it as the left of a sibling pair.
    unsafe fn finish_branch_delete(
        &self,
        node: NodeRef<T>,
        child_idx: usize,
        result: DeleteOutcome<T>,
    ) -> DeleteOutcome<T> {
        if let DeleteOutcome::Deleted(_) = &result {
            let mut idx = child_idx;
            let c = node::child(node, &self.layout, idx);
            if c.nitems() < self.layout.min_items {
                if idx == node.nitems() {
                    idx -= 1;
                }
                self.rebalance(node, idx);
            }
        }
        result
    }

    /// `left = children[i]`, `right = children[i+1]`. Merge them
    /// (pulling the separator `items[i]` down) if they would fit in
    /// one node; otherwise rotate a single item through the separator
    /// from whichever sibling has more to spare.
    unsafe fn rebalance(&self, node: NodeRef<T>, i: usize) {
        let left = node::child(node, &self.layout, i);
        let right = node::child(node, &self.layout, i + 1);

        if left.nitems() + right.nitems() < self.layout.max_items {
            let sep = node::take(node, &self.layout, i);
            node::push(left, &self.layout, sep);
            node::join(left, right, &self.layout);
            node::dealloc_node(right, &self.layout, &self.alloc);
            node::shift_left(node, &self.layout, i, true);
            return;
        }

        if left.nitems() > right.nitems() {
            let old_left_n = left.nitems();
            let sep = node::take(node, &self.layout, i);
            node::shift_right(right, &self.layout, 0);
            node::set(right, &self.layout, 0, sep);
            let moved = node::take(left, &self.layout, old_left_n - 1);
            node::set(node, &self.layout, i, moved);
            if !left.is_leaf() {
                let last_child = node::child(left, &self.layout, old_left_n);
                node::set_child(right, &self.layout, 0, last_child);
            }
            node::set_nitems(left, old_left_n - 1);
        } else {
            let sep = node::take(node, &self.layout, i);
            let lpos = left.nitems();
            node::set(left, &self.layout, lpos, sep);
            node::set_nitems(left, lpos + 1);
            if !left.is_leaf() {
                let first_child = node::child(right, &self.layout, 0);
                node::set_child(left, &self.layout, lpos + 1, first_child);
            }
            let moved = node::take(right, &self.layout, 0);
            node::set(node, &self.layout, i, moved);
            node::shift_left(right, &self.layout, 0, false);
        }
    }

    /// Fast pop-min: descend the leftmost spine directly, skipping the
    /// general delete machinery, as long as every node on the way is
    /// above `min_items` (so no rebalancing will be needed). Falls
    /// back to `node_delete(PopFront)` the moment a thin node is seen.
    pub(crate) unsafe fn fast_pop_min(&self, node_ref: &mut NodeRef<T>) -> DeleteOutcome<T> {
        let node = *node_ref;
        if node.nitems() <= self.layout.min_items {
            return self.node_delete(node_ref, DeleteAction::PopFront, None, 0);
        }
        if node.is_leaf() {
            let item = node::take(node, &self.layout, 0);
            node::shift_left(node, &self.layout, 0, false);
            return DeleteOutcome::Deleted(item);
        }
        let mut child = node::child(node, &self.layout, 0);
        if self.cow_ensure(&mut child).is_err() {
            return DeleteOutcome::NoMemory;
        }
        node::set_child(node, &self.layout, 0, child);
        let result = self.fast_pop_min(&mut child);
        self.finish_branch_delete(node, 0, result)
    }

    /// Mirror of `fast_pop_min` down the rightmost spine.
    pub(crate) unsafe fn fast_pop_max(&self, node_ref: &mut NodeRef<T>) -> DeleteOutcome<T> {
        let node = *node_ref;
        if node.nitems() <= self.layout.min_items {
            return self.node_delete(node_ref, DeleteAction::PopBack, None, 0);
        }
        let n = node.nitems();
        if node.is_leaf() {
            let item = node::take(node, &self.layout, n - 1);
            node::set_nitems(node, n - 1);
            return DeleteOutcome::Deleted(item);
        }
        let mut child = node::child(node, &self.layout, n);
        if self.cow_ensure(&mut child).is_err() {
            return DeleteOutcome::NoMemory;
        }
        node::set_child(node, &self.layout, n, child);
        let result = self.fast_pop_max(&mut child);
        self.finish_branch_delete(node, n, result)
    }

    /// Bulk-append `item`, which must sort after everything already in
    /// the tree. Descends the rightmost spine directly; splits with
    /// `split_lean_left` instead of `split_balanced` so a long run of
    /// `load` calls leaves every node but the last on each level
    /// packed near `max_items`, which is what gives bulk loading its
    /// throughput edge over repeated `set`.
    pub(crate) unsafe fn node_load(&self, node_ref: &mut NodeRef<T>, item: T) -> SetOutcome<T> {
        let node = *node_ref;
        if node.is_leaf() {
            let n = node.nitems();
            if n > 0 {
                debug_assert_eq!(
                    self.cmp.compare(node::get(node, &self.layout, n - 1), &item),
                    Ordering::Less
                );
            }
            if n >= self.layout.max_items {
                return SetOutcome::MustSplit(item);
            }
            node::push(node, &self.layout, item);
            return SetOutcome::Inserted;
        }

        let last = node.nitems();
        let mut child = node::child(node, &self.layout, last);
        if self.cow_ensure(&mut child).is_err() {
            return SetOutcome::NoMemory;
        }
        node::set_child(node, &self.layout, last, child);

        match self.node_load(&mut child, item) {
            SetOutcome::MustSplit(returned) => {
                if node.nitems() >= self.layout.max_items {
                    return SetOutcome::MustSplit(returned);
                }
                let (sep, right) = match self.split_lean_left(&mut child) {
                    Some(v) => v,
                    None => return SetOutcome::NoMemory,
                };
                node::set_child(node, &self.layout, last, child);
                node::push(node, &self.layout, sep);
                node::set_child(node, &self.layout, last + 1, right);
                self.node_load(node_ref, returned)
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::allocator::SystemAllocator;
    use crate::cmp::FnComparator;
    use crate::tree::BTree;

    fn by_value(a: &i32, b: &i32) -> core::cmp::Ordering {
        a.cmp(b)
    }

    fn tree(max_items: usize) -> BTree<i32, FnComparator<fn(&i32, &i32) -> core::cmp::Ordering>, SystemAllocator> {
        BTree::with_max_items(FnComparator::new(by_value as fn(&i32, &i32) -> core::cmp::Ordering), max_items)
    }

    #[test]
    fn set_splits_a_full_leaf_and_grows_the_height() {
        let mut t = tree(3);
        for v in 0..3 {
            t.set(v);
        }
        assert_eq!(t.height(), 1);
        t.set(3);
        assert_eq!(t.height(), 2);
        assert!(t.check_invariants());
        for v in 0..4 {
            assert_eq!(t.get(&v), Some(&v));
        }
    }

    #[test]
    fn split_balanced_keeps_both_halves_within_bounds_through_many_inserts() {
        let mut t = tree(4);
        for v in 0..500 {
            t.set(v);
        }
        assert!(t.check_invariants());
        assert_eq!(t.len(), 500);
    }

    #[test]
    fn delete_triggers_merge_when_siblings_are_both_thin() {
        // max_items = 3, min_items = 1: two freshly-split leaves sit at
        // the minimum, so deleting from one forces a merge rather than
        // a rotate.
        let mut t = tree(3);
        for v in 0..4 {
            t.set(v);
        }
        assert_eq!(t.height(), 2);
        t.delete(&0);
        assert!(t.check_invariants());
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn delete_rotates_from_the_fuller_sibling_instead_of_merging() {
        let mut t = tree(4);
        for v in 0..40 {
            t.set(v);
        }
        for v in 0..30 {
            t.delete(&v);
            assert!(t.check_invariants());
        }
        assert_eq!(t.len(), 10);
        for v in 30..40 {
            assert_eq!(t.get(&v), Some(&v));
        }
    }

    #[test]
    fn fast_pop_min_and_max_drain_a_tree_in_order() {
        let mut t = tree(5);
        for v in 0..200 {
            t.set(v);
        }
        let mut front = Vec::new();
        let mut back = Vec::new();
        while t.len() > 100 {
            front.push(t.pop_min().unwrap());
        }
        while t.len() > 0 {
            back.push(t.pop_max().unwrap());
        }
        assert_eq!(front, (0..100).collect::<Vec<_>>());
        back.reverse();
        assert_eq!(back, (100..200).collect::<Vec<_>>());
    }

    #[test]
    fn bulk_load_matches_sequential_set_for_ascending_input() {
        let mut loaded = tree(4);
        let mut set_tree = tree(4);
        for v in 0..300 {
            loaded.load(v);
            set_tree.set(v);
        }
        assert!(loaded.check_invariants());
        assert_eq!(loaded.len(), set_tree.len());
        let mut a = Vec::new();
        let mut b = Vec::new();
        loaded.ascend(None, |v| {
            a.push(*v);
            true
        });
        set_tree.ascend(None, |v| {
            b.push(*v);
            true
        });
        assert_eq!(a, b);
    }
}
