//! In-order traversal with an optional starting pivot, and the
//! mutating "action" variants.

use core::cmp::Ordering;

use crate::allocator::RawAllocator;
use crate::cmp::Comparator;
use crate::node::{self, NodeRef};
use crate::search::search_unhinted;
use crate::tree::BTree;

/// What an `action_ascend`/`action_descend` callback asks for after
/// editing its scratch copy of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Leave the item as it was.
    None,
    /// Commit the edited scratch back in place.
    Update,
    /// Remove the item.
    Delete,
    /// Stop the traversal immediately (no commit for the current item).
    Stop,
}

enum Step<T> {
    Continue,
    Stop,
    /// A delete landed on a node the in-place fast path could not
    /// handle (a branch, or a leaf at `min_items`). The key is handed
    /// back so the caller can run a full `delete` and restart the
    /// traversal just past it.
    NeedsDelete(T),
}

impl<T, C: Comparator<T>, A: RawAllocator> BTree<T, C, A> {
    /// Visit items in ascending order, starting at the first item
    /// `>= pivot` (or the very first item if `pivot` is `None`).
    /// Stops early (returning `false`) the first time `f` returns
    /// `false`; returns `true` if the walk ran to completion.
    pub fn ascend<F: FnMut(&T) -> bool>(&self, pivot: Option<&T>, mut f: F) -> bool {
        match self.root {
            None => true,
            Some(root) => unsafe { self.ascend_node(root, pivot, &mut f) },
        }
    }

    unsafe fn ascend_node<F: FnMut(&T) -> bool>(
        &self,
        node: NodeRef<T>,
        pivot: Option<&T>,
        f: &mut F,
    ) -> bool {
        let n = node.nitems();
        if node.is_leaf() {
            let start = match pivot {
                None => 0,
                Some(p) => search_unhinted(node, &self.layout, &self.cmp, p).1,
            };
            for idx in start..n {
                if !f(node::get(node, &self.layout, idx)) {
                    return false;
                }
            }
            return true;
        }

        let (found, start) = match pivot {
            None => (false, 0),
            Some(p) => search_unhinted(node, &self.layout, &self.cmp, p),
        };
        let mut idx = start;
        if !found {
            let child = node::child(node, &self.layout, idx);
            if !self.ascend_node(child, pivot, f) {
                return false;
            }
        }
        while idx < n {
            if !f(node::get(node, &self.layout, idx)) {
                return false;
            }
            idx += 1;
            let child = node::child(node, &self.layout, idx);
            if !self.ascend_node(child, None, f) {
                return false;
            }
        }
        true
    }

    /// Visit items in descending order, starting at the last item
    /// `<= pivot` (or the very last item if `pivot` is `None`).
    pub fn descend<F: FnMut(&T) -> bool>(&self, pivot: Option<&T>, mut f: F) -> bool {
        match self.root {
            None => true,
            Some(root) => unsafe { self.descend_node(root, pivot, &mut f) },
        }
    }

    unsafe fn descend_node<F: FnMut(&T) -> bool>(
        &self,
        node: NodeRef<T>,
        pivot: Option<&T>,
        f: &mut F,
    ) -> bool {
        let n = node.nitems();
        if node.is_leaf() {
            let end = match pivot {
                None => n,
                Some(p) => {
                    let (found, idx) = search_unhinted(node, &self.layout, &self.cmp, p);
                    if found {
                        idx + 1
                    } else {
                        idx
                    }
                }
            };
            let mut i = end;
            while i > 0 {
                i -= 1;
                if !f(node::get(node, &self.layout, i)) {
                    return false;
                }
            }
            return true;
        }

        let (found, start) = match pivot {
            None => (false, n),
            Some(p) => search_unhinted(node, &self.layout, &self.cmp, p),
        };
        let mut idx = start;
        if found {
            if !f(node::get(node, &self.layout, idx)) {
                return false;
            }
            let child = node::child(node, &self.layout, idx);
            if !self.descend_node(child, None, f) {
                return false;
            }
        } else {
            let child = node::child(node, &self.layout, idx);
            if !self.descend_node(child, pivot, f) {
                return false;
            }
        }
        while idx > 0 {
            idx -= 1;
            if !f(node::get(node, &self.layout, idx)) {
                return false;
            }
            let child = node::child(node, &self.layout, idx);
            if !self.descend_node(child, None, f) {
                return false;
            }
        }
        true
    }
}

impl<T: Clone, C: Comparator<T>, A: RawAllocator> BTree<T, C, A> {
    /// Ascending mutating walk: `f` receives a scratch copy of each
    /// item and decides its fate via [`Action`]. A commit-time key
    /// change (`Update` where the edited item no longer compares equal
    /// to the original) is refused — the callback is simply invoked
    /// again on a fresh scratch of the *unmodified* item, since writing
    /// a key-divergent value in place would corrupt ordering. A
    /// `Delete` that the leaf-level fast path cannot satisfy in place
    /// falls back to a full tree-wide delete and restarts the walk
    /// just past the removed key.
    pub fn action_ascend<F: FnMut(&mut T) -> Action>(&mut self, pivot: Option<&T>, mut f: F) {
        let mut current = pivot.cloned();
        loop {
            let step = match self.root_mut() {
                None => Step::Continue,
                Some(root) => unsafe { self.action_ascend_node(root, current.as_ref(), &mut f) },
            };
            match step {
                Step::Continue | Step::Stop => break,
                Step::NeedsDelete(key) => {
                    self.delete(&key);
                    current = Some(key);
                }
            }
        }
    }

    unsafe fn action_ascend_node<F: FnMut(&mut T) -> Action>(
        &mut self,
        node_ref: &mut NodeRef<T>,
        pivot: Option<&T>,
        f: &mut F,
    ) -> Step<T> {
        if self.cow_ensure(node_ref).is_err() {
            self.mark_oom();
            return Step::Stop;
        }
        let node = *node_ref;
        let (found, start) = match pivot {
            None => (false, 0),
            Some(p) => search_unhinted(node, &self.layout, &self.cmp, p),
        };
        let mut idx = start;

        if !node.is_leaf() && !found {
            let slot = node::children_ptr(node, &self.layout).add(idx);
            match self.action_ascend_node(&mut *slot, pivot, f) {
                Step::Continue => {}
                other => return other,
            }
        }

        loop {
            if idx >= node.nitems() {
                break;
            }
            let item_ptr = node::items_ptr(node, &self.layout).add(idx);
            let mut scratch = (*item_ptr).clone();
            match f(&mut scratch) {
                Action::None => {}
                Action::Stop => return Step::Stop,
                Action::Update => loop {
                    if self.cmp.compare(&scratch, &*item_ptr) == Ordering::Equal {
                        core::ptr::write(item_ptr, scratch);
                        break;
                    }
                    let mut retry = (*item_ptr).clone();
                    match f(&mut retry) {
                        Action::Update => scratch = retry,
                        Action::None => break,
                        Action::Stop => return Step::Stop,
                        Action::Delete => return Step::NeedsDelete((*item_ptr).clone()),
                    }
                },
                Action::Delete => {
                    if node.is_leaf() && node.nitems() > self.layout.min_items {
                        node::shift_left(node, &self.layout, idx, false);
                        self.dec_count();
                        continue;
                    }
                    return Step::NeedsDelete((*item_ptr).clone());
                }
            }
            idx += 1;
            if !node.is_leaf() {
                let slot = node::children_ptr(node, &self.layout).add(idx);
                match self.action_ascend_node(&mut *slot, None, f) {
                    Step::Continue => {}
                    other => return other,
                }
            }
        }
        Step::Continue
    }

    /// Mirror of [`Self::action_ascend`] in descending order.
    pub fn action_descend<F: FnMut(&mut T) -> Action>(&mut self, pivot: Option<&T>, mut f: F) {
        let mut current = pivot.cloned();
        loop {
            let step = match self.root_mut() {
                None => Step::Continue,
                Some(root) => unsafe { self.action_descend_node(root, current.as_ref(), &mut f) },
            };
            match step {
                Step::Continue | Step::Stop => break,
                Step::NeedsDelete(key) => {
                    self.delete(&key);
                    current = Some(key);
                }
            }
        }
    }

    unsafe fn action_descend_node<F: FnMut(&mut T) -> Action>(
        &mut self,
        node_ref: &mut NodeRef<T>,
        pivot: Option<&T>,
        f: &mut F,
    ) -> Step<T> {
        if self.cow_ensure(node_ref).is_err() {
            self.mark_oom();
            return Step::Stop;
        }
        let node = *node_ref;
        let n = node.nitems();
        let (found, start) = match pivot {
            None => (false, n),
            Some(p) => search_unhinted(node, &self.layout, &self.cmp, p),
        };

        if !node.is_leaf() && !found {
            let slot = node::children_ptr(node, &self.layout).add(start);
            match self.action_descend_node(&mut *slot, pivot, f) {
                Step::Continue => {}
                other => return other,
            }
        }

        let mut idx = start;
        loop {
            if idx == 0 {
                break;
            }
            idx -= 1;
            let item_ptr = node::items_ptr(node, &self.layout).add(idx);
            let mut scratch = (*item_ptr).clone();
            match f(&mut scratch) {
                Action::None => {}
                Action::Stop => return Step::Stop,
                Action::Update => loop {
                    if self.cmp.compare(&scratch, &*item_ptr) == Ordering::Equal {
                        core::ptr::write(item_ptr, scratch);
                        break;
                    }
                    let mut retry = (*item_ptr).clone();
                    match f(&mut retry) {
                        Action::Update => scratch = retry,
                        Action::None => break,
                        Action::Stop => return Step::Stop,
                        Action::Delete => return Step::NeedsDelete((*item_ptr).clone()),
                    }
                },
                Action::Delete => {
                    if node.is_leaf() && node.nitems() > self.layout.min_items {
                        node::shift_left(node, &self.layout, idx, false);
                        self.dec_count();
                        continue;
                    }
                    return Step::NeedsDelete((*item_ptr).clone());
                }
            }
            if !node.is_leaf() {
                let slot = node::children_ptr(node, &self.layout).add(idx);
                match self.action_descend_node(&mut *slot, None, f) {
                    Step::Continue => {}
                    other => return other,
                }
            }
        }
        Step::Continue
    }
}
