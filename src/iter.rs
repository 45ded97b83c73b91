//! Stateful positional cursor: a stack of `(node, index)` frames, one
//! per level from the root down to the current leaf, sized to the
//! tree's height.

use crate::allocator::RawAllocator;
use crate::cmp::Comparator;
use crate::node::{self, NodeRef};
use crate::search::search_unhinted;
use crate::tree::BTree;

struct Frame<T> {
    node: NodeRef<T>,
    /// Index of the item this frame is currently positioned at.
    idx: usize,
}

/// A lazy, positional, bidirectional cursor over a tree's items in
/// ascending key order. Unlike `ascend`/`descend`, this does not take
/// a closure: it holds its place between calls.
pub struct Iter<'a, T, C, A: RawAllocator> {
    tree: &'a BTree<T, C, A>,
    stack: alloc::vec::Vec<Frame<T>>,
    at_leaf_item: bool,
}

impl<'a, T, C: Comparator<T>, A: RawAllocator> Iter<'a, T, C, A> {
    pub(crate) fn new(tree: &'a BTree<T, C, A>) -> Self {
        Iter {
            tree,
            stack: alloc::vec::Vec::with_capacity(tree.height() + 1),
            at_leaf_item: false,
        }
    }

    /// Position the cursor at the first (smallest) item, if any.
    pub fn first(&mut self) -> Option<&'a T> {
        self.stack.clear();
        self.at_leaf_item = false;
        let mut node = self.tree.root_ref()?;
        loop {
            self.stack.push(Frame { node, idx: 0 });
            if node.is_leaf() {
                break;
            }
            node = unsafe { node::child(node, self.tree.layout(), 0) };
        }
        self.at_leaf_item = true;
        self.current()
    }

    /// Position the cursor at the last (largest) item, if any.
    pub fn last(&mut self) -> Option<&'a T> {
        self.stack.clear();
        self.at_leaf_item = false;
        let mut node = self.tree.root_ref()?;
        loop {
            let n = node.nitems();
            if node.is_leaf() {
                self.stack.push(Frame {
                    node,
                    idx: n.saturating_sub(1),
                });
                break;
            }
            self.stack.push(Frame { node, idx: n });
            node = unsafe { node::child(node, self.tree.layout(), n) };
        }
        self.at_leaf_item = true;
        self.current()
    }

    /// Position the cursor at the first item `>= key`.
    pub fn seek(&mut self, key: &T) -> Option<&'a T> {
        self.stack.clear();
        self.at_leaf_item = false;
        let mut node = self.tree.root_ref()?;
        loop {
            let (found, idx) =
                unsafe { search_unhinted(node, self.tree.layout(), self.tree.comparator(), key) };
            if node.is_leaf() {
                self.stack.push(Frame { node, idx });
                if idx < node.nitems() {
                    self.at_leaf_item = true;
                    return self.current();
                }
                // `key` sorts past every item in this leaf; its
                // successor, if any, is the nearest not-yet-exhausted
                // ancestor separator — climb for it exactly as `next`
                // would after draining this leaf.
                return self.climb_past_exhausted_leaf();
            }
            if found {
                self.stack.push(Frame { node, idx });
                self.at_leaf_item = true;
                break;
            }
            self.stack.push(Frame { node, idx });
            node = unsafe { node::child(node, self.tree.layout(), idx) };
        }
        self.current()
    }

    /// Pop the (exhausted) leaf frame just pushed by `seek` and walk
    /// back up the stack until an ancestor whose separator index is
    /// still in bounds, or the stack is empty. Mirrors the ancestor
    /// half of `next`'s pop loop; unlike `next`, the leaf frame here
    /// is already sitting one past its last item, so no initial
    /// increment is needed before checking it.
    fn climb_past_exhausted_leaf(&mut self) -> Option<&'a T> {
        self.stack.pop();
        loop {
            match self.stack.last() {
                None => {
                    self.at_leaf_item = false;
                    return None;
                }
                Some(parent) => {
                    if parent.idx < parent.node.nitems() {
                        self.at_leaf_item = true;
                        return self.current();
                    }
                }
            }
            self.stack.pop();
        }
    }

    fn current(&self) -> Option<&'a T> {
        if !self.at_leaf_item {
            return None;
        }
        let frame = self.stack.last()?;
        if frame.idx >= frame.node.nitems() {
            return None;
        }
        Some(unsafe { node::get(frame.node, self.tree.layout(), frame.idx) })
    }

    /// Item at the cursor's current position, if any.
    pub fn item(&self) -> Option<&'a T> {
        self.current()
    }

    /// Advance to the next item in ascending order.
    pub fn next(&mut self) -> Option<&'a T> {
        if self.stack.is_empty() {
            return self.first();
        }
        let layout = self.tree.layout();
        // If we are sitting on a branch item, the next item is the
        // smallest item of the subtree just to its right. The frame's
        // own `idx` must advance to that child index before we push
        // anything on top of it, so that a later pop back up to this
        // frame knows it has already moved past the old separator.
        {
            let is_branch_item = {
                let top = self.stack.last().unwrap();
                !top.node.is_leaf() && self.at_leaf_item
            };
            if is_branch_item {
                let mut node = {
                    let top = self.stack.last_mut().unwrap();
                    top.idx += 1;
                    unsafe { node::child(top.node, layout, top.idx) }
                };
                loop {
                    self.stack.push(Frame { node, idx: 0 });
                    if node.is_leaf() {
                        break;
                    }
                    node = unsafe { node::child(node, layout, 0) };
                }
                self.at_leaf_item = true;
                return self.current();
            }
        }
        // Leaf frame: step within it, popping frames whose items are
        // exhausted and consuming the parent separator we land on.
        loop {
            let frame = self.stack.last_mut().unwrap();
            frame.idx += 1;
            if frame.idx < frame.node.nitems() {
                self.at_leaf_item = true;
                return self.current();
            }
            self.stack.pop();
            match self.stack.last() {
                None => {
                    self.at_leaf_item = false;
                    return None;
                }
                Some(parent) => {
                    if parent.idx < parent.node.nitems() {
                        self.at_leaf_item = true;
                        return self.current();
                    }
                    // parent's separator also exhausted; keep popping
                }
            }
        }
    }

    /// Step back to the previous item in ascending order.
    pub fn prev(&mut self) -> Option<&'a T> {
        if self.stack.is_empty() {
            return self.last();
        }
        let layout = self.tree.layout();
        {
            let top = self.stack.last().unwrap();
            if !top.node.is_leaf() && self.at_leaf_item {
                let child = unsafe { node::child(top.node, layout, top.idx) };
                let mut node = child;
                loop {
                    let n = node.nitems();
                    if node.is_leaf() {
                        self.stack.push(Frame {
                            node,
                            idx: n.saturating_sub(1),
                        });
                        break;
                    }
                    self.stack.push(Frame { node, idx: n });
                    node = unsafe { node::child(node, layout, n) };
                }
                self.at_leaf_item = true;
                return self.current();
            }
        }
        loop {
            let frame = self.stack.last_mut().unwrap();
            if frame.idx > 0 {
                frame.idx -= 1;
                self.at_leaf_item = true;
                return self.current();
            }
            self.stack.pop();
            match self.stack.last() {
                None => {
                    self.at_leaf_item = false;
                    return None;
                }
                Some(parent) => {
                    if parent.idx > 0 {
                        // the parent's own separator just left of its
                        // pointer into the child we came from
                        let idx = parent.idx - 1;
                        self.stack.last_mut().unwrap().idx = idx;
                        self.at_leaf_item = true;
                        return self.current();
                    }
                }
            }
        }
    }
}
