//! Public façade: `BTree<T, C, A>`.

use core::sync::atomic::Ordering;

use crate::allocator::RawAllocator;
use crate::cmp::Comparator;
use crate::cow::release;
use crate::iter::Iter;
use crate::layout::{NodeLayout, DEFAULT_MAX_ITEMS};
use crate::mutate::{DeleteAction, DeleteOutcome, SetOutcome};
use crate::node::{self, NodeRef};
use crate::search::Hint;

#[cfg(feature = "std")]
use crate::allocator::SystemAllocator;

/// An in-memory, copy-on-write ordered collection of `T`, kept sorted
/// by a caller-supplied [`Comparator`].
///
/// Cloning a `BTree` is O(1): it bumps the root's reference count and
/// shares every node until a mutation actually needs to touch one, at
/// which point that one node (and only that node, plus anything on
/// the path to it) is privately copied.
pub struct BTree<T, C, #[cfg(feature = "std")] A: RawAllocator = SystemAllocator, #[cfg(not(feature = "std"))] A: RawAllocator> {
    pub(crate) root: Option<NodeRef<T>>,
    pub(crate) layout: NodeLayout,
    pub(crate) cmp: C,
    pub(crate) alloc: A,
    pub(crate) count: usize,
    pub(crate) height: usize,
    pub(crate) oom: bool,
}

#[cfg(feature = "std")]
impl<T, C: Comparator<T>> BTree<T, C, SystemAllocator> {
    /// Build a tree with the default fan-out (`max_items = 255`) and
    /// the system allocator.
    pub fn new(cmp: C) -> Self {
        Self::new_in(cmp, SystemAllocator)
    }

    /// Build a tree with an explicit fan-out and the system allocator.
    /// `max_items` is clamped to `[3, 2045]`.
    pub fn with_max_items(cmp: C, max_items: usize) -> Self {
        Self::with_max_items_in(cmp, max_items, SystemAllocator)
    }
}

impl<T, C: Comparator<T>, A: RawAllocator> BTree<T, C, A> {
    /// Build a tree with the default fan-out and an explicit
    /// allocator.
    pub fn new_in(cmp: C, alloc: A) -> Self {
        Self::with_max_items_in(cmp, DEFAULT_MAX_ITEMS, alloc)
    }

    /// Build a tree with an explicit fan-out and allocator. Never
    /// allocates: the root node is created lazily on the first
    /// mutation.
    pub fn with_max_items_in(cmp: C, max_items: usize, alloc: A) -> Self {
        BTree {
            root: None,
            layout: NodeLayout::compute::<T>(max_items),
            cmp,
            alloc,
            count: 0,
            height: 0,
            oom: false,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Height of the tree in levels, `0` for an empty tree.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Whether the most recent mutating call failed to allocate.
    /// Sticky until the next mutating call runs (successfully or not).
    pub fn oom(&self) -> bool {
        self.oom
    }

    pub(crate) fn mark_oom(&mut self) {
        self.oom = true;
    }

    pub(crate) fn dec_count(&mut self) {
        self.count -= 1;
    }

    pub(crate) fn layout(&self) -> &NodeLayout {
        &self.layout
    }

    pub(crate) fn comparator(&self) -> &C {
        &self.cmp
    }

    pub(crate) fn root_ref(&self) -> Option<NodeRef<T>> {
        self.root
    }

    pub(crate) fn root_mut(&mut self) -> Option<&mut NodeRef<T>> {
        self.root.as_mut()
    }

    /// Look up `key`, returning the matching stored item.
    pub fn get(&self, key: &T) -> Option<&T> {
        let mut node = self.root?;
        loop {
            let (found, i) =
                unsafe { crate::search::search_unhinted(node, &self.layout, &self.cmp, key) };
            if found {
                return Some(unsafe { node::get(node, &self.layout, i) });
            }
            if node.is_leaf() {
                return None;
            }
            node = unsafe { node::child(node, &self.layout, i) };
        }
    }

    /// Look up `key` using and updating a caller-owned [`Hint`].
    pub fn get_hint(&self, key: &T, hint: &mut Hint) -> Option<&T> {
        let mut node = self.root?;
        let mut depth = 0;
        loop {
            let (found, i) = unsafe {
                crate::search::search_hinted(node, &self.layout, &self.cmp, key, hint, depth)
            };
            if found {
                return Some(unsafe { node::get(node, &self.layout, i) });
            }
            if node.is_leaf() {
                return None;
            }
            node = unsafe { node::child(node, &self.layout, i) };
            depth += 1;
        }
    }

    /// Smallest stored item.
    pub fn min(&self) -> Option<&T> {
        let mut node = self.root?;
        loop {
            if node.is_leaf() {
                return Some(unsafe { node::get(node, &self.layout, 0) });
            }
            node = unsafe { node::child(node, &self.layout, 0) };
        }
    }

    /// Largest stored item.
    pub fn max(&self) -> Option<&T> {
        let mut node = self.root?;
        loop {
            let n = node.nitems();
            if node.is_leaf() {
                return Some(unsafe { node::get(node, &self.layout, n - 1) });
            }
            node = unsafe { node::child(node, &self.layout, n) };
        }
    }

    /// A lazy cursor over the tree's items in ascending order.
    pub fn iter(&self) -> Iter<'_, T, C, A> {
        Iter::new(self)
    }

    /// Check the tree's structural invariants: all leaves at one
    /// depth, every non-root node within `[min_items, max_items]`, a
    /// strictly ascending in-order walk, and `count` matching the
    /// actual number of reachable items. Intended for tests and
    /// debugging, not the hot path.
    pub fn check_invariants(&self) -> bool {
        self.check_invariants_detailed().is_ok()
    }

    /// As [`Self::check_invariants`], but returns the first violation
    /// found instead of collapsing it to a bool.
    pub fn check_invariants_detailed(&self) -> Result<(), alloc::string::String> {
        use alloc::string::String;
        let root = match self.root {
            None => {
                return if self.count == 0 && self.height == 0 {
                    Ok(())
                } else {
                    Err(String::from(
                        "empty tree must have count == 0 and height == 0",
                    ))
                };
            }
            Some(root) => root,
        };
        let mut total = 0usize;
        let mut prev: Option<*const T> = None;
        let mut leaf_depth: Option<usize> = None;
        self.validate_node(root, 0, true, &mut total, &mut prev, &mut leaf_depth)?;
        if total != self.count {
            return Err(alloc::format!(
                "count mismatch: recorded {}, actual {}",
                self.count,
                total
            ));
        }
        match leaf_depth {
            Some(d) if d + 1 == self.height => Ok(()),
            Some(d) => Err(alloc::format!(
                "height mismatch: recorded {}, leaves found at depth {}",
                self.height,
                d + 1
            )),
            None => Err(String::from("non-empty tree has no leaves")),
        }
    }

    fn validate_node(
        &self,
        node: NodeRef<T>,
        depth: usize,
        is_root: bool,
        total: &mut usize,
        prev: &mut Option<*const T>,
        leaf_depth: &mut Option<usize>,
    ) -> Result<(), alloc::string::String> {
        let n = node.nitems();
        if !is_root && (n < self.layout.min_items || n > self.layout.max_items) {
            return Err(alloc::format!(
                "node at depth {} has {} items, outside [{}, {}]",
                depth,
                n,
                self.layout.min_items,
                self.layout.max_items
            ));
        }
        if is_root && n == 0 && !node.is_leaf() {
            return Err(alloc::string::String::from(
                "non-leaf root has zero items",
            ));
        }

        if node.is_leaf() {
            for i in 0..n {
                let item = unsafe { node::get(node, &self.layout, i) };
                self.check_ascending(item, prev)?;
            }
            *total += n;
            match *leaf_depth {
                Some(d) if d != depth => {
                    return Err(alloc::format!(
                        "leaves at inconsistent depths {} and {}",
                        d,
                        depth
                    ))
                }
                Some(_) => {}
                None => *leaf_depth = Some(depth),
            }
            return Ok(());
        }

        for i in 0..=n {
            let child = unsafe { node::child(node, &self.layout, i) };
            self.validate_node(child, depth + 1, false, total, prev, leaf_depth)?;
            if i < n {
                let item = unsafe { node::get(node, &self.layout, i) };
                self.check_ascending(item, prev)?;
                *total += 1;
            }
        }
        Ok(())
    }

    fn check_ascending(
        &self,
        item: &T,
        prev: &mut Option<*const T>,
    ) -> Result<(), alloc::string::String> {
        if let Some(p) = *prev {
            if self.cmp.compare(unsafe { &*p }, item) != core::cmp::Ordering::Less {
                return Err(alloc::string::String::from(
                    "in-order walk is not strictly ascending",
                ));
            }
        }
        *prev = Some(item as *const T);
        Ok(())
    }
}

impl<T: Clone, C: Comparator<T>, A: RawAllocator> BTree<T, C, A> {
    fn ensure_root(&mut self) -> Result<NodeRef<T>, ()> {
        if let Some(root) = self.root {
            return Ok(root);
        }
        let root = unsafe { node::new_node::<T, A>(&self.alloc, &self.layout, true) }.ok_or(())?;
        self.root = Some(root);
        self.height = 1;
        Ok(root)
    }

    /// Insert `item`, or replace the stored item comparing equal to it.
    /// Returns the replaced item, if any.
    pub fn set(&mut self, item: T) -> Option<T> {
        self.set_impl(item, None)
    }

    /// As [`Self::set`], accelerated by a caller-owned [`Hint`].
    pub fn set_hint(&mut self, item: T, hint: &mut Hint) -> Option<T> {
        self.set_impl(item, Some(hint))
    }

    fn set_impl(&mut self, item: T, hint: Option<&mut Hint>) -> Option<T> {
        self.oom = false;
        let mut root = match self.ensure_root() {
            Ok(r) => r,
            Err(()) => {
                self.oom = true;
                return None;
            }
        };
        if self.cow_ensure(&mut root).is_err() {
            self.oom = true;
            return None;
        }
        self.root = Some(root);

        match unsafe { self.node_set(&mut root, item, hint, 0) } {
            SetOutcome::Inserted => {
                self.root = Some(root);
                self.count += 1;
                None
            }
            SetOutcome::Replaced(old) => {
                self.root = Some(root);
                Some(old)
            }
            SetOutcome::NoMemory => {
                self.oom = true;
                None
            }
            SetOutcome::MustSplit(item) => {
                // The root itself is full: split it and grow the tree
                // by one level, then retry once (this can only happen
                // a single time per call, since the new root can never
                // be full).
                let mut old_root = root;
                let (sep, right) = match unsafe { self.split_balanced(&mut old_root) } {
                    Some(v) => v,
                    None => {
                        self.oom = true;
                        return None;
                    }
                };
                let new_root = match unsafe { node::new_node::<T, A>(&self.alloc, &self.layout, false) } {
                    Some(n) => n,
                    None => {
                        self.oom = true;
                        return None;
                    }
                };
                unsafe {
                    node::set_child(new_root, &self.layout, 0, old_root);
                    node::push(new_root, &self.layout, sep);
                    node::set_child(new_root, &self.layout, 1, right);
                }
                self.root = Some(new_root);
                self.height += 1;
                match unsafe { self.node_set(&mut self.root.unwrap(), item, None, 0) } {
                    SetOutcome::Inserted => {
                        self.count += 1;
                        None
                    }
                    SetOutcome::Replaced(old) => Some(old),
                    _ => {
                        self.oom = true;
                        None
                    }
                }
            }
        }
    }

    /// Remove the item comparing equal to `key`, if present.
    pub fn delete(&mut self, key: &T) -> Option<T> {
        self.delete_impl(DeleteAction::DeleteKey(key), None)
    }

    /// As [`Self::delete`], accelerated by a caller-owned [`Hint`].
    pub fn delete_hint(&mut self, key: &T, hint: &mut Hint) -> Option<T> {
        self.delete_impl(DeleteAction::DeleteKey(key), Some(hint))
    }

    /// Remove and return the smallest item.
    pub fn pop_min(&mut self) -> Option<T> {
        self.oom = false;
        let mut root = self.root?;
        if self.cow_ensure(&mut root).is_err() {
            self.oom = true;
            return None;
        }
        self.root = Some(root);
        let result = unsafe { self.fast_pop_min(&mut root) };
        self.finish_delete(root, result)
    }

    /// Remove and return the largest item.
    pub fn pop_max(&mut self) -> Option<T> {
        self.oom = false;
        let mut root = self.root?;
        if self.cow_ensure(&mut root).is_err() {
            self.oom = true;
            return None;
        }
        self.root = Some(root);
        let result = unsafe { self.fast_pop_max(&mut root) };
        self.finish_delete(root, result)
    }

    fn delete_impl(&mut self, action: DeleteAction<T>, hint: Option<&mut Hint>) -> Option<T> {
        self.oom = false;
        let mut root = match self.root {
            Some(r) => r,
            None => return None,
        };
        if self.cow_ensure(&mut root).is_err() {
            self.oom = true;
            return None;
        }
        self.root = Some(root);
        let result = unsafe { self.node_delete(&mut root, action, hint, 0) };
        self.finish_delete(root, result)
    }

    fn finish_delete(&mut self, root: NodeRef<T>, result: DeleteOutcome<T>) -> Option<T> {
        match result {
            DeleteOutcome::Deleted(item) => {
                self.count -= 1;
                self.collapse_root(root);
                Some(item)
            }
            DeleteOutcome::NoChange => {
                self.root = Some(root);
                None
            }
            DeleteOutcome::NoMemory => {
                self.root = Some(root);
                self.oom = true;
                None
            }
        }
    }

    /// If the root is a branch left with zero items (everything now
    /// lives in its one surviving child), replace it with that child
    /// and shrink the tree's height by one. A root leaf left at zero
    /// items instead makes the tree empty.
    fn collapse_root(&mut self, root: NodeRef<T>) {
        if root.nitems() > 0 {
            self.root = Some(root);
            return;
        }
        if root.is_leaf() {
            unsafe { node::dealloc_node(root, &self.layout, &self.alloc) };
            self.root = None;
            self.height = 0;
            return;
        }
        let only_child = unsafe { node::child(root, &self.layout, 0) };
        unsafe { node::dealloc_node(root, &self.layout, &self.alloc) };
        self.root = Some(only_child);
        self.height -= 1;
    }

    /// Bulk-append `item`, which must sort after every item already in
    /// the tree. Using this for out-of-order input
    /// produces an invalid tree; it trades that caller obligation for
    /// roughly an order of magnitude more throughput than repeated
    /// `set` when building a tree from already-sorted data.
    pub fn load(&mut self, item: T) {
        self.oom = false;
        let mut root = match self.ensure_root() {
            Ok(r) => r,
            Err(()) => {
                self.oom = true;
                return;
            }
        };
        if self.cow_ensure(&mut root).is_err() {
            self.oom = true;
            return;
        }
        self.root = Some(root);
        match unsafe { self.node_load(&mut root, item) } {
            SetOutcome::Inserted => {
                self.root = Some(root);
                self.count += 1;
            }
            SetOutcome::NoMemory => self.oom = true,
            SetOutcome::MustSplit(item) => {
                let mut old_root = root;
                let (sep, right) = match unsafe { self.split_lean_left(&mut old_root) } {
                    Some(v) => v,
                    None => {
                        self.oom = true;
                        return;
                    }
                };
                let new_root = match unsafe { node::new_node::<T, A>(&self.alloc, &self.layout, false) } {
                    Some(n) => n,
                    None => {
                        self.oom = true;
                        return;
                    }
                };
                unsafe {
                    node::set_child(new_root, &self.layout, 0, old_root);
                    node::push(new_root, &self.layout, sep);
                    node::set_child(new_root, &self.layout, 1, right);
                }
                self.root = Some(new_root);
                self.height += 1;
                let mut r = self.root.unwrap();
                match unsafe { self.node_load(&mut r, item) } {
                    SetOutcome::Inserted => self.count += 1,
                    _ => self.oom = true,
                }
            }
            SetOutcome::Replaced(_) => unreachable!("load never compares keys for equality"),
        }
    }

    /// Discard every item, freeing the whole tree.
    pub fn clear(&mut self) {
        if let Some(root) = self.root.take() {
            unsafe { release(root, &self.layout, &self.alloc) };
        }
        self.count = 0;
        self.height = 0;
        self.oom = false;
    }

    /// Iterate items in `[lower, upper)` per the usual [`Bound`]
    /// semantics, read-only. Additive sugar over [`Self::ascend`]; it
    /// is not a deletion primitive (spec's Non-goals exclude range
    /// deletion beyond pop-min/pop-max).
    pub fn range<'a>(
        &'a self,
        lower: core::ops::Bound<&'a T>,
        upper: core::ops::Bound<&'a T>,
    ) -> Range<'a, T, C, A> {
        Range {
            tree: self,
            lower,
            upper,
            started: false,
            done: false,
            cursor: self.iter(),
        }
    }
}

/// Iterator returned by [`BTree::range`].
pub struct Range<'a, T, C, A: RawAllocator> {
    tree: &'a BTree<T, C, A>,
    lower: core::ops::Bound<&'a T>,
    upper: core::ops::Bound<&'a T>,
    started: bool,
    done: bool,
    cursor: Iter<'a, T, C, A>,
}

impl<'a, T, C: Comparator<T>, A: RawAllocator> Iterator for Range<'a, T, C, A> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.done {
            return None;
        }
        let item = if !self.started {
            self.started = true;
            match self.lower {
                core::ops::Bound::Unbounded => self.cursor.first(),
                core::ops::Bound::Included(k) => self.cursor.seek(k),
                core::ops::Bound::Excluded(k) => {
                    let first = self.cursor.seek(k);
                    match first {
                        Some(v) if self.tree.comparator().compare(v, k) == core::cmp::Ordering::Equal => {
                            self.cursor.next()
                        }
                        other => other,
                    }
                }
            }
        } else {
            self.cursor.next()
        };

        match item {
            None => {
                self.done = true;
                None
            }
            Some(v) => {
                let in_range = match self.upper {
                    core::ops::Bound::Unbounded => true,
                    core::ops::Bound::Included(k) => {
                        self.tree.comparator().compare(v, k) != core::cmp::Ordering::Greater
                    }
                    core::ops::Bound::Excluded(k) => {
                        self.tree.comparator().compare(v, k) == core::cmp::Ordering::Less
                    }
                };
                if in_range {
                    Some(v)
                } else {
                    self.done = true;
                    None
                }
            }
        }
    }
}

impl<T, C: Comparator<T> + Clone, A: RawAllocator + Clone> Clone for BTree<T, C, A> {
    fn clone(&self) -> Self {
        if let Some(root) = self.root {
            unsafe { root.rc_fetch_add(1, Ordering::Release) };
        }
        BTree {
            root: self.root,
            layout: self.layout,
            cmp: self.cmp.clone(),
            alloc: self.alloc.clone(),
            count: self.count,
            height: self.height,
            oom: false,
        }
    }
}

impl<T, C, A: RawAllocator> Drop for BTree<T, C, A> {
    fn drop(&mut self) {
        if let Some(root) = self.root {
            unsafe { release(root, &self.layout, &self.alloc) };
        }
    }
}
