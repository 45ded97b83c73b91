//! Shared helpers for the integration tests: build a tree with a
//! fixed fan-out, collect its contents in order, and assert its
//! structural invariants, so individual test files stay focused on
//! behavior.

use std::cell::Cell;
use std::cmp::Ordering;

use ordbtree::{BTree, FnComparator, RawAllocator};

pub type CmpFn = fn(&i64, &i64) -> Ordering;
pub type IntTree = BTree<i64, FnComparator<CmpFn>>;

pub fn cmp_i64(a: &i64, b: &i64) -> Ordering {
    a.cmp(b)
}

/// A tree over `i64` ordered by value, with an explicit fan-out.
pub fn new_tree(max_items: usize) -> IntTree {
    BTree::with_max_items(FnComparator::new(cmp_i64 as CmpFn), max_items)
}

pub fn collect_ascending(tree: &IntTree) -> Vec<i64> {
    let mut out = Vec::new();
    tree.ascend(None, |item| {
        out.push(*item);
        true
    });
    out
}

pub fn collect_descending(tree: &IntTree) -> Vec<i64> {
    let mut out = Vec::new();
    tree.descend(None, |item| {
        out.push(*item);
        true
    });
    out
}

/// Asserts the tree's structural invariants hold, with the violation
/// message (if any) included in the panic so a failing property test
/// points straight at the broken rule.
#[track_caller]
pub fn assert_invariants(tree: &IntTree, context: &str) {
    if let Err(reason) = tree.check_invariants_detailed() {
        panic!("invariant violation in {context}: {reason}");
    }
}

/// A [`RawAllocator`] that fails the `n`th allocation onward, letting
/// tests exercise out-of-memory discipline without relying on
/// actually exhausting system memory.
pub struct FailAfter {
    remaining: Cell<usize>,
}

impl FailAfter {
    pub fn new(n: usize) -> Self {
        FailAfter {
            remaining: Cell::new(n),
        }
    }
}

impl RawAllocator for FailAfter {
    fn alloc(&self, layout: std::alloc::Layout) -> Option<std::ptr::NonNull<u8>> {
        let remaining = self.remaining.get();
        if remaining == 0 {
            return None;
        }
        self.remaining.set(remaining - 1);
        if layout.size() == 0 {
            return std::ptr::NonNull::new(layout.align() as *mut u8);
        }
        let p = unsafe { std::alloc::alloc(layout) };
        std::ptr::NonNull::new(p)
    }

    unsafe fn dealloc(&self, ptr: std::ptr::NonNull<u8>, layout: std::alloc::Layout) {
        if layout.size() == 0 {
            return;
        }
        std::alloc::dealloc(ptr.as_ptr(), layout);
    }
}
