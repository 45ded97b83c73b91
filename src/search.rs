//! Unhinted and hinted search over one node's items.

use core::cmp::Ordering;

use crate::cmp::Comparator;
use crate::layout::NodeLayout;
use crate::node::{self, NodeRef};

/// Opaque per-depth search accelerator. Index `depth` (clamped to
/// `0..8`) caches the last-observed slot for that tree depth; beyond
/// depth 8 every search falls back to plain bisection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Hint(pub(crate) [u8; 8]);

impl Hint {
    pub const MAX_HINTED_DEPTH: usize = 8;

    pub fn new() -> Self {
        Hint([0; 8])
    }
}

#[inline]
unsafe fn bisect<T, C: Comparator<T>>(
    node: NodeRef<T>,
    layout: &NodeLayout,
    cmp: &C,
    key: &T,
    mut lo: usize,
    mut hi: usize,
) -> (bool, usize) {
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        match cmp.compare(node::get(node, layout, mid), key) {
            Ordering::Less => lo = mid + 1,
            Ordering::Greater => hi = mid,
            Ordering::Equal => return (true, mid),
        }
    }
    (false, lo)
}

/// Plain binary search over all `n` items. Returns `(found, index)`:
/// on a hit, `index` is the matching slot; on a miss, `index` is the
/// slot the key would occupy if inserted.
pub(crate) unsafe fn search_unhinted<T, C: Comparator<T>>(
    node: NodeRef<T>,
    layout: &NodeLayout,
    cmp: &C,
    key: &T,
) -> (bool, usize) {
    bisect(node, layout, cmp, key, 0, node.nitems())
}

/// Hint-guided search: probe `hint[depth]` first; on a miss, bisect
/// only the half the probe ruled out, then write the winning index
/// back into `hint[depth]` (saturated to `u8`).
pub(crate) unsafe fn search_hinted<T, C: Comparator<T>>(
    node: NodeRef<T>,
    layout: &NodeLayout,
    cmp: &C,
    key: &T,
    hint: &mut Hint,
    depth: usize,
) -> (bool, usize) {
    let n = node.nitems();
    if n == 0 {
        return (false, 0);
    }
    if depth >= Hint::MAX_HINTED_DEPTH {
        return search_unhinted(node, layout, cmp, key);
    }

    let probe = (hint.0[depth] as usize).min(n - 1);
    let result = match cmp.compare(node::get(node, layout, probe), key) {
        Ordering::Equal => (true, probe),
        Ordering::Less => bisect(node, layout, cmp, key, probe + 1, n),
        Ordering::Greater => bisect(node, layout, cmp, key, 0, probe),
    };
    hint.0[depth] = result.1.min(u8::MAX as usize) as u8;
    result
}
