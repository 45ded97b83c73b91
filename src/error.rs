use core::fmt;

/// Error kinds a mutating operation can report.
///
/// `NotFound` is deliberately absent: `get`/`delete`/`pop_*` on an
/// absent key return `None`, which is not an error.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BTreeError {
    /// An allocation failed on a mutation path, or an item clone
    /// failed. Sticky: observe via [`crate::tree::BTree::oom`] until
    /// the next successful mutation.
    OutOfMemory,
    /// A precondition was violated at construction time. Named for
    /// parity with spec §7's third error kind (a null comparator or a
    /// zero element size in the original C API); this typed port has
    /// no live call site for it, since a `Comparator<T>` can't be null
    /// and a zero-sized `T` is an ordinary, well-supported ZST rather
    /// than a degenerate case, and `max_items` is clamped rather than
    /// rejected (spec §3). Kept in the enum so callers matching on
    /// `BTreeError` exhaustively still compile if a future allocator
    /// or layout precondition needs to report through it.
    InvalidArgument(&'static str),
}

impl fmt::Display for BTreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BTreeError::OutOfMemory => write!(f, "allocation failed"),
            BTreeError::InvalidArgument(why) => write!(f, "invalid argument: {why}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for BTreeError {}
