//! Comparator contract: `compare(a, b)` must be a total order —
//! antisymmetric, transitive, and stable across the lifetime of the
//! tree.
//!
//! Expressed as a trait rather than a function pointer + userdata pair
//! so that any captured state lives in `Self` and the comparison is a
//! monomorphized call, not an indirect one.

use core::cmp::Ordering;

/// A total order over `T`. Implementations must be antisymmetric,
/// transitive, and must not change their answer for a fixed pair of
/// items across the lifetime of a tree built with them.
pub trait Comparator<T>: Clone {
    fn compare(&self, a: &T, b: &T) -> Ordering;
}

impl<T, F> Comparator<T> for F
where
    F: Fn(&T, &T) -> Ordering + Clone,
{
    fn compare(&self, a: &T, b: &T) -> Ordering {
        self(a, b)
    }
}

/// Adapter for the common case of ordering by a plain function or
/// closure instead of a hand-written [`Comparator`] impl — e.g.
/// `FnComparator::new(|a: &Item, b: &Item| a.id.cmp(&b.id))`.
#[derive(Clone)]
pub struct FnComparator<F> {
    f: F,
}

impl<F> FnComparator<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<T, F> Comparator<T> for FnComparator<F>
where
    F: Fn(&T, &T) -> Ordering + Clone,
{
    fn compare(&self, a: &T, b: &T) -> Ordering {
        (self.f)(a, b)
    }
}
