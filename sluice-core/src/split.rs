// Splittable capability (§6): a container `M<_>` with `map` and `empty`,
// used by the `split` operator (its keyed-memoization layer is out of
// scope per spec.md; only the capability it relies on is defined here).

use std::collections::{BTreeSet, LinkedList};

// `B: Ord + Clone` sits on the trait itself rather than per-impl: every
// instance's `Mapped<B>` must itself implement `Splittable<B>`, and the
// `BTreeSet`/`im::Vector` instances only do that when `B: Ord`/`B:
// Clone` respectively. An impl cannot add bounds the trait doesn't
// already require, so the common bound has to live here even though
// `Vec`, `Option`, `[A; 4]`, `LinkedList` don't need it themselves.
pub trait Splittable<A> {
    type Mapped<B: Ord + Clone>: Splittable<B>;

    fn map<B: Ord + Clone>(&self, f: impl FnMut(&A) -> B) -> Self::Mapped<B>;
    fn empty() -> Self;
}

impl<A> Splittable<A> for Vec<A> {
    type Mapped<B: Ord + Clone> = Vec<B>;

    fn map<B: Ord + Clone>(&self, mut f: impl FnMut(&A) -> B) -> Vec<B> {
        self.iter().map(|a| f(a)).collect()
    }

    fn empty() -> Self {
        Vec::new()
    }
}

impl<A> Splittable<A> for Option<A> {
    type Mapped<B: Ord + Clone> = Option<B>;

    fn map<B: Ord + Clone>(&self, mut f: impl FnMut(&A) -> B) -> Option<B> {
        self.as_ref().map(|a| f(a))
    }

    fn empty() -> Self {
        None
    }
}

impl<A: Ord> Splittable<A> for BTreeSet<A> {
    type Mapped<B: Ord + Clone> = BTreeSet<B>;

    fn map<B: Ord + Clone>(&self, mut f: impl FnMut(&A) -> B) -> BTreeSet<B> {
        self.iter().map(|a| f(a)).collect()
    }

    fn empty() -> Self {
        BTreeSet::new()
    }
}

// A representative fixed arity; other sizes follow the same pattern and
// need no separate semantics (mirrors the N-ary tuple combinator
// Non-goal: this is the array analogue).
impl<A> Splittable<A> for [A; 4] {
    type Mapped<B: Ord + Clone> = [B; 4];

    fn map<B: Ord + Clone>(&self, mut f: impl FnMut(&A) -> B) -> [B; 4] {
        std::array::from_fn(|i| f(&self[i]))
    }

    fn empty() -> Self {
        panic!("a fixed-size array has no empty value")
    }
}

impl<A> Splittable<A> for LinkedList<A> {
    type Mapped<B: Ord + Clone> = LinkedList<B>;

    fn map<B: Ord + Clone>(&self, mut f: impl FnMut(&A) -> B) -> LinkedList<B> {
        self.iter().map(|a| f(a)).collect()
    }

    fn empty() -> Self {
        LinkedList::new()
    }
}

impl<A: Clone> Splittable<A> for im::Vector<A> {
    type Mapped<B: Ord + Clone> = im::Vector<B>;

    fn map<B: Ord + Clone>(&self, mut f: impl FnMut(&A) -> B) -> im::Vector<B> {
        self.iter().map(|a| f(a)).collect()
    }

    fn empty() -> Self {
        im::Vector::new()
    }
}
