// Stream: the discrete (no current value) observable variant (§3, §4.4,
// §4.8).

use std::rc::Rc;

use crate::error::{Error, Try};
use crate::node::{Node, Subscription};
use crate::signal::Signal;
use crate::source::Source;

/// A discrete observable with no current value: nothing replays on
/// subscribe, and errors are transient rather than latched.
#[derive(Clone)]
pub struct Stream<T: Clone + 'static> {
    pub(crate) node: Rc<Node<T>>,
}

impl<T: Clone + 'static> Stream<T> {
    pub(crate) fn from_node(node: Rc<Node<T>>) -> Self {
        debug_assert!(!node.is_signal);
        Stream { node }
    }

    /// Wraps an external producer as a stream source (§6).
    pub fn source(source: impl Source<T> + 'static) -> Self {
        let node = crate::source::from_source(Rc::new(source), false, crate::node::source_rank());
        Stream { node }
    }

    pub fn map<B: Clone + 'static>(&self, f: impl Fn(&T) -> B + 'static) -> Stream<B> {
        Stream { node: crate::operators::map(self.node.clone(), f, false) }
    }

    pub fn filter(&self, pred: impl Fn(&T) -> bool + 'static) -> Stream<T> {
        Stream { node: crate::operators::filter(self.node.clone(), pred, false) }
    }

    /// Partial-function narrowing: emits `b` where `f` returns
    /// `Some(b)`, emits nothing on `None` (see DESIGN.md: resolved
    /// Open Question on `collect`).
    pub fn collect<B: Clone + 'static>(&self, f: impl Fn(&T) -> Option<B> + 'static) -> Stream<B> {
        Stream { node: crate::operators::collect(self.node.clone(), f, false) }
    }

    pub fn debug(
        &self,
        on_value: Option<impl Fn(&Try<T>) + 'static>,
        on_start: Option<impl Fn() + 'static>,
        on_stop: Option<impl Fn() + 'static>,
    ) -> Stream<T> {
        Stream { node: crate::operators::debug(self.node.clone(), on_value, on_start, on_stop, false) }
    }

    /// Signal fold over this stream, seeded at construction (§4.8).
    pub fn scan<B: Clone + 'static>(&self, seed: B, f: impl Fn(&B, &T) -> B + 'static) -> Signal<B> {
        Signal::from_node(crate::operators::scan(self.node.clone(), seed, f))
    }

    /// Union of same-typed parent streams; co-firing parents are
    /// serialized across follow-up transactions, never dropped (§4.4).
    pub fn merge(streams: impl IntoIterator<Item = Stream<T>>) -> Stream<T> {
        let nodes = streams.into_iter().map(|s| s.node).collect();
        Stream { node: crate::merge::merge(nodes) }
    }

    /// `CombineStream`: fires once per transaction in which both this
    /// stream and `other` have fired (§4.5).
    pub fn combine<B: Clone + 'static, O: Clone + 'static>(&self, other: &Stream<B>, f: impl Fn(&T, &B) -> O + 'static) -> Stream<O> {
        Stream { node: crate::combine::combine(self.node.clone(), other.node.clone(), f, false) }
    }

    /// `withLatestFrom`: samples `signal` each time this stream fires
    /// (§4.6).
    pub fn with_latest_from<S: Clone + 'static, O: Clone + 'static>(
        &self,
        signal: &Signal<S>,
        f: impl Fn(&T, &S) -> O + 'static,
    ) -> Stream<O> {
        Stream { node: crate::sample::sample_combine(self.node.clone(), signal.node.clone(), f) }
    }

    pub fn subscribe(&self, on_next: impl Fn(&T) + 'static) -> Subscription {
        let node = self.node.clone();
        let id = node.add_external_observer(on_next, None);
        Subscription::new(move || node.remove_external_observer(id))
    }

    pub fn subscribe_full(&self, on_next: impl Fn(&T) + 'static, on_error: impl Fn(&Error) + 'static) -> Subscription {
        let node = self.node.clone();
        let id = node.add_external_observer(on_next, Some(Box::new(on_error)));
        Subscription::new(move || node.remove_external_observer(id))
    }
}
