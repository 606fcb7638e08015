// Signal: the memory (continuous) observable variant (§3, §4.7).

use std::rc::Rc;

use crate::error::{Error, Try};
use crate::node::{Kind, Lifecycle, Node, Subscription};
use crate::source::Source;
use crate::stream::Stream;
use crate::transaction::Transaction;

/// A continuous observable: holds a latched current value, replayed
/// synchronously to any newly attached observer (§4.7).
#[derive(Clone)]
pub struct Signal<T: Clone + 'static> {
    pub(crate) node: Rc<Node<T>>,
}

impl<T: Clone + 'static> Signal<T> {
    pub(crate) fn from_node(node: Rc<Node<T>>) -> Self {
        debug_assert!(node.is_signal);
        Signal { node }
    }

    /// Wraps an external producer as a signal source. `initial` is the
    /// value `now()` returns before the producer has fired anything.
    pub fn source(source: impl Source<T> + 'static, initial: Try<T>) -> Self {
        let node = crate::source::from_source(Rc::new(source), true, crate::node::source_rank());
        node.set_current_initial(initial);
        Signal { node }
    }

    /// Synchronous read of the current value (§4.7 `tryNow`).
    pub fn now(&self) -> Option<Try<T>> {
        self.node.try_now()
    }

    pub fn map<B: Clone + 'static>(&self, f: impl Fn(&T) -> B + 'static) -> Signal<B> {
        Signal { node: crate::operators::map(self.node.clone(), f, true) }
    }

    pub fn filter(&self, pred: impl Fn(&T) -> bool + 'static) -> Signal<T> {
        Signal { node: crate::operators::filter(self.node.clone(), pred, true) }
    }

    pub fn collect<B: Clone + 'static>(&self, f: impl Fn(&T) -> Option<B> + 'static) -> Signal<B> {
        Signal { node: crate::operators::collect(self.node.clone(), f, true) }
    }

    pub fn debug(
        &self,
        on_value: Option<impl Fn(&Try<T>) + 'static>,
        on_start: Option<impl Fn() + 'static>,
        on_stop: Option<impl Fn() + 'static>,
    ) -> Signal<T> {
        Signal { node: crate::operators::debug(self.node.clone(), on_value, on_start, on_stop, true) }
    }

    pub fn combine<B: Clone + 'static, O: Clone + 'static>(
        &self,
        other: &Signal<B>,
        f: impl Fn(&T, &B) -> O + 'static,
    ) -> Signal<O> {
        Signal { node: crate::combine::combine(self.node.clone(), other.node.clone(), f, true) }
    }

    /// Samples `self` whenever `trigger` fires; updates to `self` alone
    /// never produce an emission (§4.6).
    pub fn sampled_by<Trig: Clone + 'static, O: Clone + 'static>(
        &self,
        trigger: &Stream<Trig>,
        f: impl Fn(&Trig, &T) -> O + 'static,
    ) -> Stream<O> {
        Stream::from_node(crate::sample::sample_combine(trigger.node.clone(), self.node.clone(), f))
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

/// A manually-settable signal (§8 S1 `Var(1)`). Not wired to any external
/// producer — `set` is the producer, opening a transaction per update
/// exactly like a `SourceInjector` would.
pub struct Var<T: Clone + 'static> {
    node: Rc<Node<T>>,
}

impl<T: Clone + 'static> Var<T> {
    pub fn new(initial: T) -> Self {
        let lifecycle = Lifecycle { on_start: Box::new(|_| {}), on_stop: Box::new(|_| {}) };
        let node = Node::new_rc(crate::node::source_rank(), true, Kind::Plain, lifecycle);
        node.set_current_initial(Ok(initial));
        Var { node }
    }

    pub fn set(&self, value: T) {
        self.set_try(Ok(value));
    }

    pub fn set_error(&self, error: Error) {
        self.set_try(Err(error));
    }

    fn set_try(&self, value: Try<T>) {
        let node = self.node.clone();
        Transaction::new(move |txn| {
            node.set_pending(value);
            node.request_schedule(txn);
        });
    }

    pub fn signal(&self) -> Signal<T> {
        Signal { node: self.node.clone() }
    }
}
