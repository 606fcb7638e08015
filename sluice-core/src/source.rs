// External sources (§6). A `Source<T>` wires an in-process observable to
// an external producer: `start` is called when the node transitions
// 0→1 observers (wire up the producer), `stop` when it drops back to 0
// (tear the wiring down). The producer injects values/errors back into
// the graph through a `SourceInjector`, which opens a transaction per
// injection per the cross-transaction policy in §4.2 — `Transaction::new`
// already does the right thing whether or not one is currently running.

use std::rc::{Rc, Weak};

use crate::error::{Error, Try};
use crate::node::{Kind, Lifecycle, Node};
use crate::transaction::Transaction;

/// An external producer a source stream/signal wires up on start and
/// tears down on stop (timers, sockets, DOM events — concrete
/// integrations are out of scope; this is the interface they implement).
pub trait Source<T> {
    fn start(&self, inject: SourceInjector<T>);
    fn stop(&self);
}

/// Handle an external producer uses to push values into the graph.
/// Cheap to clone; injecting after the owning node has been dropped is a
/// silent no-op (§5: "a stream with zero live observers does not...
/// advance its parents" — there is nothing left to advance).
pub struct SourceInjector<T> {
    node: Weak<Node<T>>,
}

impl<T: Clone + 'static> SourceInjector<T> {
    pub fn fire_value(&self, value: T) {
        self.fire(Ok(value));
    }

    pub fn fire_error(&self, error: Error) {
        self.fire(Err(error));
    }

    fn fire(&self, value: Try<T>) {
        let Some(node) = self.node.upgrade() else { return };
        Transaction::new(move |txn| {
            node.set_pending(value);
            node.request_schedule(txn);
        });
    }
}

impl<T> Clone for SourceInjector<T> {
    fn clone(&self) -> Self {
        SourceInjector { node: self.node.clone() }
    }
}

pub(crate) fn from_source<T: Clone + 'static>(source: Rc<dyn Source<T>>, is_signal: bool, rank: crate::ids::Rank) -> Rc<Node<T>> {
    let source_start = source.clone();
    let lifecycle = Lifecycle {
        on_start: Box::new(move |node: &Rc<Node<T>>| {
            let injector = SourceInjector { node: Rc::downgrade(node) };
            source_start.start(injector);
        }),
        on_stop: Box::new(move |_node| {
            source.stop();
        }),
    };
    Node::new_rc(rank, is_signal, Kind::Plain, lifecycle)
}
