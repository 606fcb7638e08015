// The observable graph node (§3, §4.1, §4.3). `Node<T>` is generic over
// every node kind — source, single-parent operator, merge, combine — the
// kind-specific behavior lives in `Kind<T>` and in the small per-edge
// adapter types defined alongside each operator's constructor. Dispatch
// out of the homogeneous scheduler queue goes through `Scheduled`
// (erased over T entirely, keyed only by rank); dispatch from a parent's
// notification list goes through `Observer<T>` (erased over the
// observer's own downstream type, but still generic in the parent's T).

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::error::Try;
use crate::ids::{next_node_id, next_sub_id, NodeId, Rank, SubId, TxnId};
use crate::transaction::TransactionInner;

/// Homogeneous scheduler-side view of a node: only its rank and its
/// ability to fire, both independent of its output type.
pub(crate) trait Scheduled {
    fn rank(&self) -> Rank;
    fn sync_fire(self: Rc<Self>, txn: &Rc<TransactionInner>);
}

/// A downstream subscriber to a node of output type `T`. Implemented
/// directly by `Node<T>` (used when a child shares its parent's type,
/// e.g. a merge node subscribing to same-typed parents) and by small
/// per-edge adapters that bridge to a differently-typed child.
pub(crate) trait Observer<T> {
    fn notify(&self, value: &Try<T>, txn: &Rc<TransactionInner>);
}

struct ExternalObserver<T> {
    on_next: Box<dyn Fn(&T)>,
    on_error: Option<Box<dyn Fn(&crate::error::Error)>>,
}

impl<T> ExternalObserver<T> {
    fn deliver(&self, value: &Try<T>) {
        match value {
            Ok(v) => (self.on_next)(v),
            Err(e) => match &self.on_error {
                Some(h) => h(e),
                // §7: observers without an error handler are reported to
                // the global sink, once per unhandled observer.
                None => crate::engine::report_unhandled(e),
            },
        }
    }
}

/// Per-node state that changes after construction: observer lists,
/// start/stop bookkeeping, the signal's latched value, and the value
/// computed for the transaction currently in flight.
struct NodeState<T> {
    started: bool,
    external_observers: Vec<(SubId, Rc<ExternalObserver<T>>)>,
    internal_observers: Vec<(SubId, Rc<dyn Observer<T>>)>,
    current: Option<Try<T>>,
    pending_value: Option<Try<T>>,
    pending_txn: Option<TxnId>,
}

impl<T> NodeState<T> {
    fn new() -> Self {
        NodeState {
            started: false,
            external_observers: Vec::new(),
            internal_observers: Vec::new(),
            current: None,
            pending_value: None,
            pending_txn: None,
        }
    }
}

/// The construction-time hooks that make a node's kind concrete:
/// subscribing to parents (and, for signals, computing the initial
/// value) on 0→1, and unsubscribing on 1→0 (§4.3).
pub(crate) struct Lifecycle<T> {
    pub(crate) on_start: Box<dyn Fn(&Rc<Node<T>>)>,
    pub(crate) on_stop: Box<dyn Fn(&Rc<Node<T>>)>,
}

/// Per-transaction firing behavior that differs by node kind (§4.4,
/// §4.5, §9 "generator-like operator code... explicit state machines").
/// Plain covers sources and every single-parent operator: their
/// combinator already ran inside the parent edge's adapter, so by the
/// time the node is dequeued its `pending_value` just needs delivering.
pub(crate) enum Kind<T> {
    Plain,
    Merge(RefCell<VecDeque<Try<T>>>),
    Combine(Rc<dyn crate::combine::Fire<T>>),
    Sample(Rc<dyn crate::sample::Fire<T>>),
}

pub(crate) struct Node<T: 'static> {
    pub(crate) id: NodeId,
    pub(crate) rank: Rank,
    pub(crate) is_signal: bool,
    pub(crate) kind: Kind<T>,
    lifecycle: Lifecycle<T>,
    state: RefCell<NodeState<T>>,
    weak_self: RefCell<Weak<Node<T>>>,
}

impl<T: Clone + 'static> Node<T> {
    pub(crate) fn new_rc(rank: Rank, is_signal: bool, kind: Kind<T>, lifecycle: Lifecycle<T>) -> Rc<Self> {
        let node = Rc::new(Node {
            id: next_node_id(),
            rank,
            is_signal,
            kind,
            lifecycle,
            state: RefCell::new(NodeState::new()),
            weak_self: RefCell::new(Weak::new()),
        });
        *node.weak_self.borrow_mut() = Rc::downgrade(&node);
        node
    }

    pub(crate) fn self_rc(&self) -> Rc<Node<T>> {
        self.weak_self
            .borrow()
            .upgrade()
            .expect("node referenced from within its own callback while being dropped")
    }

    /// Synchronous read of a signal's latched value (§4.5 "read each
    /// parent's current value synchronously", §4.6 sampling). `None`
    /// before the node has ever fired, or if this is a stream.
    pub(crate) fn try_now(&self) -> Option<Try<T>> {
        self.state.borrow().current.clone()
    }

    /// Sets a signal's initial current value (§4.3, §4.5, §4.7),
    /// computed either eagerly right after construction or from an
    /// `on_start` closure on a later (re)start. Must only be called
    /// before the node is externally observable.
    pub(crate) fn set_current_initial(&self, value: Try<T>) {
        self.state.borrow_mut().current = Some(value);
    }

    /// Stashes the value this node will deliver the next time it is
    /// dequeued. Called by parent-edge adapters (and, for Merge, by
    /// `notify` itself) before scheduling.
    pub(crate) fn set_pending(&self, value: Try<T>) {
        self.state.borrow_mut().pending_value = Some(value);
    }

    /// Enqueues this node into `txn`'s pending-observable queue unless
    /// it is already a member (§9 open question: re-enqueue only if
    /// absent; exercised directly by `merge_reentry_path_is_exercised`).
    pub(crate) fn request_schedule(self: &Rc<Self>, txn: &Rc<TransactionInner>) {
        let mut st = self.state.borrow_mut();
        if st.pending_txn == Some(txn.id) {
            return;
        }
        st.pending_txn = Some(txn.id);
        drop(st);
        txn.schedule(self.clone() as Rc<dyn Scheduled>);
    }

    fn deliver(self: &Rc<Self>, value: &Try<T>, txn: &Rc<TransactionInner>) {
        if self.is_signal {
            self.state.borrow_mut().current = Some(value.clone());
        }
        // Defensive copy: a `kill()` mid-notification must not perturb
        // the batch already in flight (§5 cancellation).
        let (externals, internals) = {
            let st = self.state.borrow();
            (st.external_observers.clone(), st.internal_observers.clone())
        };
        for (_, obs) in &externals {
            obs.deliver(value);
        }
        for (_, obs) in &internals {
            obs.notify(value, txn);
        }
    }

    pub(crate) fn add_external_observer(
        self: &Rc<Self>,
        on_next: impl Fn(&T) + 'static,
        on_error: Option<Box<dyn Fn(&crate::error::Error)>>,
    ) -> SubId {
        let id = next_sub_id();
        let observer = Rc::new(ExternalObserver { on_next: Box::new(on_next), on_error });
        let should_start = {
            let mut st = self.state.borrow_mut();
            st.external_observers.push((id, observer.clone()));
            let starting = !st.started;
            if starting {
                st.started = true;
            }
            starting
        };
        if should_start {
            trace!(target: "sluice", rank = self.rank, "node start");
            (self.lifecycle.on_start)(self);
        }
        if self.is_signal {
            if let Some(cur) = self.state.borrow().current.clone() {
                observer.deliver(&cur);
            }
        }
        id
    }

    pub(crate) fn remove_external_observer(self: &Rc<Self>, id: SubId) {
        let should_stop = {
            let mut st = self.state.borrow_mut();
            st.external_observers.retain(|(oid, _)| *oid != id);
            let count = st.external_observers.len() + st.internal_observers.len();
            if count == 0 && st.started {
                st.started = false;
                true
            } else {
                false
            }
        };
        if should_stop {
            trace!(target: "sluice", rank = self.rank, "node stop");
            (self.lifecycle.on_stop)(self);
        }
    }

    pub(crate) fn add_internal_observer(self: &Rc<Self>, obs: Rc<dyn Observer<T>>) -> SubId {
        let id = next_sub_id();
        let should_start = {
            let mut st = self.state.borrow_mut();
            st.internal_observers.push((id, obs));
            let starting = !st.started;
            if starting {
                st.started = true;
            }
            starting
        };
        if should_start {
            trace!(target: "sluice", rank = self.rank, "node start");
            (self.lifecycle.on_start)(self);
        }
        id
    }

    pub(crate) fn remove_internal_observer(self: &Rc<Self>, id: SubId) {
        let should_stop = {
            let mut st = self.state.borrow_mut();
            st.internal_observers.retain(|(oid, _)| *oid != id);
            let count = st.external_observers.len() + st.internal_observers.len();
            if count == 0 && st.started {
                st.started = false;
                true
            } else {
                false
            }
        };
        if should_stop {
            trace!(target: "sluice", rank = self.rank, "node stop");
            (self.lifecycle.on_stop)(self);
        }
    }

}

struct NoOpObserver;
impl<P> Observer<P> for NoOpObserver {
    fn notify(&self, _value: &Try<P>, _txn: &Rc<TransactionInner>) {}
}

/// Subscribes a no-op observer to `parent` purely to keep it started
/// (§4.6: sampled signals must be started so their current value stays
/// live, even though nothing downstream wants their individual events).
pub(crate) fn keep_alive<P: Clone + 'static>(parent: &Rc<Node<P>>) -> SubId {
    parent.add_internal_observer(Rc::new(NoOpObserver))
}

impl<T: Clone + 'static> Scheduled for Node<T> {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn sync_fire(self: Rc<Self>, txn: &Rc<TransactionInner>) {
        self.state.borrow_mut().pending_txn = None;
        match &self.kind {
            Kind::Plain => {
                let value = self.state.borrow_mut().pending_value.take().expect("plain node fired with no pending value");
                self.deliver(&value, txn);
            }
            Kind::Combine(core) => {
                let value = core.compute_and_reset();
                self.deliver(&value, txn);
            }
            Kind::Sample(core) => {
                let value = core.compute_and_reset();
                self.deliver(&value, txn);
            }
            Kind::Merge(queue) => {
                let first = queue.borrow_mut().pop_front().expect("merge node fired with an empty queue");
                self.deliver(&first, txn);
                // §4.4 re-entry rule: every event after the first opens
                // its own follow-up transaction, serializing co-firing
                // merge inputs instead of dropping or glitching them.
                loop {
                    let next = queue.borrow_mut().pop_front();
                    let Some(value) = next else { break };
                    let node = self.clone();
                    crate::transaction::Transaction::new(move |txn2| {
                        node.deliver(&value, txn2);
                    });
                }
            }
        }
    }
}

/// A merge node subscribes to each of its (same-typed) parents directly,
/// using itself as the `Observer<T>` — no adapter needed since no type
/// translation happens on a merge edge.
impl<T: Clone + 'static> Observer<T> for Node<T> {
    fn notify(&self, value: &Try<T>, txn: &Rc<TransactionInner>) {
        match &self.kind {
            Kind::Merge(queue) => {
                queue.borrow_mut().push_back(value.clone());
                self.self_rc().request_schedule(txn);
            }
            _ => unreachable!("Node<T> is only used as an Observer<T> by merge nodes"),
        }
    }
}

/// A subscription handle (§4.1, §5 cancellation): `kill` is idempotent
/// and synchronous, and may cascade an `onStop` if this was the last
/// observer.
pub struct Subscription {
    pub(crate) kill: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl Subscription {
    pub(crate) fn new(kill: impl FnOnce() + 'static) -> Self {
        Subscription { kill: RefCell::new(Some(Box::new(kill))) }
    }

    pub fn kill(&self) {
        if let Some(f) = self.kill.borrow_mut().take() {
            f();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.kill();
    }
}

thread_local! {
    static SOURCE_RANK: Cell<Rank> = Cell::new(1);
}

/// Source nodes pick a small positive rank (§4.1: "source nodes pick a
/// small positive integer, commonly 1"); every source gets the same
/// baseline since they have no parents to derive from.
pub(crate) fn source_rank() -> Rank {
    SOURCE_RANK.with(|c| c.get())
}
