// Single-parent operators (§4.8): map, filter, collect, scan, debug.
// Each subscribes to exactly one parent at `parent.rank + 1` and fires
// as soon as that parent does — there is no readiness wait, so the
// combinator runs inside the parent-edge adapter's `notify` rather than
// at `sync_fire` time, and the result is just delivered when dequeued
// (`Kind::Plain`).

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::{catch_combinator, Error, Try};
use crate::ids::SubId;
use crate::node::{Kind, Lifecycle, Node, Observer};
use crate::transaction::TransactionInner;

/// An optional per-kind "compute the current value from the parent"
/// closure (§4.3 "if the node is a signal, computes its initial value").
/// Shared as an `Rc` rather than a `Box` so the constructor can invoke it
/// once, eagerly, right after `Node::new_rc` -- before anything has
/// subscribed -- and `single_parent_lifecycle` can invoke the very same
/// closure again on every later (re)start, without duplicating the
/// per-operator initial-value logic in two places (§3 "Signal currency":
/// `now()`/`try_now()` must return a value even for a never-started
/// derived signal, not only after the node's first observer).
pub(crate) type Initial<A, T> = Rc<dyn Fn(&Rc<Node<A>>, &Rc<Node<T>>)>;

fn single_parent_lifecycle<A, T>(
    parent: Rc<Node<A>>,
    adapter_factory: impl Fn(Rc<Node<T>>) -> Rc<dyn Observer<A>> + 'static,
    initial: Option<Initial<A, T>>,
) -> Lifecycle<T>
where
    A: Clone + 'static,
    T: Clone + 'static,
{
    let sub_id: Rc<Cell<Option<SubId>>> = Rc::new(Cell::new(None));
    let (parent_start, id_start) = (parent.clone(), sub_id.clone());
    let (parent_stop, id_stop) = (parent.clone(), sub_id.clone());

    Lifecycle {
        on_start: Box::new(move |child: &Rc<Node<T>>| {
            let adapter = adapter_factory(child.clone());
            let id = parent_start.add_internal_observer(adapter);
            id_start.set(Some(id));
            if let Some(initial) = &initial {
                initial(&parent_start, child);
            }
        }),
        on_stop: Box::new(move |_child| {
            if let Some(id) = id_stop.take() {
                parent_stop.remove_internal_observer(id);
            }
        }),
    }
}

struct MapAdapter<A, T> {
    child: Rc<Node<T>>,
    f: Rc<dyn Fn(&A) -> T>,
}

impl<A: Clone + 'static, T: Clone + 'static> Observer<A> for MapAdapter<A, T> {
    fn notify(&self, value: &Try<A>, txn: &Rc<TransactionInner>) {
        let out = match value {
            Ok(a) => catch_combinator(|| (self.f)(a)),
            Err(e) => Err(e.clone()),
        };
        self.child.set_pending(out);
        self.child.request_schedule(txn);
    }
}

pub(crate) fn map<A, T>(parent: Rc<Node<A>>, f: impl Fn(&A) -> T + 'static, is_signal: bool) -> Rc<Node<T>>
where
    A: Clone + 'static,
    T: Clone + 'static,
{
    let rank = parent.rank + 1;
    let f: Rc<dyn Fn(&A) -> T> = Rc::new(f);
    let f_initial = f.clone();
    let initial: Option<Initial<A, T>> = if is_signal {
        Some(Rc::new(move |parent: &Rc<Node<A>>, child: &Rc<Node<T>>| {
            if let Some(cur) = parent.try_now() {
                let out = match &cur {
                    Ok(a) => catch_combinator(|| (f_initial)(a)),
                    Err(e) => Err(e.clone()),
                };
                child.set_current_initial(out);
            }
        }))
    } else {
        None
    };
    let lifecycle = single_parent_lifecycle(
        parent.clone(),
        move |child| Rc::new(MapAdapter { child, f: f.clone() }) as Rc<dyn Observer<A>>,
        initial.clone(),
    );
    let node = Node::new_rc(rank, is_signal, Kind::Plain, lifecycle);
    // §3 "Signal currency": computed here too so `now()` is meaningful
    // before any subscriber ever starts this node, not only afterward.
    if let Some(initial) = &initial {
        initial(&parent, &node);
    }
    node
}

struct FilterAdapter<A> {
    child: Rc<Node<A>>,
    pred: Rc<dyn Fn(&A) -> bool>,
}

impl<A: Clone + 'static> Observer<A> for FilterAdapter<A> {
    fn notify(&self, value: &Try<A>, txn: &Rc<TransactionInner>) {
        match value {
            Ok(a) => match catch_combinator(|| (self.pred)(a)) {
                Ok(true) => {
                    self.child.set_pending(Ok(a.clone()));
                    self.child.request_schedule(txn);
                }
                Ok(false) => {}
                Err(e) => {
                    self.child.set_pending(Err(e));
                    self.child.request_schedule(txn);
                }
            },
            Err(e) => {
                self.child.set_pending(Err(e.clone()));
                self.child.request_schedule(txn);
            }
        }
    }
}

pub(crate) fn filter<A>(parent: Rc<Node<A>>, pred: impl Fn(&A) -> bool + 'static, is_signal: bool) -> Rc<Node<A>>
where
    A: Clone + 'static,
{
    let rank = parent.rank + 1;
    let pred: Rc<dyn Fn(&A) -> bool> = Rc::new(pred);
    let pred_initial = pred.clone();
    // A filtered-out initial value leaves the signal with no current
    // value until the first value that passes; `try_now` on such a
    // signal legitimately returns `None` until then.
    let initial: Option<Initial<A, A>> = if is_signal {
        Some(Rc::new(move |parent: &Rc<Node<A>>, child: &Rc<Node<A>>| {
            if let Some(cur) = parent.try_now() {
                match &cur {
                    Ok(a) => match catch_combinator(|| (pred_initial)(a)) {
                        Ok(true) => child.set_current_initial(cur),
                        Ok(false) => {}
                        Err(e) => child.set_current_initial(Err(e)),
                    },
                    Err(_) => child.set_current_initial(cur),
                }
            }
        }))
    } else {
        None
    };
    let lifecycle = single_parent_lifecycle(
        parent.clone(),
        move |child| Rc::new(FilterAdapter { child, pred: pred.clone() }) as Rc<dyn Observer<A>>,
        initial.clone(),
    );
    let node = Node::new_rc(rank, is_signal, Kind::Plain, lifecycle);
    if let Some(initial) = &initial {
        initial(&parent, &node);
    }
    node
}

struct CollectAdapter<A, T> {
    child: Rc<Node<T>>,
    f: Rc<dyn Fn(&A) -> Option<T>>,
}

impl<A: Clone + 'static, T: Clone + 'static> Observer<A> for CollectAdapter<A, T> {
    fn notify(&self, value: &Try<A>, txn: &Rc<TransactionInner>) {
        match value {
            Ok(a) => match catch_combinator(|| (self.f)(a)) {
                Ok(Some(b)) => {
                    self.child.set_pending(Ok(b));
                    self.child.request_schedule(txn);
                }
                Ok(None) => {}
                Err(e) => {
                    self.child.set_pending(Err(e));
                    self.child.request_schedule(txn);
                }
            },
            Err(e) => {
                self.child.set_pending(Err(e.clone()));
                self.child.request_schedule(txn);
            }
        }
    }
}

/// Partial-function narrowing: emits `b` when `f` returns `Some(b)`,
/// emits nothing on `None`. Distinct from `filter`, which preserves the
/// original value (see the Open Question resolution in DESIGN.md).
pub(crate) fn collect<A, T>(parent: Rc<Node<A>>, f: impl Fn(&A) -> Option<T> + 'static, is_signal: bool) -> Rc<Node<T>>
where
    A: Clone + 'static,
    T: Clone + 'static,
{
    let rank = parent.rank + 1;
    let f: Rc<dyn Fn(&A) -> Option<T>> = Rc::new(f);
    let f_initial = f.clone();
    let initial: Option<Initial<A, T>> = if is_signal {
        Some(Rc::new(move |parent: &Rc<Node<A>>, child: &Rc<Node<T>>| {
            if let Some(cur) = parent.try_now() {
                match &cur {
                    Ok(a) => match catch_combinator(|| (f_initial)(a)) {
                        Ok(Some(b)) => child.set_current_initial(Ok(b)),
                        Ok(None) => {}
                        Err(e) => child.set_current_initial(Err(e)),
                    },
                    Err(e) => child.set_current_initial(Err(e.clone())),
                }
            }
        }))
    } else {
        None
    };
    let lifecycle = single_parent_lifecycle(
        parent.clone(),
        move |child| Rc::new(CollectAdapter { child, f: f.clone() }) as Rc<dyn Observer<A>>,
        initial.clone(),
    );
    let node = Node::new_rc(rank, is_signal, Kind::Plain, lifecycle);
    if let Some(initial) = &initial {
        initial(&parent, &node);
    }
    node
}

struct ScanAdapter<A, T> {
    child: Rc<Node<T>>,
    acc: RefCell<T>,
    f: Rc<dyn Fn(&T, &A) -> T>,
}

impl<A: Clone + 'static, T: Clone + 'static> Observer<A> for ScanAdapter<A, T> {
    fn notify(&self, value: &Try<A>, txn: &Rc<TransactionInner>) {
        let out = match value {
            Ok(a) => {
                let result = {
                    let acc = self.acc.borrow();
                    catch_combinator(|| (self.f)(&acc, a))
                };
                if let Ok(new_acc) = &result {
                    *self.acc.borrow_mut() = new_acc.clone();
                }
                result
            }
            Err(e) => Err(e.clone()),
        };
        self.child.set_pending(out);
        self.child.request_schedule(txn);
    }
}

/// Signal-only fold over a parent stream (§4.8): current value is the
/// accumulator, seeded at construction.
pub(crate) fn scan<A, T>(parent: Rc<Node<A>>, seed: T, f: impl Fn(&T, &A) -> T + 'static) -> Rc<Node<T>>
where
    A: Clone + 'static,
    T: Clone + 'static,
{
    let rank = parent.rank + 1;
    let f: Rc<dyn Fn(&T, &A) -> T> = Rc::new(f);
    let seed_for_initial = seed.clone();

    let sub_id: Rc<Cell<Option<SubId>>> = Rc::new(Cell::new(None));
    let (parent_start, id_start) = (parent.clone(), sub_id.clone());
    let (parent_stop, id_stop) = (parent, sub_id);

    let lifecycle = Lifecycle {
        on_start: Box::new(move |child: &Rc<Node<T>>| {
            let adapter = Rc::new(ScanAdapter { child: child.clone(), acc: RefCell::new(seed_for_initial.clone()), f: f.clone() });
            let id = parent_start.add_internal_observer(adapter);
            id_start.set(Some(id));
            child.set_current_initial(Ok(seed_for_initial.clone()));
        }),
        on_stop: Box::new(move |_child| {
            if let Some(id) = id_stop.take() {
                parent_stop.remove_internal_observer(id);
            }
        }),
    };

    let node = Node::new_rc(rank, true, Kind::Plain, lifecycle);
    // §3 "Signal currency": the accumulator starts at `seed` before any
    // observer exists, so `now()` must reflect that immediately.
    node.set_current_initial(Ok(seed));
    node
}

struct DebugAdapter<T> {
    child: Rc<Node<T>>,
    on_value: Option<Rc<dyn Fn(&Try<T>)>>,
}

impl<T: Clone + 'static> Observer<T> for DebugAdapter<T> {
    fn notify(&self, value: &Try<T>, txn: &Rc<TransactionInner>) {
        if let Some(cb) = &self.on_value {
            report_panics(|| cb(value));
        }
        self.child.set_pending(value.clone());
        self.child.request_schedule(txn);
    }
}

fn report_panics(f: impl FnOnce()) {
    if let Err(payload) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
        let msg = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "debug callback panicked".to_string());
        crate::engine::report_unhandled(&Error::unhandled_msg(msg));
    }
}

/// Identity passthrough with lifecycle callbacks routed to the
/// unhandled-error sink on panic, never downstream (§4.8, §7).
pub(crate) fn debug<T>(
    parent: Rc<Node<T>>,
    on_value: Option<impl Fn(&Try<T>) + 'static>,
    on_start: Option<impl Fn() + 'static>,
    on_stop: Option<impl Fn() + 'static>,
    is_signal: bool,
) -> Rc<Node<T>>
where
    T: Clone + 'static,
{
    let rank = parent.rank + 1;
    let on_value: Option<Rc<dyn Fn(&Try<T>)>> = on_value.map(|f| Rc::new(f) as Rc<dyn Fn(&Try<T>)>);
    let on_value_initial = on_value.clone();

    let sub_id: Rc<Cell<Option<SubId>>> = Rc::new(Cell::new(None));
    let (parent_start, id_start) = (parent.clone(), sub_id.clone());
    let (parent_stop, id_stop) = (parent.clone(), sub_id);

    let lifecycle = Lifecycle {
        on_start: Box::new(move |child: &Rc<Node<T>>| {
            let adapter = Rc::new(DebugAdapter { child: child.clone(), on_value: on_value.clone() });
            let id = parent_start.add_internal_observer(adapter);
            id_start.set(Some(id));
            if let Some(cb) = &on_start {
                report_panics(|| cb());
            }
            if child.is_signal {
                if let Some(cur) = parent_start.try_now() {
                    if let Some(cb) = &on_value_initial {
                        report_panics(|| cb(&cur));
                    }
                    child.set_current_initial(cur);
                }
            }
        }),
        on_stop: Box::new(move |_child| {
            if let Some(id) = id_stop.take() {
                parent_stop.remove_internal_observer(id);
            }
            if let Some(cb) = &on_stop {
                report_panics(|| cb());
            }
        }),
    };

    let node = Node::new_rc(rank, is_signal, Kind::Plain, lifecycle);
    // §3 "Signal currency": computed eagerly so `now()` works before any
    // observer has started this node. Unlike the `on_start` case, the
    // `on_value` callback does NOT fire here -- it is a side effect tied
    // to the node's start, not to its construction, and must stay silent
    // until a real subscriber exists (0 starts at construction time).
    if is_signal {
        if let Some(cur) = parent.try_now() {
            node.set_current_initial(cur);
        }
    }
    node
}
