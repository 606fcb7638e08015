// Sample-combine (stream × signals → stream), §4.6: fires only when the
// sampling stream fires, reading each sampled signal synchronously at
// that moment. Binary (one trigger, one sampled signal) for the same
// reason combine is binary; an n-ary `withLatestFrom` over several
// signals is a mechanical generalization, out of scope per spec.md.
//
// The combinator must run when this node's own `sync_fire` is dequeued,
// not inside the trigger's `notify` -- the trigger delivers to every
// internal observer in one synchronous pass, which (when the sampled
// signal shares an ancestor with the trigger) can run *before* that
// signal's own `sync_fire` has updated its latched value. Deferring
// through a `Fire<T>` core (the same shape `combine.rs` uses) is what
// makes the rank guarantee in §4.6 actually hold.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::{catch_combinator, Try};
use crate::ids::SubId;
use crate::node::{Kind, Lifecycle, Node, Observer};
use crate::transaction::TransactionInner;

pub(crate) trait Fire<T> {
    fn compute_and_reset(&self) -> Try<T>;
}

struct SampleCore<Trig, Sig, T> {
    sampled: Rc<Node<Sig>>,
    pending_trigger: RefCell<Option<Try<Trig>>>,
    f: Rc<dyn Fn(&Trig, &Sig) -> T>,
}

impl<Trig: 'static, Sig: Clone + 'static, T: 'static> Fire<T> for SampleCore<Trig, Sig, T> {
    fn compute_and_reset(&self) -> Try<T> {
        let trig = self
            .pending_trigger
            .borrow_mut()
            .take()
            .expect("sample node fired with no pending trigger value");
        match trig {
            Err(e) => Err(e),
            Ok(trig) => match self.sampled.try_now() {
                // The sampled signal is kept alive for as long as this
                // node is started, so it always has a value by the time
                // the trigger can fire.
                None => unreachable!("sampled signal has no value despite being kept alive"),
                Some(Err(e)) => Err(e),
                Some(Ok(sig)) => catch_combinator(|| (self.f)(&trig, &sig)),
            },
        }
    }
}

struct TriggerAdapter<Trig, Sig, T> {
    child: Rc<Node<T>>,
    core: Rc<SampleCore<Trig, Sig, T>>,
}

impl<Trig: Clone + 'static, Sig: Clone + 'static, T: Clone + 'static> Observer<Trig> for TriggerAdapter<Trig, Sig, T> {
    fn notify(&self, value: &Try<Trig>, txn: &Rc<TransactionInner>) {
        *self.core.pending_trigger.borrow_mut() = Some(value.clone());
        self.child.request_schedule(txn);
    }
}

/// `trigger.withLatestFrom(sampled, f)`: emits `f(trigger_value,
/// sampled.now())` each time `trigger` fires. Updates to `sampled` alone
/// never produce an emission (§4.6 contract).
pub(crate) fn sample_combine<Trig, Sig, T>(
    trigger: Rc<Node<Trig>>,
    sampled: Rc<Node<Sig>>,
    f: impl Fn(&Trig, &Sig) -> T + 'static,
) -> Rc<Node<T>>
where
    Trig: Clone + 'static,
    Sig: Clone + 'static,
    T: Clone + 'static,
{
    let rank = trigger.rank.max(sampled.rank) + 1;
    let core = Rc::new(SampleCore { sampled: sampled.clone(), pending_trigger: RefCell::new(None), f: Rc::new(f) });

    let ids: Rc<Cell<Option<(SubId, SubId)>>> = Rc::new(Cell::new(None));
    let (trigger_start, sampled_start, core_start, ids_start) = (trigger.clone(), sampled.clone(), core.clone(), ids.clone());
    let (trigger_stop, sampled_stop, ids_stop) = (trigger, sampled, ids);

    let lifecycle = Lifecycle {
        on_start: Box::new(move |child: &Rc<Node<T>>| {
            let keep_alive_id = crate::node::keep_alive(&sampled_start);
            let adapter = Rc::new(TriggerAdapter { child: child.clone(), core: core_start.clone() });
            let trigger_id = trigger_start.add_internal_observer(adapter);
            ids_start.set(Some((trigger_id, keep_alive_id)));
        }),
        on_stop: Box::new(move |_child| {
            if let Some((trigger_id, keep_alive_id)) = ids_stop.take() {
                trigger_stop.remove_internal_observer(trigger_id);
                sampled_stop.remove_internal_observer(keep_alive_id);
            }
        }),
    };

    Node::new_rc(rank, false, Kind::Sample(core as Rc<dyn Fire<T>>), lifecycle)
}
