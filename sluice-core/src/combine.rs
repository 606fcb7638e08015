// Combine (signal × signal → signal) and CombineStream (stream × stream →
// stream), §4.5. Binary only — N-ary tuple codegen is an explicit
// Non-goal, mechanical variants of this. The "expected vs received"
// ready-check collapses to a 2-bit mask since there are always exactly
// two parents.
//
// Signal combine and CombineStream have genuinely different readiness
// rules, not just different initial-value handling: a signal combine
// fires whenever *either* parent delivers a fresh value, pairing it
// with the other parent's latest cached value (both are always present
// once the node has started); a CombineStream has no such fallback and
// must wait for *both* parents to have fired in the same transaction,
// or it never fires at all for that transaction. The received bitset is
// reset at the start of each new transaction so a stream parent's lone
// firing (leaving the node not-ready) never leaks into the next one.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use sluice_base::Bitmap256;

use crate::error::{catch_combinator, Try};
use crate::ids::{SubId, TxnId};
use crate::node::{Kind, Lifecycle, Node, Observer};
use crate::transaction::TransactionInner;

const SLOT_A: u8 = 0;
const SLOT_B: u8 = 1;

/// Erases a combine node's per-parent, differently-typed state (`A`,
/// `B`) behind its own output type `T`, so `Kind::Combine` can hold it
/// as `Rc<dyn Fire<T>>` without `Node<T>` ever naming `A`/`B` (§9
/// "generator-like operator code... explicit state machines").
pub(crate) trait Fire<T> {
    fn compute_and_reset(&self) -> Try<T>;
}

struct CombineCore<A, B, T> {
    latest_a: RefCell<Option<Try<A>>>,
    latest_b: RefCell<Option<Try<B>>>,
    received: RefCell<Bitmap256>,
    last_txn: Cell<Option<TxnId>>,
    /// true for CombineStream (both parents must fire in T), false for
    /// signal Combine (either parent firing is enough).
    requires_both: bool,
    f: Box<dyn Fn(&A, &B) -> T>,
}

impl<A, B, T> CombineCore<A, B, T> {
    fn begin_txn_if_new(&self, txn_id: TxnId) {
        if self.last_txn.get() != Some(txn_id) {
            self.received.borrow_mut().clear_all();
            self.last_txn.set(Some(txn_id));
        }
    }

    /// Seeds the per-parent cache from each parent's current value at
    /// start, without marking either as "received this transaction" --
    /// only the signal variant calls this (§4.5 "signal combine initial
    /// value"), so a later lone-parent update has something to pair
    /// with.
    fn seed(&self, a: Try<A>, b: Try<B>) {
        *self.latest_a.borrow_mut() = Some(a);
        *self.latest_b.borrow_mut() = Some(b);
    }

    /// Records a fresh value from parent A and reports whether the node
    /// is now ready to fire.
    fn set_a(&self, v: Try<A>, txn_id: TxnId) -> bool {
        self.begin_txn_if_new(txn_id);
        *self.latest_a.borrow_mut() = Some(v);
        self.received.borrow_mut().set(SLOT_A, true);
        self.ready()
    }

    fn set_b(&self, v: Try<B>, txn_id: TxnId) -> bool {
        self.begin_txn_if_new(txn_id);
        *self.latest_b.borrow_mut() = Some(v);
        self.received.borrow_mut().set(SLOT_B, true);
        self.ready()
    }

    fn ready(&self) -> bool {
        let r = self.received.borrow();
        if self.requires_both {
            r.get(SLOT_A) && r.get(SLOT_B)
        } else {
            r.get(SLOT_A) || r.get(SLOT_B)
        }
    }
}

impl<A: 'static, B: 'static, T: 'static> Fire<T> for CombineCore<A, B, T> {
    fn compute_and_reset(&self) -> Try<T> {
        let a = self.latest_a.borrow();
        let b = self.latest_b.borrow();
        let a = a.as_ref().expect("combine fired before parent A was ready");
        let b = b.as_ref().expect("combine fired before parent B was ready");
        let result = match (a, b) {
            // §7 signal propagation: any error input short-circuits to
            // an error output, first error wins by parent order.
            (Err(e), _) => Err(e.clone()),
            (_, Err(e)) => Err(e.clone()),
            (Ok(av), Ok(bv)) => catch_combinator(|| (self.f)(av, bv)),
        };
        self.received.borrow_mut().clear_all();
        result
    }
}

struct CombineSlotA<A, B, T> {
    core: Rc<CombineCore<A, B, T>>,
    child: Rc<Node<T>>,
}

impl<A: Clone + 'static, B: 'static, T: Clone + 'static> Observer<A> for CombineSlotA<A, B, T> {
    fn notify(&self, value: &Try<A>, txn: &Rc<TransactionInner>) {
        if self.core.set_a(value.clone(), txn.id) {
            self.child.request_schedule(txn);
        }
    }
}

struct CombineSlotB<A, B, T> {
    core: Rc<CombineCore<A, B, T>>,
    child: Rc<Node<T>>,
}

impl<A: 'static, B: Clone + 'static, T: Clone + 'static> Observer<B> for CombineSlotB<A, B, T> {
    fn notify(&self, value: &Try<B>, txn: &Rc<TransactionInner>) {
        if self.core.set_b(value.clone(), txn.id) {
            self.child.request_schedule(txn);
        }
    }
}

/// Reads both parents' current values and latches the combined result as
/// this node's own current value (§4.5 "signal combine initial value"),
/// seeding the core's per-parent cache so a later lone-parent update has
/// the other's value to pair with. Shared between the eager,
/// construction-time call (§3 signal currency: `now()` must work before
/// any observer exists) and the `on_start` call (after a stop/restart,
/// parent values may have moved on since construction).
fn seed_initial<A, B, T>(core: &Rc<CombineCore<A, B, T>>, pa: &Rc<Node<A>>, pb: &Rc<Node<B>>, child: &Rc<Node<T>>)
where
    A: Clone + 'static,
    B: Clone + 'static,
    T: Clone + 'static,
{
    if let (Some(a), Some(b)) = (pa.try_now(), pb.try_now()) {
        let result = match (&a, &b) {
            (Err(e), _) => Err(e.clone()),
            (_, Err(e)) => Err(e.clone()),
            (Ok(av), Ok(bv)) => catch_combinator(|| (core.f)(av, bv)),
        };
        core.seed(a, b);
        child.set_current_initial(result);
    }
}

/// Builds a combine node over `parent_a`/`parent_b`. `is_signal` governs
/// whether the node latches a current value and computes it eagerly at
/// start (true: Combine, signal × signal → signal) or waits for both
/// parents to co-fire with no initial value (false: CombineStream).
pub(crate) fn combine<A, B, T>(
    parent_a: Rc<Node<A>>,
    parent_b: Rc<Node<B>>,
    f: impl Fn(&A, &B) -> T + 'static,
    is_signal: bool,
) -> Rc<Node<T>>
where
    A: Clone + 'static,
    B: Clone + 'static,
    T: Clone + 'static,
{
    let rank = parent_a.rank.max(parent_b.rank) + 1;
    let core = Rc::new(CombineCore {
        latest_a: RefCell::new(None),
        latest_b: RefCell::new(None),
        received: RefCell::new(Bitmap256::new()),
        last_txn: Cell::new(None),
        requires_both: !is_signal,
        f: Box::new(f),
    });

    let sub_ids: Rc<Cell<Option<(SubId, SubId)>>> = Rc::new(Cell::new(None));

    let (pa_start, pb_start, core_start, ids_start) = (parent_a.clone(), parent_b.clone(), core.clone(), sub_ids.clone());
    let (pa_stop, pb_stop, ids_stop) = (parent_a.clone(), parent_b.clone(), sub_ids.clone());

    let lifecycle = Lifecycle {
        on_start: Box::new(move |child: &Rc<Node<T>>| {
            let slot_a = Rc::new(CombineSlotA { core: core_start.clone(), child: child.clone() });
            let slot_b = Rc::new(CombineSlotB { core: core_start.clone(), child: child.clone() });
            let id_a = pa_start.add_internal_observer(slot_a);
            let id_b = pb_start.add_internal_observer(slot_b);
            ids_start.set(Some((id_a, id_b)));

            if child.is_signal {
                seed_initial(&core_start, &pa_start, &pb_start, child);
            }
        }),
        on_stop: Box::new(move |_child| {
            if let Some((id_a, id_b)) = ids_stop.take() {
                pa_stop.remove_internal_observer(id_a);
                pb_stop.remove_internal_observer(id_b);
            }
        }),
    };

    let node = Node::new_rc(rank, is_signal, Kind::Combine(core.clone() as Rc<dyn Fire<T>>), lifecycle);
    // §3 "Signal currency": seeded here too, before any observer has
    // started this node -- not only after a real start, as constructing
    // a combine is side-effect-free (no parent subscription happens
    // here, only a value read) so this doesn't violate dormancy.
    if is_signal {
        seed_initial(&core, &parent_a, &parent_b, &node);
    }
    node
}
