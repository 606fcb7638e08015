// The transaction scheduler (§4.2). One transaction is current at a time;
// its `pendingObservables` is a rank-ordered priority queue (ties broken
// FIFO, §5 ordering guarantee 1). `Transaction::new` is the sole entry
// point: re-entrant calls (from inside a firing callback, §5 re-entrancy,
// §8 S6) are queued on the engine rather than run inline.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::rc::Rc;

use crate::engine::with_engine;
use crate::ids::{next_txn_id, Rank, TxnId};
use crate::node::Scheduled;

pub(crate) struct TransactionInner {
    pub(crate) id: TxnId,
    queue: RefCell<BinaryHeap<PendingEntry>>,
    seq: Cell<u64>,
}

impl TransactionInner {
    fn new() -> Self {
        TransactionInner { id: next_txn_id(), queue: RefCell::new(BinaryHeap::new()), seq: Cell::new(0) }
    }

    /// Enqueues a node for `sync_fire` in this transaction. Callers are
    /// responsible for the "not already pending" dedup (§9 open question);
    /// this just orders by rank then insertion sequence.
    pub(crate) fn schedule(&self, node: Rc<dyn Scheduled>) {
        let seq = self.seq.get();
        self.seq.set(seq + 1);
        self.queue.borrow_mut().push(PendingEntry { rank: node.rank(), seq, node });
    }
}

struct PendingEntry {
    rank: Rank,
    seq: u64,
    node: Rc<dyn Scheduled>,
}

// `BinaryHeap` is a max-heap; reverse the comparison so the *smallest*
// (rank, seq) pair is popped first.
impl Ord for PendingEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.rank.cmp(&self.rank).then_with(|| other.seq.cmp(&self.seq))
    }
}
impl PartialOrd for PendingEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl PartialEq for PendingEntry {
    fn eq(&self, other: &Self) -> bool {
        self.rank == other.rank && self.seq == other.seq
    }
}
impl Eq for PendingEntry {}

/// One atomic propagation step (§4.2). `Transaction::new(body)` either
/// runs `body` immediately (if no transaction is current) or queues it to
/// run once the current one, and any transactions queued ahead of it,
/// have fully drained.
pub struct Transaction;

impl Transaction {
    pub fn new(body: impl FnOnce(&Rc<TransactionInner>) + 'static) {
        let starts_now = with_engine(|engine| {
            if engine.current.is_some() {
                engine.pending_transactions.push_back(Box::new(move || Transaction::run(body)));
                false
            } else {
                true
            }
        });
        if starts_now {
            Transaction::run(body);
        }
    }

    fn run(body: impl FnOnce(&Rc<TransactionInner>) + 'static) {
        let inner = Rc::new(TransactionInner::new());
        with_engine(|engine| engine.current = Some(inner.clone()));
        body(&inner);
        Transaction::drain(&inner);
        with_engine(|engine| engine.current = None);
        Transaction::run_next_pending();
    }

    fn drain(inner: &Rc<TransactionInner>) {
        loop {
            let next = inner.queue.borrow_mut().pop();
            match next {
                Some(entry) => entry.node.sync_fire(inner),
                None => break,
            }
        }
    }

    fn run_next_pending() {
        let next = with_engine(|engine| engine.pending_transactions.pop_front());
        if let Some(f) = next {
            f();
        }
    }
}
