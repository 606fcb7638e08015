// The process-wide (really: thread-wide) state of the propagation engine:
// the pending-transaction queue and the unhandled-error sink of last
// resort (§5 "Shared resources", §9 "Process-wide state"). Design Notes
// are explicit that this should be an engine-object field, "one engine per
// host thread, initialized lazily" rather than truly global — a
// `thread_local!` gives us exactly that without threading an `&Engine`
// through every call in the crate.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use tracing::error;

use crate::error::Error;
use crate::transaction::TransactionInner;

pub(crate) struct Engine {
    pub(crate) current: Option<Rc<TransactionInner>>,
    pub(crate) pending_transactions: VecDeque<Box<dyn FnOnce()>>,
    sink: Vec<Rc<dyn Fn(&Error)>>,
}

impl Engine {
    fn new() -> Self {
        Engine {
            current: None,
            pending_transactions: VecDeque::new(),
            sink: vec![Rc::new(default_sink)],
        }
    }
}

fn default_sink(e: &Error) {
    error!(target: "sluice", "unhandled error: {}", e);
}

thread_local! {
    static ENGINE: RefCell<Engine> = RefCell::new(Engine::new());
}

pub(crate) fn with_engine<R>(f: impl FnOnce(&mut Engine) -> R) -> R {
    ENGINE.with(|cell| f(&mut cell.borrow_mut()))
}

/// Registers an additional callback on the global sink. Sinks accumulate
/// for the lifetime of the thread; there is no corresponding
/// "unregister" because nothing in this engine ever needs to remove one
/// (tests get a fresh thread, and therefore a fresh engine, per `#[test]`).
pub fn add_sink(f: impl Fn(&Error) + 'static) {
    with_engine(|e| e.sink.push(Rc::new(f)));
}

/// Reports an error to every registered sink callback. A callback that
/// panics has its panic swallowed and re-reported as a sink failure,
/// rather than being allowed to unwind into the scheduler (§7: "Callbacks
/// cannot themselves throw into the engine").
///
/// The callback list is cloned out of the engine before any callback
/// runs: a sink that itself registers a new sink or starts a transaction
/// must not re-enter `ENGINE` while we still hold it borrowed.
pub(crate) fn report_unhandled(e: &Error) {
    let callbacks = with_engine(|engine| engine.sink.clone());
    for cb in &callbacks {
        if catch_unwind(AssertUnwindSafe(|| cb(e))).is_err() {
            error!(target: "sluice", "sink callback panicked while reporting: {}", e);
        }
    }
}
