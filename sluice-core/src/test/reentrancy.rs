// §8 S6: setting a signal from inside another signal's observer
// callback queues a new transaction rather than running inline; the
// outer transaction fully drains before the inner one starts.

use std::cell::RefCell;
use std::rc::Rc;

use test_log::test;

use crate::signal::Var;

#[test]
fn reentrant_set_during_notification_queues_a_new_transaction() {
    let a = Rc::new(Var::new(0));
    let log = Rc::new(RefCell::new(Vec::new()));

    let a_inner = a.clone();
    let log_sub = log.clone();
    let _sub = a.signal().subscribe(move |v| {
        log_sub.borrow_mut().push(*v);
        if *v == 1 {
            a_inner.set(2);
        }
    });

    a.set(1);

    // 0: the subscribe-time replay. 1: the outer transaction. 2: the
    // transaction the observer queued from inside the outer one, run
    // only after the outer transaction has fully drained -- never
    // interleaved, never out of order.
    assert_eq!(*log.borrow(), vec![0, 1, 2]);
}
