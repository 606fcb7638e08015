// §8 S5: a combinator panic latches as an error on the signal it hits,
// and a later success recovers it. Also covers §7's lifecycle-errors
// rule: a `debug` callback panic never reaches the downstream observer,
// only the global sink.

use std::cell::RefCell;
use std::rc::Rc;

use sluice_test::{Record, Recorded};
use test_log::test;

use crate::signal::Var;

#[test]
fn map_panic_latches_then_recovers_on_next_success() {
    let a = Var::new(1);
    let b = a.signal().map(|x| {
        if *x == 0 {
            panic!("cannot be zero");
        }
        *x
    });

    assert_eq!(b.now().unwrap().unwrap(), 1);

    let rec = Record::signal(&b);
    a.set(0);
    a.set(2);

    let values = rec.values();
    assert_eq!(values.len(), 3);
    assert!(matches!(values[0], Recorded::Value(1)));
    assert!(matches!(values[1], Recorded::Error(_)));
    assert!(matches!(values[2], Recorded::Value(2)));

    assert_eq!(b.now().unwrap().unwrap(), 2);
}

#[test]
fn debug_callback_panic_is_routed_to_sink_not_downstream() {
    let sunk = Rc::new(RefCell::new(Vec::new()));
    let sunk_cb = sunk.clone();
    crate::add_sink(move |e| sunk_cb.borrow_mut().push(e.to_string()));

    let a = Var::new(1);
    let b = a.signal().debug(Some(|_: &crate::Try<i32>| panic!("debug callback exploded")), None::<fn()>, None::<fn()>);

    let rec = Record::signal(&b);
    a.set(2);

    // the panic never reaches the observer: every recorded entry is a
    // plain value, never an error.
    assert!(rec.values().iter().all(|v| matches!(v, Recorded::Value(_))));
    assert!(sunk.borrow().iter().any(|m| m.contains("debug callback exploded")));
}
