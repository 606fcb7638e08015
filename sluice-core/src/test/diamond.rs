// §8 S1 and invariant 3 (no-glitch): a combine node downstream of a
// shared ancestor fires exactly once, with both parents' post-update
// values, never an intermediate half-updated pairing.

use sluice_test::{assert_ok, Record, Recorded};
use test_log::test;

use crate::signal::Var;

#[test]
fn diamond_fires_once_with_post_update_values() {
    let a = Var::new(1);
    let sig = a.signal();
    let b = sig.map(|x| x + 10);
    let c = sig.map(|x| x * 10);
    let d = b.combine(&c, |x, y| x + y);

    assert_ok(d.now(), 21);

    let rec = Record::signal(&d);
    a.set(2);

    // the subscribe-time replay delivers 21; the update delivers 32 --
    // never 22 or 31, and never more than one post-update value.
    assert_eq!(rec.values(), vec![Recorded::Value(21), Recorded::Value(32)]);
    assert_ok(d.now(), 32);
}

#[test]
fn combine_short_circuits_on_either_parent_error_first_wins() {
    let a = Var::new(1);
    let sig = a.signal();
    let b = sig.map(|x| {
        if *x < 0 {
            panic!("b blew up");
        }
        *x
    });
    let c = sig.map(|x| {
        if *x < 0 {
            panic!("c blew up");
        }
        *x * 2
    });
    let d = b.combine(&c, |x, y| x + y);

    assert_ok(d.now(), 3);

    let rec = Record::signal(&d);
    a.set(-1);

    let values = rec.values();
    assert_eq!(values.len(), 2);
    assert!(matches!(values[0], Recorded::Value(3)));
    // both b and c error on this update; the combine's output is an
    // error either way (first error wins by parent order), never a
    // panic escaping into the scheduler.
    assert!(matches!(values[1], Recorded::Error(_)));
}
