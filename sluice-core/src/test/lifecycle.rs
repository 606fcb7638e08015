// §8 S4 (start/stop refcount) and invariant 4/5. `debug`'s start/stop
// callbacks give direct, side-effect-observable proof of the lifecycle
// transitions a plain `map` or `filter` node goes through silently.

use std::cell::Cell;
use std::rc::Rc;

use sluice_test::assert_ok;
use test_log::test;

use crate::signal::Var;

#[test]
fn onstart_and_onstop_fire_exactly_once_across_multiple_observers() {
    let starts = Rc::new(Cell::new(0));
    let stops = Rc::new(Cell::new(0));

    let a = Var::new(1);
    let (s, t) = (starts.clone(), stops.clone());
    let probe = a.signal().debug(
        None::<fn(&crate::Try<i32>)>,
        Some(move || s.set(s.get() + 1)),
        Some(move || t.set(t.get() + 1)),
    );

    assert_eq!(starts.get(), 0);

    let o1 = probe.subscribe(|_| {});
    assert_eq!(starts.get(), 1);

    // a second observer attaching does not re-run onStart.
    let o2 = probe.subscribe(|_| {});
    assert_eq!(starts.get(), 1);

    drop(o1);
    assert_eq!(stops.get(), 0, "one observer remains, onStop must not run yet");

    drop(o2);
    assert_eq!(stops.get(), 1, "onStop runs exactly once, after the last observer leaves");
}

#[test]
fn signal_value_is_preserved_across_a_full_stop_restart_cycle() {
    let starts = Rc::new(Cell::new(0));
    let a = Var::new(1);
    let s = starts.clone();
    let probe = a.signal().debug(None::<fn(&crate::Try<i32>)>, Some(move || s.set(s.get() + 1)), None::<fn()>);

    let o1 = probe.subscribe(|_| {});
    assert_eq!(starts.get(), 1);
    drop(o1);

    // probe is fully stopped now; updates to `a` aren't observed.
    a.set(5);
    assert_ok(probe.now(), 1);

    // re-subscribing restarts the node and recomputes its initial value
    // from `a`'s current (now latched) value.
    let _o2 = probe.subscribe(|_| {});
    assert_eq!(starts.get(), 2);
    assert_ok(probe.now(), 5);
}
