// §8 round-trip laws: map(id) is identity, and map(f).map(g) is
// map(g ∘ f).

use sluice_test::{assert_ok, Record, Recorded};
use test_log::test;

use crate::signal::Var;

#[test]
fn map_identity_is_identity() {
    let a = Var::new(5);
    let mapped = a.signal().map(|x| *x);

    assert_ok(mapped.now(), 5);

    let rec = Record::signal(&mapped);
    a.set(7);
    assert_eq!(rec.values(), vec![Recorded::Value(5), Recorded::Value(7)]);
}

#[test]
fn map_composition_matches_fused_map() {
    let a = Var::new(3);
    let composed = a.signal().map(|x| x + 1).map(|x| x * 2);
    let fused = a.signal().map(|x| (x + 1) * 2);

    assert_eq!(composed.now().unwrap().unwrap(), fused.now().unwrap().unwrap());

    let rec_composed = Record::signal(&composed);
    let rec_fused = Record::signal(&fused);
    a.set(10);

    assert_eq!(rec_composed.values(), rec_fused.values());
}
