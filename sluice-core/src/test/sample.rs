// §8 S3 and the §4.6 rank guarantee: a sample only fires on the
// triggering stream, never on the sampled signal alone, and reads the
// sampled signal's *post-transaction* value when both share an
// ancestor.

use sluice_test::{ManualSource, Record, Recorded};
use test_log::test;

use crate::signal::Var;

#[test]
fn sample_ignores_signal_updates_and_fires_only_on_trigger() {
    let (trigger, trigger_src) = ManualSource::<()>::new();
    let sig = Var::new(0);

    let sampled = trigger.with_latest_from(&sig.signal(), |_, v| *v);
    let rec = Record::stream(&sampled);

    sig.set(5);
    assert!(rec.is_empty(), "updating the sampled signal alone must not emit");

    trigger_src.fire(());
    assert_eq!(rec.values(), vec![Recorded::Value(5)]);
}

#[test]
fn sample_reads_post_transaction_value_when_trigger_and_signal_share_an_ancestor() {
    let (trigger, trigger_src) = ManualSource::<i32>::new();
    let acc = trigger.scan(0, |acc, v| acc + v);
    let sampled = trigger.with_latest_from(&acc, |v, sum| (*v, *sum));

    let rec = Record::stream(&sampled);

    trigger_src.fire(3);
    // the sample must see `acc`'s post-update value (3), not the seed.
    assert_eq!(rec.values(), vec![Recorded::Value((3, 3))]);

    trigger_src.fire(4);
    assert_eq!(rec.values()[1], Recorded::Value((4, 7)));
}
