// CombineStream (stream × stream → stream, §4.5): fires only in a
// transaction where both parents have fired, never on a lone parent
// event -- unlike the signal variant, there is no fallback "current
// value" to pair a lone firing with.

use sluice_test::{ManualSource, Record, Recorded};
use test_log::test;

#[test]
fn combine_stream_fires_when_both_parents_cofire() {
    let (x, x_src) = ManualSource::<i32>::new();
    let left = x.map(|v| v + 1);
    let right = x.map(|v| v * 2);
    let combined = left.combine(&right, |l, r| l + r);

    let rec = Record::stream(&combined);
    x_src.fire(1);

    assert_eq!(rec.values(), vec![Recorded::Value(4)]);
}

#[test]
fn combine_stream_is_silent_when_only_one_parent_fires() {
    let (x, x_src) = ManualSource::<i32>::new();
    let (y, y_src) = ManualSource::<i32>::new();
    let combined = x.combine(&y, |a, b| a + b);

    let rec = Record::stream(&combined);

    x_src.fire(10);
    assert!(rec.is_empty());

    y_src.fire(100);
    assert!(rec.is_empty());
}
