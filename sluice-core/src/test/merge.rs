// §8 S2 and the §9 merge re-entry open question: two streams derived
// from the same source co-fire, and the merge node serializes the
// second emission into a follow-up transaction rather than dropping or
// glitching it.

use sluice_test::{ManualSource, Record, Recorded};
use test_log::test;

use crate::stream::Stream;

#[test]
fn merge_fires_twice_in_parent_order_when_parents_cofire() {
    let (x, x_src) = ManualSource::<i32>::new();
    let s1 = x.map(|v| v * 10);
    let s2 = x.map(|v| v * 100);
    let merged = Stream::merge([s1, s2]);

    let rec = Record::stream(&merged);
    x_src.fire(1);

    assert_eq!(rec.values(), vec![Recorded::Value(10), Recorded::Value(100)]);
}

/// Exercises the §9 open question directly: `merge`'s two co-firing
/// events both reach `request_schedule` for the merge node in the same
/// transaction (s1's call schedules it, s2's call takes the "already
/// pending" branch and is merely queued). If the second emission were
/// delivered to a downstream node in the *same* transaction as the
/// first, that downstream node's own per-transaction dedup would
/// silently swallow it. Since it isn't swallowed here, the second
/// emission must have opened its own transaction.
#[test]
fn merge_reentry_path_is_exercised() {
    let (x, x_src) = ManualSource::<i32>::new();
    let s1 = x.map(|v| v + 1);
    let s2 = x.map(|v| v + 100);
    let merged = Stream::merge([s1, s2]);
    let doubled = merged.map(|v| v * 2);

    let rec = Record::stream(&doubled);
    x_src.fire(0);

    assert_eq!(rec.values(), vec![Recorded::Value(2), Recorded::Value(202)]);
}

#[test]
fn merge_of_a_single_stream_passes_values_through() {
    let (x, x_src) = ManualSource::<i32>::new();
    let merged = Stream::merge([x.map(|v| *v)]);

    let rec = Record::stream(&merged);
    x_src.fire(9);

    assert_eq!(rec.values(), vec![Recorded::Value(9)]);
}
