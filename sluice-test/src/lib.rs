// Introspection, snapshots, diagnostics, judgments — test-support shared
// by `sluice-core`'s and `sluice`'s test suites. Two utilities live here:
// `Record`, a recording sink that captures the exact sequence of values
// and errors an observable delivers (needed to assert the interleavings
// in spec §8's concrete scenarios), and `ManualSource`, a hand-fired
// `Source` for driving a stream from a test without standing up a real
// external producer.

use std::cell::RefCell;
use std::rc::Rc;

use sluice_core::{Error, Signal, Source, SourceInjector, Stream, Subscription};

/// One recorded emission, in delivery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded<T> {
    Value(T),
    Error(String),
}

/// Subscribes to an observable and records every emission it delivers,
/// holding the subscription alive until dropped.
pub struct Record<T> {
    log: Rc<RefCell<Vec<Recorded<T>>>>,
    _sub: Subscription,
}

impl<T: Clone + 'static> Record<T> {
    pub fn stream(stream: &Stream<T>) -> Self {
        let log: Rc<RefCell<Vec<Recorded<T>>>> = Rc::new(RefCell::new(Vec::new()));
        let (log_next, log_err) = (log.clone(), log.clone());
        let sub = stream.subscribe_full(
            move |v| log_next.borrow_mut().push(Recorded::Value(v.clone())),
            move |e| log_err.borrow_mut().push(Recorded::Error(e.to_string())),
        );
        Record { log, _sub: sub }
    }

    pub fn signal(signal: &Signal<T>) -> Self {
        let log: Rc<RefCell<Vec<Recorded<T>>>> = Rc::new(RefCell::new(Vec::new()));
        let (log_next, log_err) = (log.clone(), log.clone());
        let sub = signal.subscribe_full(
            move |v| log_next.borrow_mut().push(Recorded::Value(v.clone())),
            move |e| log_err.borrow_mut().push(Recorded::Error(e.to_string())),
        );
        Record { log, _sub: sub }
    }

    pub fn values(&self) -> Vec<Recorded<T>> {
        self.log.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.log.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.borrow().is_empty()
    }
}

/// Asserts a signal/stream's try-value is `Some(Ok(expected))` without
/// requiring `Error: PartialEq` (it deliberately isn't one — see
/// `sluice_core::Error`'s doc comment).
pub fn assert_ok<T: std::fmt::Debug + PartialEq>(now: Option<sluice_core::Try<T>>, expected: T) {
    match now {
        Some(Ok(v)) => assert_eq!(v, expected),
        other => panic!("expected Some(Ok({expected:?})), got {other:?}"),
    }
}

struct ManualProducer<T> {
    injector: Rc<RefCell<Option<SourceInjector<T>>>>,
}

impl<T: Clone + 'static> Source<T> for ManualProducer<T> {
    fn start(&self, inject: SourceInjector<T>) {
        *self.injector.borrow_mut() = Some(inject);
    }

    fn stop(&self) {
        *self.injector.borrow_mut() = None;
    }
}

/// A stream source a test can fire directly, standing in for the real
/// external producers (timers, sockets, DOM events) that §6 defers to
/// concrete integrations. Firing before the stream has any observer (and
/// so before `start` has wired the injector) is a no-op, same as firing
/// after the last observer detaches.
pub struct ManualSource<T> {
    injector: Rc<RefCell<Option<SourceInjector<T>>>>,
}

impl<T: Clone + 'static> ManualSource<T> {
    pub fn new() -> (Stream<T>, Self) {
        let injector: Rc<RefCell<Option<SourceInjector<T>>>> = Rc::new(RefCell::new(None));
        let stream = Stream::source(ManualProducer { injector: injector.clone() });
        (stream, ManualSource { injector })
    }

    pub fn fire(&self, value: T) {
        if let Some(inj) = self.injector.borrow().as_ref() {
            inj.fire_value(value);
        }
    }

    pub fn fire_error(&self, error: Error) {
        if let Some(inj) = self.injector.borrow().as_ref() {
            inj.fire_error(error);
        }
    }
}
