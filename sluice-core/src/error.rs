// The error taxonomy of the propagation engine (spec §7). Every emission is
// a try-value: success carrying a value, or failure carrying one of three
// kinds of throwable-shaped error. The underlying carrier is
// `sluice_base::Error`, the teacher's backtrace-capturing, tracing-logged
// wrapper, which we rely on being cheap to `Clone` (it's `Arc`-backed)
// since a try-value is latched into signals and replayed to any number of
// observers.

use std::borrow::Cow;
use std::panic::{catch_unwind, AssertUnwindSafe};

pub use sluice_base::Error as Cause;

/// Which of the three semantic categories in §7 an [`Error`] belongs to.
/// This is metadata only — the propagation rules (§7) don't branch on it,
/// it exists so observers and the global sink can report something more
/// useful than "a try-value failed".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A pure function (map, filter, combinator) panicked.
    Combinator,
    /// An external source signaled failure (e.g. a socket closed).
    Source,
    /// Raised from a lifecycle callback (start/stop/initial/debug) where
    /// propagating downstream would be semantically wrong.
    Unhandled,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub kind: ErrorKind,
    pub cause: Cause,
}

/// Every emission is a try-value: a success carrying `T`, or a failure
/// carrying an [`Error`].
pub type Try<T> = Result<T, Error>;

impl Error {
    pub fn combinator(cause: impl Into<Cause>) -> Self {
        Error { kind: ErrorKind::Combinator, cause: cause.into() }
    }

    pub fn combinator_msg(msg: impl Into<Cow<'static, str>>) -> Self {
        Error { kind: ErrorKind::Combinator, cause: sluice_base::err(msg) }
    }

    pub fn source(cause: impl Into<Cause>) -> Self {
        Error { kind: ErrorKind::Source, cause: cause.into() }
    }

    pub fn source_msg(msg: impl Into<Cow<'static, str>>) -> Self {
        Error { kind: ErrorKind::Source, cause: sluice_base::err(msg) }
    }

    pub fn unhandled(cause: impl Into<Cause>) -> Self {
        Error { kind: ErrorKind::Unhandled, cause: cause.into() }
    }

    pub fn unhandled_msg(msg: impl Into<Cow<'static, str>>) -> Self {
        Error { kind: ErrorKind::Unhandled, cause: sluice_base::err(msg) }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.cause)
    }
}

/// Runs a combinator (map/filter/scan/combine function) and turns a panic
/// into a `CombinatorError` instead of unwinding into the scheduler. The
/// "contract demands purity" (§4.5); this is the belt-and-suspenders case
/// where it wasn't.
pub(crate) fn catch_combinator<R>(f: impl FnOnce() -> R) -> Try<R> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(r) => Ok(r),
        Err(payload) => Err(Error::combinator_msg(panic_message(payload))),
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> Cow<'static, str> {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        Cow::Borrowed(*s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        Cow::Owned(s.clone())
    } else {
        Cow::Borrowed("combinator panicked")
    }
}
