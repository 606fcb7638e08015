// A glitch-free, single-threaded reactive propagation engine: streams
// and signals over a rank-scheduled transaction graph (§1-§2). See
// SPEC_FULL.md for the module-by-module design.

mod combine;
mod engine;
mod error;
mod ids;
mod merge;
mod node;
mod operators;
mod sample;
mod signal;
mod source;
mod split;
mod stream;
mod transaction;

#[cfg(test)]
mod test;

pub use engine::add_sink;
pub use error::{Error, ErrorKind, Try};
pub use node::Subscription;
pub use signal::{Signal, Var};
pub use source::{Source, SourceInjector};
pub use split::Splittable;
pub use stream::Stream;
pub use transaction::Transaction;
