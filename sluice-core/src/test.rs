mod combine_stream;
mod diamond;
mod error;
mod laws;
mod lifecycle;
mod merge;
mod reentrancy;
mod sample;
