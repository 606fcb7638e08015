mod bitmap256;
mod error;

#[cfg(test)]
mod test;

pub use bitmap256::Bitmap256;
pub use error::{err, Error, Result};
