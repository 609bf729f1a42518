#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// grid error types module.
mod error;
pub use error::GridError;

/// sample grid module.
mod grid;
pub use grid::{GridScalar, GridSize, SampleGrid};
