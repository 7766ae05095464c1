//! TAC optimization passes.

pub mod optimize;

pub use optimize::{optimize, optimize_function};
