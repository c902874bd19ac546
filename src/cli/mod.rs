//! Command line interface.

mod commands;

pub use commands::{run, verbosity, Verbosity};
