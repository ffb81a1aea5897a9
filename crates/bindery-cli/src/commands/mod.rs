//! Command implementations.
//!
//! - [`build`] - build bundles and write them out
//! - [`deps`] - print the dependency index
//!
//! Each command provides an `execute` function taking its parsed arguments.

pub mod build;
pub mod deps;
pub(crate) mod utils;

pub use build::execute as build_execute;
pub use deps::execute as deps_execute;
