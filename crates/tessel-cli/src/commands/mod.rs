//! Command implementations for the tessel CLI.
//!
//! - [`build`] - Production site build
//! - [`bundle`] - Multi-target compile, optionally watching
//!
//! Each command provides an `execute` function taking its parsed arguments.

pub mod build;
pub mod bundle;
pub(crate) mod utils;

pub use build::execute as build_execute;
pub use bundle::execute as bundle_execute;
