//! Tessel CLI library.
//!
//! The `tessel` binary is a thin wrapper over this crate so the commands can
//! be driven from integration tests.
//!
//! # Modules
//!
//! - [`cli`] - Command-line argument definitions
//! - [`commands`] - `build` and `bundle` implementations
//! - [`error`] - Error types and the miette conversion
//! - [`logger`] - Tracing subscriber setup
//! - [`ui`] - Spinners, status messages and formatting helpers

pub mod cli;
pub mod commands;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{CliError, Result, ResultExt};
