//! Diagnostic command-line interface.
//!
//! Argument parsing lives in [`args`]; each command in [`commands`].

pub mod args;
pub mod commands;

pub use args::{Cli, Commands};
