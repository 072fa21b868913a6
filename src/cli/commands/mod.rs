//! Command implementations for the CLI.

pub mod files;
pub mod init;
pub mod resolve;
pub mod watch;
