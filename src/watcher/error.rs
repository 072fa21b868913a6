//! Error types for the batching watcher.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from watcher construction.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Watcher requires a Tokio runtime")]
    NoRuntime,

    #[error("OS refused to create an event stream for {} roots", .paths.len())]
    StreamCreationFailed { paths: Vec<PathBuf> },

    #[error("OS refused to start the event stream")]
    StreamStartFailed,
}
