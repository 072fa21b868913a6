//! Error types for topology resolution.

use std::path::PathBuf;
use thiserror::Error;

/// Failures while resolving a workspace's project roots.
///
/// These never escape [`TopologyResolver::resolve`](super::TopologyResolver::resolve);
/// they exist so the failure can be logged with its cause.
#[derive(Error, Debug)]
pub enum TopologyError {
    #[error("Cannot read workspace manifest {path}: {source}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed workspace manifest {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },

    #[error("Workspace root {path} does not exist")]
    MissingRoot { path: PathBuf },
}

pub type TopologyResult<T> = Result<T, TopologyError>;
