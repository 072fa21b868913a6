pub mod cli;
pub mod config;
pub mod indexing;
pub mod logging;
pub mod service;
pub mod topology;
pub mod types;
pub mod watcher;

pub use config::{Settings, WatchConfig};
pub use indexing::{FileEnumerator, MAX_FILES_PER_WORKSPACE, WorkspaceFileIndex};
pub use service::{
    FilesystemTopology, TopologyProvider, WatchListener, WatchServiceRegistry,
    WorkspaceWatchOrchestrator,
};
pub use topology::{TopologyError, TopologyResolver};
pub use types::{FileEvent, FileEventKind, FileReference, ProjectRoot, WorkspaceIdentity};
pub use watcher::{BatchingChangeWatcher, WatchError, WatchFacility};
