//! File discovery and the per-workspace file index.

pub mod file_index;
pub mod walker;

pub use file_index::{MAX_FILES_PER_WORKSPACE, WorkspaceFileIndex};
pub use walker::{ExclusionPredicate, FileEnumerator};
