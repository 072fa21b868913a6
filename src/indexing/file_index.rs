//! Bounded, thread-safe index of the files known per workspace.
//!
//! The index is advisory: it reflects what the enumerator and the watcher
//! last observed, not necessarily the current disk state.

use std::collections::HashMap;
use std::path::Path;

use indexmap::IndexSet;
use parking_lot::Mutex;

use crate::types::{FileReference, WorkspaceIdentity};

/// Hard ceiling on files held for one workspace.
pub const MAX_FILES_PER_WORKSPACE: usize = 1_000_000;

/// Maps each workspace to its ordered list of known files.
///
/// All operations go through one lock for the whole index, so readers never
/// see a half-applied replacement. The cap is a ceiling, not an eviction
/// policy: files beyond it are refused.
#[derive(Debug)]
pub struct WorkspaceFileIndex {
    cap: usize,
    workspaces: Mutex<HashMap<WorkspaceIdentity, IndexSet<FileReference>>>,
}

impl Default for WorkspaceFileIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkspaceFileIndex {
    pub fn new() -> Self {
        Self::with_cap(MAX_FILES_PER_WORKSPACE)
    }

    pub fn with_cap(cap: usize) -> Self {
        Self {
            cap,
            workspaces: Mutex::new(HashMap::new()),
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Replace the files of `workspace`, keeping at most `cap` of them in input order.
    pub fn set_files(&self, workspace: &WorkspaceIdentity, files: impl IntoIterator<Item = FileReference>) {
        let mut set = IndexSet::new();
        let mut truncated = false;
        for file in files {
            if set.len() >= self.cap {
                truncated = true;
                break;
            }
            set.insert(file);
        }

        let count = set.len();
        self.workspaces.lock().insert(workspace.clone(), set);

        if truncated {
            crate::debug_event!("index", "capped", "{workspace} at {count} files");
        }
    }

    /// Files known for `workspace`, or `None` if it was never set.
    pub fn get_files(&self, workspace: &WorkspaceIdentity) -> Option<Vec<FileReference>> {
        self.workspaces
            .lock()
            .get(workspace)
            .map(|files| files.iter().cloned().collect())
    }

    /// Add one file. Re-adding a known file succeeds without duplicating it;
    /// `false` means the workspace is full and the file is new.
    pub fn add_file(&self, workspace: &WorkspaceIdentity, file: FileReference) -> bool {
        let mut workspaces = self.workspaces.lock();
        let files = workspaces.entry(workspace.clone()).or_default();

        if files.contains(&file) {
            return true;
        }
        if files.len() >= self.cap {
            return false;
        }
        files.insert(file);
        true
    }

    /// Remove one file; absent files are ignored.
    pub fn remove_file(&self, workspace: &WorkspaceIdentity, file: &FileReference) {
        if let Some(files) = self.workspaces.lock().get_mut(workspace) {
            files.shift_remove(file);
        }
    }

    /// Remove and return the files of `workspace` located under `root`,
    /// except those for which `keep` returns true.
    pub fn remove_under(
        &self,
        workspace: &WorkspaceIdentity,
        root: &Path,
        keep: impl Fn(&Path) -> bool,
    ) -> Vec<FileReference> {
        let mut workspaces = self.workspaces.lock();
        let Some(files) = workspaces.get_mut(workspace) else {
            return Vec::new();
        };

        let evicted = |file: &FileReference| {
            let path = file.absolute_path();
            path.starts_with(root) && !keep(path)
        };
        let removed: Vec<FileReference> = files.iter().filter(|f| evicted(*f)).cloned().collect();
        files.retain(|f| !evicted(f));
        removed
    }

    /// Whether `workspace` already holds `file`.
    pub fn contains(&self, workspace: &WorkspaceIdentity, file: &FileReference) -> bool {
        self.workspaces
            .lock()
            .get(workspace)
            .is_some_and(|files| files.contains(file))
    }

    /// Forget a workspace entirely.
    pub fn remove_workspace(&self, workspace: &WorkspaceIdentity) {
        self.workspaces.lock().remove(workspace);
    }

    /// Number of files held for `workspace`.
    pub fn len(&self, workspace: &WorkspaceIdentity) -> usize {
        self.workspaces
            .lock()
            .get(workspace)
            .map(IndexSet::len)
            .unwrap_or(0)
    }

    pub fn is_empty(&self, workspace: &WorkspaceIdentity) -> bool {
        self.len(workspace) == 0
    }
}
