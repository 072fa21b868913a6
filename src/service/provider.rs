//! Topology and enumeration capabilities injected into the orchestrator.

use std::collections::HashMap;
use std::path::Path;

use parking_lot::Mutex;

use crate::config::EnumeratorSettings;
use crate::indexing::FileEnumerator;
use crate::topology::TopologyResolver;
use crate::types::{FileReference, ProjectRoot, WorkspaceIdentity};

/// Where project roots and their files come from.
///
/// Both calls may block on disk I/O; the orchestrator runs them on the
/// blocking pool.
pub trait TopologyProvider: Send + Sync {
    /// Ordered, de-duplicated project roots of `workspace`. Never fails.
    fn project_roots(&self, workspace: &WorkspaceIdentity) -> Vec<ProjectRoot>;

    /// Snapshot of the files under `root` that pass enumeration filters.
    fn enumerate_files(&self, root: &ProjectRoot) -> Vec<FileReference>;

    /// Whether a live event for `path` under `root` should reach consumers.
    fn accepts(&self, _root: &ProjectRoot, _path: &Path) -> bool {
        true
    }
}

/// Production provider: manifest resolution plus a filtered directory walk.
#[derive(Debug, Clone, Default)]
pub struct FilesystemTopology {
    resolver: TopologyResolver,
    enumerator: FileEnumerator,
}

impl FilesystemTopology {
    pub fn new(enumerator: FileEnumerator) -> Self {
        Self {
            resolver: TopologyResolver::new(),
            enumerator,
        }
    }

    pub fn from_settings(settings: &EnumeratorSettings) -> Self {
        Self::new(FileEnumerator::new(settings))
    }

    pub fn enumerator(&self) -> &FileEnumerator {
        &self.enumerator
    }
}

impl TopologyProvider for FilesystemTopology {
    fn project_roots(&self, workspace: &WorkspaceIdentity) -> Vec<ProjectRoot> {
        self.resolver.resolve(workspace.root())
    }

    fn enumerate_files(&self, root: &ProjectRoot) -> Vec<FileReference> {
        self.enumerator.enumerate(root)
    }

    fn accepts(&self, root: &ProjectRoot, path: &Path) -> bool {
        self.enumerator.accepts(root, path)
    }
}

/// Scripted provider for tests.
///
/// Roots are the same for every workspace and can be changed between
/// reconciliation ticks; files are listed per root by name.
#[derive(Debug, Default)]
pub struct StaticTopology {
    roots: Mutex<Vec<ProjectRoot>>,
    files: Mutex<HashMap<ProjectRoot, Vec<FileReference>>>,
    resolutions: Mutex<usize>,
}

impl StaticTopology {
    pub fn new(roots: Vec<ProjectRoot>) -> Self {
        Self {
            roots: Mutex::new(roots),
            ..Self::default()
        }
    }

    pub fn set_roots(&self, roots: Vec<ProjectRoot>) {
        *self.roots.lock() = roots;
    }

    /// Files of `root`, given as paths relative to it.
    pub fn set_files<I, S>(&self, root: &ProjectRoot, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<Path>,
    {
        let files = names
            .into_iter()
            .map(|name| FileReference::new(root.path(), root.path().join(name)))
            .collect();
        self.files.lock().insert(root.clone(), files);
    }

    /// How many times `project_roots` was called.
    pub fn resolutions(&self) -> usize {
        *self.resolutions.lock()
    }
}

impl TopologyProvider for StaticTopology {
    fn project_roots(&self, _workspace: &WorkspaceIdentity) -> Vec<ProjectRoot> {
        *self.resolutions.lock() += 1;
        self.roots.lock().clone()
    }

    fn enumerate_files(&self, root: &ProjectRoot) -> Vec<FileReference> {
        self.files.lock().get(root).cloned().unwrap_or_default()
    }
}
