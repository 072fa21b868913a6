use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

/// Key for one open workspace: the path the IDE reports as its root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkspaceIdentity(PathBuf);

impl WorkspaceIdentity {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self(root.into())
    }

    pub fn root(&self) -> &Path {
        &self.0
    }

    /// The "no workspace" placeholder the IDE hands out before a real
    /// workspace is open. It is the filesystem root.
    pub fn is_sentinel(&self) -> bool {
        self.0.as_os_str().is_empty() || self.0 == Path::new("/")
    }
}

impl fmt::Display for WorkspaceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// A directory that holds one buildable project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectRoot(PathBuf);

impl ProjectRoot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// True when `path` lives below this root.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.0)
    }
}

impl fmt::Display for ProjectRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// A file discovered under a project root.
///
/// Two references are equal when their absolute paths are equal; the
/// relative path and file name are derived data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReference {
    absolute_path: PathBuf,
    relative_path: PathBuf,
    file_name: String,
}

impl FileReference {
    /// Build a reference for `absolute_path` relative to `root`.
    ///
    /// Paths outside `root` keep their absolute form as the relative path.
    pub fn new(root: &Path, absolute_path: impl Into<PathBuf>) -> Self {
        let absolute_path = absolute_path.into();
        let relative_path = absolute_path
            .strip_prefix(root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| absolute_path.clone());
        let file_name = absolute_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            absolute_path,
            relative_path,
            file_name,
        }
    }

    pub fn absolute_path(&self) -> &Path {
        &self.absolute_path
    }

    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// `file://` URI for this file, if the path is absolute.
    pub fn uri(&self) -> Option<Url> {
        file_uri(&self.absolute_path)
    }
}

impl PartialEq for FileReference {
    fn eq(&self, other: &Self) -> bool {
        self.absolute_path == other.absolute_path
    }
}

impl Eq for FileReference {}

impl Hash for FileReference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.absolute_path.hash(state);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileEventKind {
    Created,
    Changed,
    Deleted,
}

impl fmt::Display for FileEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FileEventKind::Created => "created",
            FileEventKind::Changed => "changed",
            FileEventKind::Deleted => "deleted",
        };
        f.pad(label)
    }
}

/// One change to one file, either observed or synthesized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileEvent {
    pub uri: Url,
    pub kind: FileEventKind,
}

impl FileEvent {
    pub fn new(uri: Url, kind: FileEventKind) -> Self {
        Self { uri, kind }
    }

    /// Build an event for a filesystem path. Returns `None` for relative paths.
    pub fn for_path(path: &Path, kind: FileEventKind) -> Option<Self> {
        file_uri(path).map(|uri| Self { uri, kind })
    }

    /// Local path of the event's URI.
    pub fn path(&self) -> Option<PathBuf> {
        self.uri.to_file_path().ok()
    }
}

/// Convert an absolute path into a `file://` URI.
pub fn file_uri(path: &Path) -> Option<Url> {
    Url::from_file_path(path).ok()
}
