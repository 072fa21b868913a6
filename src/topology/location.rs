//! `scheme:path` location strings used by workspace manifests.

use std::path::{Component, Path, PathBuf};

/// A parsed manifest location.
///
/// The path part is kept verbatim; joining and normalizing happen in
/// [`Location::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// Relative to the directory holding the workspace bundle.
    Container(String),
    /// Relative to the enclosing groups' accumulated path.
    Group(String),
    /// Relative to the directory holding the workspace bundle itself.
    SelfRelative(String),
    /// An absolute filesystem path.
    Absolute(String),
}

impl Location {
    /// Parse `scheme:path`. Unknown schemes return `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let (scheme, path) = raw.split_once(':')?;
        let path = path.to_string();
        match scheme {
            "container" => Some(Location::Container(path)),
            "group" => Some(Location::Group(path)),
            "self" => Some(Location::SelfRelative(path)),
            "absolute" => Some(Location::Absolute(path)),
            _ => None,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Location::Container(p)
            | Location::Group(p)
            | Location::SelfRelative(p)
            | Location::Absolute(p) => p,
        }
    }

    /// Resolve against the workspace's container directory and the
    /// current group prefix. The result is lexically normalized.
    pub fn resolve(&self, container_dir: &Path, self_dir: &Path, group_base: &Path) -> PathBuf {
        let joined = match self {
            Location::Container(p) => container_dir.join(p),
            Location::Group(p) => group_base.join(p),
            Location::SelfRelative(p) => self_dir.join(p),
            Location::Absolute(p) => PathBuf::from(p),
        };
        normalize_path(&joined)
    }
}

/// Lexically resolve `.` and `..` without touching the filesystem.
///
/// `..` at the root stays at the root; leading `..` on a relative path is kept.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)));
                if popped {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
