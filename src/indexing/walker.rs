//! File system walker for discovering the files of a project root
//!
//! Directories that can never hold project sources are pruned during the
//! walk rather than filtered afterwards:
//! - VCS metadata and dependency caches (`.git`, `node_modules`, `Pods`, ...)
//! - Nested project and workspace bundles
//! - Opaque package directories (`.app`, `.framework`, `.xcassets`, ...)
//! - Anything the caller's exclusion predicate rejects

use ignore::{DirEntry, WalkBuilder};
use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;

use crate::config::EnumeratorSettings;
use crate::types::{FileReference, ProjectRoot};

/// Caller-supplied filter; returns `true` for paths that must be skipped.
pub type ExclusionPredicate = Arc<dyn Fn(&Path) -> bool + Send + Sync>;

/// Extensions of files worth reporting.
pub const SOURCE_EXTENSIONS: &[&str] = &[
    "swift", "m", "mm", "h", "hh", "hpp", "c", "cc", "cpp", "cxx", "metal", "js", "jsx", "ts",
    "tsx", "py", "rb", "go", "rs", "java", "kt", "kts", "sh", "json", "yml", "yaml", "toml",
    "plist", "xml", "md", "txt", "strings", "entitlements", "xcconfig", "gradle", "cmake",
];

/// Directory and file names never descended into or reported.
pub const SKIPPED_NAMES: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    "node_modules",
    "Pods",
    "Carthage",
    "DerivedData",
    ".build",
    ".swiftpm",
    "xcuserdata",
    "__pycache__",
    ".DS_Store",
    ".idea",
];

/// Bundle extensions that mark a nested project or workspace.
pub const PROJECT_BUNDLE_EXTENSIONS: &[&str] = &["xcodeproj", "xcworkspace"];

/// Package directories treated as opaque files.
pub const PACKAGE_EXTENSIONS: &[&str] = &[
    "app",
    "appex",
    "framework",
    "xcframework",
    "bundle",
    "xcassets",
    "xcdatamodeld",
    "dSYM",
    "playground",
];

/// Walks project roots and produces [`FileReference`]s.
///
/// Walking has no side effects and can be repeated at any time.
#[derive(Clone)]
pub struct FileEnumerator {
    extensions: HashSet<String>,
    skipped_names: HashSet<String>,
    respect_gitignore: bool,
    exclusion: Option<ExclusionPredicate>,
}

impl Default for FileEnumerator {
    fn default() -> Self {
        Self::new(&EnumeratorSettings::default())
    }
}

impl std::fmt::Debug for FileEnumerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileEnumerator")
            .field("extensions", &self.extensions.len())
            .field("skipped_names", &self.skipped_names.len())
            .field("respect_gitignore", &self.respect_gitignore)
            .field("exclusion", &self.exclusion.is_some())
            .finish()
    }
}

impl FileEnumerator {
    /// Create an enumerator with the built-in rules plus configured additions
    pub fn new(settings: &EnumeratorSettings) -> Self {
        let extensions = SOURCE_EXTENSIONS
            .iter()
            .map(|ext| ext.to_string())
            .chain(
                settings
                    .extra_extensions
                    .iter()
                    .map(|ext| ext.trim_start_matches('.').to_string()),
            )
            .collect();
        let skipped_names = SKIPPED_NAMES
            .iter()
            .map(|name| name.to_string())
            .chain(settings.extra_skip_dirs.iter().cloned())
            .collect();

        Self {
            extensions,
            skipped_names,
            respect_gitignore: settings.respect_gitignore,
            exclusion: None,
        }
    }

    /// Attach a caller-supplied exclusion predicate
    pub fn with_exclusion(mut self, exclusion: ExclusionPredicate) -> Self {
        self.exclusion = Some(exclusion);
        self
    }

    /// Enumerate every accepted file under `root`.
    ///
    /// Unreadable directories are logged and skipped; the walk continues.
    pub fn enumerate(&self, root: &ProjectRoot) -> Vec<FileReference> {
        let root_path = root.path();
        let mut builder = WalkBuilder::new(root_path);

        builder
            .standard_filters(false)
            .git_ignore(self.respect_gitignore)
            .git_exclude(self.respect_gitignore)
            .require_git(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b));

        let this = self.clone();
        let walk_root = root_path.to_path_buf();
        builder.filter_entry(move |entry| this.keep_entry(&walk_root, entry));

        let mut files = Vec::new();
        for result in builder.build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    crate::debug_event!("enumerator", "skipped", "{e}");
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            if self.has_source_extension(entry.path()) {
                files.push(FileReference::new(root_path, entry.path()));
            }
        }

        crate::debug_event!(
            "enumerator",
            "walked",
            "{} -> {} files",
            root_path.display(),
            files.len()
        );
        files
    }

    /// Whether a single path would be produced by [`enumerate`](Self::enumerate) for `root`.
    ///
    /// Every component between `root` and `path` is checked against the
    /// pruning rules, so files inside skipped directories are rejected too.
    pub fn accepts(&self, root: &ProjectRoot, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(root.path()) else {
            return false;
        };

        let mut current = root.path().to_path_buf();
        let mut components = relative.components().peekable();
        while let Some(component) = components.next() {
            current.push(component);
            let name = component.as_os_str();
            if components.peek().is_some() && self.prunes_directory(name) {
                return false;
            }
            if self.is_excluded(&current) {
                return false;
            }
        }

        !self.is_skipped_name(path.file_name()) && self.has_source_extension(path)
    }

    fn keep_entry(&self, root: &Path, entry: &DirEntry) -> bool {
        let path = entry.path();
        if path == root {
            return true;
        }

        if self.is_skipped_name(Some(entry.file_name())) || self.is_excluded(path) {
            return false;
        }

        let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
        !(is_dir && self.prunes_directory(entry.file_name()))
    }

    fn prunes_directory(&self, name: &OsStr) -> bool {
        if self.is_skipped_name(Some(name)) {
            return true;
        }
        Path::new(name)
            .extension()
            .and_then(OsStr::to_str)
            .is_some_and(|ext| {
                PROJECT_BUNDLE_EXTENSIONS.contains(&ext) || PACKAGE_EXTENSIONS.contains(&ext)
            })
    }

    fn is_skipped_name(&self, name: Option<&OsStr>) -> bool {
        name.and_then(OsStr::to_str)
            .is_some_and(|name| self.skipped_names.contains(name))
    }

    fn is_excluded(&self, path: &Path) -> bool {
        self.exclusion.as_ref().is_some_and(|exclude| exclude(path))
    }

    fn has_source_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(OsStr::to_str)
            .is_some_and(|ext| self.extensions.contains(ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "// test").unwrap();
    }

    fn relative_paths(files: &[FileReference]) -> Vec<PathBuf> {
        files.iter().map(|f| f.relative_path().to_path_buf()).collect()
    }

    #[test]
    fn test_enumerate_filters_extensions() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        touch(root, "Sources/App/main.swift");
        touch(root, "Sources/App/View.swift");
        touch(root, "README.md");
        touch(root, "logo.png");
        touch(root, "Makefile");

        let files = FileEnumerator::default().enumerate(&ProjectRoot::new(root));

        assert_eq!(
            relative_paths(&files),
            vec![
                PathBuf::from("README.md"),
                PathBuf::from("Sources/App/View.swift"),
                PathBuf::from("Sources/App/main.swift"),
            ]
        );
        assert_eq!(files[1].file_name(), "View.swift");
        assert_eq!(files[1].absolute_path(), root.join("Sources/App/View.swift"));
    }

    #[test]
    fn test_enumerate_prunes_skipped_directories() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        touch(root, "main.swift");
        touch(root, ".git/hooks/pre-commit.sh");
        touch(root, "node_modules/pkg/index.js");
        touch(root, "Pods/Alamofire/Source.swift");
        touch(root, "Nested/Nested.xcodeproj/project.pbxproj.json");
        touch(root, "Other.xcworkspace/xcshareddata/settings.plist");
        touch(root, "Assets.xcassets/Contents.json");
        touch(root, "Vendor/Lib.framework/Headers/Lib.h");
        touch(root, "Nested/keep.swift");

        let files = FileEnumerator::default().enumerate(&ProjectRoot::new(root));

        assert_eq!(
            relative_paths(&files),
            vec![PathBuf::from("Nested/keep.swift"), PathBuf::from("main.swift")]
        );
    }

    #[test]
    fn test_exclusion_predicate_prunes_and_filters() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        touch(root, "Generated/Model.swift");
        touch(root, "Sources/Keep.swift");
        touch(root, "Sources/Skip.generated.swift");

        let enumerator = FileEnumerator::default().with_exclusion(Arc::new(|path: &Path| {
            path.ends_with("Generated") || path.to_string_lossy().contains(".generated.")
        }));
        let files = enumerator.enumerate(&ProjectRoot::new(root));

        assert_eq!(relative_paths(&files), vec![PathBuf::from("Sources/Keep.swift")]);
    }

    #[test]
    fn test_extra_settings() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        touch(root, "api/service.proto");
        touch(root, "build/out.swift");
        touch(root, "src/main.swift");

        let settings = EnumeratorSettings {
            extra_extensions: vec![".proto".to_string()],
            extra_skip_dirs: vec!["build".to_string()],
            respect_gitignore: false,
        };
        let files = FileEnumerator::new(&settings).enumerate(&ProjectRoot::new(root));

        assert_eq!(
            relative_paths(&files),
            vec![PathBuf::from("api/service.proto"), PathBuf::from("src/main.swift")]
        );
    }

    #[test]
    fn test_gitignore_only_when_enabled() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::write(root.join(".gitignore"), "ignored.swift\n").unwrap();
        touch(root, "ignored.swift");
        touch(root, "included.swift");

        let default_files = FileEnumerator::default().enumerate(&ProjectRoot::new(root));
        assert_eq!(default_files.len(), 2);

        let settings = EnumeratorSettings {
            respect_gitignore: true,
            ..EnumeratorSettings::default()
        };
        let files = FileEnumerator::new(&settings).enumerate(&ProjectRoot::new(root));
        assert_eq!(relative_paths(&files), vec![PathBuf::from("included.swift")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(root, "Open/visible.swift");
        touch(root, "Locked/hidden.swift");
        touch(root, "top.swift");

        let locked = root.join("Locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        // Privileged users can still read it.
        let unreadable = fs::read_dir(&locked).is_err();
        let files = FileEnumerator::default().enumerate(&ProjectRoot::new(root));
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let paths = relative_paths(&files);
        assert!(paths.contains(&PathBuf::from("Open/visible.swift")));
        assert!(paths.contains(&PathBuf::from("top.swift")));
        if unreadable {
            assert!(!paths.contains(&PathBuf::from("Locked/hidden.swift")));
        }
    }

    #[test]
    fn test_missing_root_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let files = FileEnumerator::default().enumerate(&ProjectRoot::new(temp_dir.path().join("gone")));
        assert!(files.is_empty());
    }

    #[test]
    fn test_accepts_matches_walk_rules() {
        let enumerator = FileEnumerator::default();
        let root = ProjectRoot::new("/work/App");

        assert!(enumerator.accepts(&root, Path::new("/work/App/Sources/main.swift")));
        assert!(!enumerator.accepts(&root, Path::new("/work/App/.git/config.json")));
        assert!(!enumerator.accepts(&root, Path::new("/work/App/Pods/X/a.swift")));
        assert!(!enumerator.accepts(&root, Path::new("/work/App/App.xcodeproj/a.json")));
        assert!(!enumerator.accepts(&root, Path::new("/work/App/image.png")));
        assert!(!enumerator.accepts(&root, Path::new("/work/Other/main.swift")));
        assert!(!enumerator.accepts(&root, Path::new("/work/App/.DS_Store")));
    }
}
