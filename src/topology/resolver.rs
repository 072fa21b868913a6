//! Resolves a workspace root into its ordered, de-duplicated project roots.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::error::{TopologyError, TopologyResult};
use super::location::{Location, normalize_path};
use super::manifest::parse_manifest;
use super::{PROJECT_EXTENSION, WORKSPACE_EXTENSION};
use crate::types::ProjectRoot;

/// File inside an `.xcworkspace` bundle that lists its references.
pub const WORKSPACE_MANIFEST: &str = "contents.xcworkspacedata";

/// Resolves workspace roots into project roots.
///
/// Stateless; every call reads the manifest from disk again so periodic
/// reconciliation sees edits.
#[derive(Debug, Clone, Default)]
pub struct TopologyResolver;

impl TopologyResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve `workspace_root`, degrading to an empty list on any failure.
    pub fn resolve(&self, workspace_root: &Path) -> Vec<ProjectRoot> {
        match self.try_resolve(workspace_root) {
            Ok(roots) => {
                crate::debug_event!(
                    "topology",
                    "resolved",
                    "{} -> {} project roots",
                    workspace_root.display(),
                    roots.len()
                );
                roots
            }
            Err(e) => {
                crate::warn_event!("topology", "resolution failed", "{e}");
                Vec::new()
            }
        }
    }

    /// Resolve `workspace_root`, reporting why resolution failed.
    pub fn try_resolve(&self, workspace_root: &Path) -> TopologyResult<Vec<ProjectRoot>> {
        let root = normalize_path(workspace_root);

        if has_extension(&root, WORKSPACE_EXTENSION) {
            let mut walk = Walk::default();
            walk.workspace(&root)?;
            return Ok(walk.roots);
        }

        if has_extension(&root, PROJECT_EXTENSION) {
            return Ok(vec![ProjectRoot::new(containing_dir(&root))]);
        }

        if root.is_dir() {
            return Ok(vec![ProjectRoot::new(root)]);
        }

        Err(TopologyError::MissingRoot { path: root })
    }
}

/// Accumulated state for one resolution, including nested workspaces.
#[derive(Default)]
struct Walk {
    visited: HashSet<PathBuf>,
    seen: HashSet<PathBuf>,
    roots: Vec<ProjectRoot>,
}

impl Walk {
    fn workspace(&mut self, workspace: &Path) -> TopologyResult<()> {
        if !self.visited.insert(workspace.to_path_buf()) {
            return Ok(());
        }

        let manifest = workspace.join(WORKSPACE_MANIFEST);
        let content = fs::read_to_string(&manifest).map_err(|source| TopologyError::ManifestRead {
            path: manifest.clone(),
            source,
        })?;
        let entries = parse_manifest(&content).map_err(|source| TopologyError::ManifestParse {
            path: manifest.clone(),
            source,
        })?;

        // An embedded workspace (App.xcodeproj/project.xcworkspace) shares the
        // project's container.
        let self_dir = containing_dir(workspace);
        let container_dir = if has_extension(&self_dir, PROJECT_EXTENSION) {
            containing_dir(&self_dir)
        } else {
            self_dir.clone()
        };

        for entry in entries {
            let group_base = entry
                .groups
                .iter()
                .fold(container_dir.clone(), |base, group| {
                    group.resolve(&container_dir, &self_dir, &base)
                });
            let target = entry.location.resolve(&container_dir, &self_dir, &group_base);
            self.reference(&target, &entry.location);
        }

        Ok(())
    }

    fn reference(&mut self, target: &Path, location: &Location) {
        if has_extension(target, WORKSPACE_EXTENSION) {
            if let Err(e) = self.workspace(target) {
                crate::warn_event!("topology", "nested workspace skipped", "{e}");
            }
            return;
        }

        let root = if has_extension(target, PROJECT_EXTENSION) {
            containing_dir(target)
        } else {
            target.to_path_buf()
        };

        if self.seen.insert(root.clone()) {
            self.roots.push(ProjectRoot::new(root));
        } else {
            crate::debug_event!("topology", "duplicate reference", "{}", location.path());
        }
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().is_some_and(|ext| ext == extension)
}

fn containing_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_else(|| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_manifest(workspace: &Path, body: &str) {
        fs::create_dir_all(workspace).unwrap();
        let content = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Workspace version = \"1.0\">\n{body}\n</Workspace>\n"
        );
        fs::write(workspace.join(WORKSPACE_MANIFEST), content).unwrap();
    }

    fn paths(roots: &[ProjectRoot]) -> Vec<PathBuf> {
        roots.iter().map(|r| r.path().to_path_buf()).collect()
    }

    #[test]
    fn test_plain_directory_is_its_own_project() {
        let temp = TempDir::new().unwrap();
        let roots = TopologyResolver::new().resolve(temp.path());
        assert_eq!(paths(&roots), vec![temp.path().to_path_buf()]);
    }

    #[test]
    fn test_project_bundle_resolves_to_containing_dir() {
        let roots = TopologyResolver::new().resolve(Path::new("/work/App/App.xcodeproj"));
        assert_eq!(paths(&roots), vec![PathBuf::from("/work/App")]);
    }

    #[test]
    fn test_workspace_with_groups_and_schemes() {
        let temp = TempDir::new().unwrap();
        let base = temp.path();
        let workspace = base.join("Suite.xcworkspace");
        write_manifest(
            &workspace,
            r#"   <FileRef location = "group:App/App.xcodeproj"></FileRef>
   <Group location = "group:Modules" name = "Modules">
      <Group location = "group:Net" name = "Net">
         <FileRef location = "group:Net.xcodeproj"></FileRef>
      </Group>
      <FileRef location = "group:Core/./Core.xcodeproj"></FileRef>
      <FileRef location = "container:Tools"></FileRef>
   </Group>
   <FileRef location = "absolute:/opt/Shared/Shared.xcodeproj"></FileRef>
   <FileRef location = "developer:Ignored"></FileRef>"#,
        );

        let roots = TopologyResolver::new().resolve(&workspace);
        assert_eq!(
            paths(&roots),
            vec![
                base.join("App"),
                base.join("Modules/Net"),
                base.join("Modules/Core"),
                base.join("Tools"),
                PathBuf::from("/opt/Shared"),
            ]
        );
    }

    #[test]
    fn test_duplicates_keep_first_occurrence() {
        let temp = TempDir::new().unwrap();
        let workspace = temp.path().join("Dup.xcworkspace");
        write_manifest(
            &workspace,
            r#"   <FileRef location = "group:B/B.xcodeproj"></FileRef>
   <FileRef location = "group:A/A.xcodeproj"></FileRef>
   <FileRef location = "container:B/../B/B.xcodeproj"></FileRef>
   <FileRef location = "group:B"></FileRef>"#,
        );

        let roots = TopologyResolver::new().resolve(&workspace);
        assert_eq!(paths(&roots), vec![temp.path().join("B"), temp.path().join("A")]);
    }

    #[test]
    fn test_embedded_workspace_self_reference() {
        let temp = TempDir::new().unwrap();
        let workspace = temp.path().join("App.xcodeproj/project.xcworkspace");
        write_manifest(&workspace, r#"   <FileRef location = "self:"></FileRef>"#);

        let roots = TopologyResolver::new().resolve(&workspace);
        assert_eq!(paths(&roots), vec![temp.path().to_path_buf()]);
    }

    #[test]
    fn test_nested_workspace_is_followed_once() {
        let temp = TempDir::new().unwrap();
        let outer = temp.path().join("Outer.xcworkspace");
        let inner = temp.path().join("Inner.xcworkspace");
        write_manifest(
            &outer,
            r#"   <FileRef location = "group:Inner.xcworkspace"></FileRef>
   <FileRef location = "group:One/One.xcodeproj"></FileRef>"#,
        );
        write_manifest(
            &inner,
            r#"   <FileRef location = "group:Two/Two.xcodeproj"></FileRef>
   <FileRef location = "group:Outer.xcworkspace"></FileRef>"#,
        );

        let roots = TopologyResolver::new().resolve(&outer);
        assert_eq!(paths(&roots), vec![temp.path().join("Two"), temp.path().join("One")]);
    }

    #[test]
    fn test_missing_manifest_is_empty() {
        let temp = TempDir::new().unwrap();
        let workspace = temp.path().join("Empty.xcworkspace");
        fs::create_dir_all(&workspace).unwrap();

        let resolver = TopologyResolver::new();
        assert!(resolver.resolve(&workspace).is_empty());
        assert!(matches!(
            resolver.try_resolve(&workspace),
            Err(TopologyError::ManifestRead { .. })
        ));
    }

    #[test]
    fn test_malformed_manifest_is_empty() {
        let temp = TempDir::new().unwrap();
        let workspace = temp.path().join("Broken.xcworkspace");
        fs::create_dir_all(&workspace).unwrap();
        fs::write(workspace.join(WORKSPACE_MANIFEST), "<Workspace><FileRef>").unwrap();

        let resolver = TopologyResolver::new();
        assert!(resolver.resolve(&workspace).is_empty());
        assert!(matches!(
            resolver.try_resolve(&workspace),
            Err(TopologyError::ManifestParse { .. })
        ));
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let temp = TempDir::new().unwrap();
        let resolver = TopologyResolver::new();
        assert!(resolver.resolve(&temp.path().join("gone")).is_empty());
    }
}
